//! ESP-IDF backing
//!
//! The pin is driven in input/output open-drain mode, so releasing the line
//! is a `set_high` and the input stays connected all the time. Microsecond
//! delays busy-wait in ROM (`ets_delay_us`), millisecond ones yield to
//! FreeRTOS.

use crate::{
    error::PinError,
    pin::{Direction, Level, Pin},
};
use esp_idf_svc::hal::{
    delay::{Ets, FreeRtos},
    gpio::{InputOutput, InputPin, OutputPin, PinDriver},
    peripheral::Peripheral,
};

/// An ESP-IDF GPIO
pub struct EspPin<'d, T: InputPin + OutputPin> {
    driver: PinDriver<'d, T, InputOutput>,
    direction: Direction,
    level: Level,
}

impl<'d, T: InputPin + OutputPin> EspPin<'d, T> {
    pub fn new(pin: impl Peripheral<P = T> + 'd) -> Result<Self, PinError> {
        let mut driver = PinDriver::input_output_od(pin)?;
        driver.set_high()?;
        Ok(Self {
            driver,
            direction: Direction::Input,
            level: Level::High,
        })
    }

    fn drive(&mut self) -> Result<(), PinError> {
        match (self.direction, self.level) {
            (Direction::Output, Level::Low) => self.driver.set_low()?,
            _ => self.driver.set_high()?,
        }
        Ok(())
    }
}

impl<T: InputPin + OutputPin> Pin for EspPin<'_, T> {
    fn set_direction(&mut self, direction: Direction) -> Result<(), PinError> {
        self.direction = direction;
        self.drive()
    }

    fn write_level(&mut self, level: Level) -> Result<(), PinError> {
        self.level = level;
        self.drive()
    }

    fn read_level(&mut self) -> Result<Level, PinError> {
        Ok(Level::from(self.driver.is_high()))
    }

    fn delay_us(&mut self, us: u32) {
        Ets::delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}

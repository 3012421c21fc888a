//! Digital pin interface
//!
//! The 1-Wire engine only needs four things from the line it drives: switch
//! direction, write a level, read a level and wait. [`Pin`] is that
//! capability. Backings:
//!
//! - [`OpenDrain`]: any `embedded-hal` pin configured open-drain, plus a
//!   `DelayNs` provider,
//! - [`SysfsPin`](crate::sysfs::SysfsPin): Linux `/sys/class/gpio`,
//! - `EspPin` (feature `esp`): an ESP-IDF `PinDriver`.
//!
//! The line must be externally pulled-up (4.7kOhm) for the released state to
//! read high.

use crate::error::PinError;
use embedded_hal::{
    delay::DelayNs,
    digital::{Error as _, InputPin, OutputPin},
};
use std::{
    hint,
    time::{Duration, Instant},
};

/// Pin direction
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// High-impedance, the pull-up (or a device) sets the level.
    Input,
    /// Driven by the bus master.
    Output,
}

/// Line level
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Level::High } else { Level::Low }
    }
}

/// Digital pin capability consumed by the 1-Wire engine
///
/// Implementations must apply a direction change before returning, so the
/// next timed operation sees it. `write_level` is only meaningful while the
/// direction is [`Direction::Output`], `read_level` while it is
/// [`Direction::Input`].
pub trait Pin {
    fn set_direction(&mut self, direction: Direction) -> Result<(), PinError>;

    fn write_level(&mut self, level: Level) -> Result<(), PinError>;

    fn read_level(&mut self) -> Result<Level, PinError>;

    /// Waits at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Waits at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000);
        }
    }
}

impl<P: Pin + ?Sized> Pin for &mut P {
    fn set_direction(&mut self, direction: Direction) -> Result<(), PinError> {
        (**self).set_direction(direction)
    }

    fn write_level(&mut self, level: Level) -> Result<(), PinError> {
        (**self).write_level(level)
    }

    fn read_level(&mut self) -> Result<Level, PinError> {
        (**self).read_level()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

/// An `embedded-hal` open-drain pin
///
/// With an open-drain output, driving high is the same as releasing the
/// line, so [`Direction::Input`] is expressed as `set_high`.
pub struct OpenDrain<P, D> {
    pin: P,
    delay: D,
    direction: Direction,
    level: Level,
}

impl<P, D> OpenDrain<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    #[must_use]
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            pin,
            delay,
            direction: Direction::Input,
            level: Level::High,
        }
    }

    pub fn into_inner(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn drive(&mut self) -> Result<(), PinError> {
        let result = match (self.direction, self.level) {
            (Direction::Output, Level::Low) => self.pin.set_low(),
            _ => self.pin.set_high(),
        };
        result.map_err(|error| PinError::Hal(error.kind()))
    }
}

impl<P, D> Pin for OpenDrain<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn set_direction(&mut self, direction: Direction) -> Result<(), PinError> {
        self.direction = direction;
        self.drive()
    }

    fn write_level(&mut self, level: Level) -> Result<(), PinError> {
        self.level = level;
        self.drive()
    }

    fn read_level(&mut self) -> Result<Level, PinError> {
        self.pin
            .is_high()
            .map(Level::from)
            .map_err(|error| PinError::Hal(error.kind()))
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

/// Busy-wait delay
///
/// `thread::sleep` on a general purpose OS routinely overshoots by tens of
/// microseconds, which is a whole 1-Wire slot. Below `SLEEP_THRESHOLD` this
/// spins on the monotonic clock instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinDelay;

impl SpinDelay {
    const SLEEP_THRESHOLD: Duration = Duration::from_millis(2);

    pub fn wait(&self, duration: Duration) {
        if duration >= Self::SLEEP_THRESHOLD {
            std::thread::sleep(duration);
            return;
        }
        let start = Instant::now();
        while start.elapsed() < duration {
            hint::spin_loop();
        }
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.wait(Duration::from_nanos(ns as _));
    }
}

pub use self::error::{CrcError, Error, PinError, Result};

use crate::{
    onewire::{Command as RomCommand, OneWire},
    pin::Pin,
    scratchpad::{LEN, Resolution, Scratchpad},
};
use log::{debug, warn};
use std::time::Duration;

/// The ds18b20 family code
pub const FAMILY_CODE: u8 = 0x28;
/// Max conversion time, up to 750 ms.
const CONVERSION_TIME: Duration = Duration::from_millis(750);
/// Reported by [`Ds18b20Driver::read_temperature_or_sentinel`] when no
/// reading could be obtained.
pub const NO_READING: f32 = -999.0;

const MAX_POLLS: u32 = 1000;
const POLL_INTERVAL_MS: u32 = 1;

/// How to wait for the end of a temperature conversion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionWait {
    /// Sleep for a fixed time, long enough for the configured resolution.
    Fixed(Duration),
    /// Issue read slots until the device answers 1, sleeping `interval_ms`
    /// between them, at most `max_polls` times. The interval is at least
    /// 1 ms, back-to-back read slots would saturate the bus.
    Poll { max_polls: u32, interval_ms: u32 },
}

impl ConversionWait {
    /// Fixed wait covering the worst case at `resolution`.
    pub fn fixed(resolution: Resolution) -> Self {
        Self::Fixed(resolution.conversion_time())
    }
}

impl Default for ConversionWait {
    fn default() -> Self {
        Self::Poll {
            max_polls: MAX_POLLS,
            interval_ms: POLL_INTERVAL_MS,
        }
    }
}

/// Driver configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub conversion: ConversionWait,
    /// Reject a scratchpad whose CRC byte does not match.
    pub verify_crc: bool,
}

impl Config {
    pub fn conversion(self, conversion: ConversionWait) -> Self {
        Self { conversion, ..self }
    }

    pub fn verify_crc(self, verify_crc: bool) -> Self {
        Self { verify_crc, ..self }
    }
}

/// Anything that yields a temperature in °C
pub trait Thermometer {
    fn read_temperature(&mut self) -> Result<f32>;
}

/// The ds18b20 driver over a bit-banged 1-Wire bus
///
/// Always addresses the bus with Skip ROM, so exactly one device may be
/// attached.
#[derive(Debug)]
pub struct Ds18b20Driver<P> {
    pub bus: OneWire<P>,
    config: Config,
}

impl<P: Pin> Ds18b20Driver<P> {
    /// Takes an already provisioned pin.
    pub fn open(pin: P) -> Self {
        Self::with_config(pin, Config::default())
    }

    pub fn with_config(pin: P, config: Config) -> Self {
        Self {
            bus: OneWire::new(pin),
            config,
        }
    }

    pub fn into_inner(self) -> P {
        self.bus.into_inner()
    }

    /// Receive temperature
    ///
    /// Runs the whole transaction: reset, Skip ROM, Convert T, wait, reset,
    /// Skip ROM, Read Scratchpad. A missing presence pulse at either reset
    /// stops it right there with [`Error::NoPresence`]. Nothing is retried.
    ///
    /// After a power-on reset the temperature register holds 85 °C until the
    /// first conversion completes.
    pub fn read_temperature(&mut self) -> Result<f32> {
        let conversion = self.config.conversion;
        self.initialization()
            .inspect_err(|error| warn!("before conversion: {error}"))?
            .skip_rom()?
            .convert_temperature(conversion)?;
        let scratchpad = self
            .initialization()
            .inspect_err(|error| warn!("before scratchpad read: {error}"))?
            .skip_rom()?
            .read_scratchpad()?;
        if self.config.verify_crc {
            scratchpad.check_crc()?;
        }
        Ok(scratchpad.temperature())
    }

    /// Same as [`Self::read_temperature`], with any failure collapsed into
    /// [`NO_READING`].
    pub fn read_temperature_or_sentinel(&mut self) -> f32 {
        self.read_temperature().unwrap_or(NO_READING)
    }

    /// Reset pulse, then presence detection.
    pub fn initialization(&mut self) -> Result<Rom<&mut Self>> {
        if !self.bus.reset()? {
            return Err(Error::NoPresence);
        }
        debug!("presence");
        Ok(Rom(self))
    }
}

impl<P: Pin> Thermometer for Ds18b20Driver<P> {
    fn read_temperature(&mut self) -> Result<f32> {
        Ds18b20Driver::read_temperature(self)
    }
}

pub struct Rom<T>(T);

/// ROM function commands
impl<'a, P: Pin> Rom<&'a mut Ds18b20Driver<P>> {
    /// Skip ROM command
    ///
    /// This command can save time in a single drop bus system by allowing the
    /// bus master to access the memory functions without providing the 64-bit
    /// ROM code. If more than one slave is present on the bus and a Read
    /// command is issued following the Skip ROM command, data collision will
    /// occur on the bus as multiple slaves transmit simultaneously (open drain
    /// pulldowns will produce a wired AND result).
    pub fn skip_rom(self) -> Result<Ram<&'a mut Ds18b20Driver<P>>> {
        self.0.bus.write_byte(RomCommand::SkipRom as _)?;
        Ok(Ram(self.0))
    }
}

/// RAM commands
pub struct Ram<T>(T);

/// RAM commands
impl<P: Pin> Ram<&mut Ds18b20Driver<P>> {
    /// Reads the entire scratchpad including the CRC byte.
    pub fn read_scratchpad(self) -> Result<Scratchpad> {
        self.0.bus.write_byte(Command::ReadScratchpad as _)?;
        let mut buffer = [0u8; LEN];
        self.0.bus.read_bytes(&mut buffer)?;
        debug!("scratchpad {buffer:02x?}");
        Ok(Scratchpad(buffer))
    }

    /// This command begins a temperature conversion. No further data is
    /// required. The temperature conversion will be performed and then the
    /// DS18B20 will remain idle. If the bus master issues read time slots
    /// following this command, the DS18B20 will output 0 on the bus as long as
    /// it is busy making a temperature conversion; it will return a 1 when the
    /// temperature conversion is complete.
    ///
    /// A poll budget running out is not an error: the scratchpad is read
    /// anyway and holds the previous result.
    pub fn convert_temperature(self, wait: ConversionWait) -> Result<()> {
        let bus = &mut self.0.bus;
        bus.write_byte(Command::ConvertTemperature as _)?;
        match wait {
            ConversionWait::Fixed(duration) => {
                let ms = duration.as_micros().div_ceil(1000);
                let ms = ms.try_into().unwrap_or(u32::MAX);
                bus.pin().delay_ms(ms);
            }
            ConversionWait::Poll {
                max_polls,
                interval_ms,
            } => {
                let interval_ms = interval_ms.max(POLL_INTERVAL_MS);
                for poll in 1..=max_polls {
                    if bus.read_bit()? {
                        debug!("conversion complete {{ polls={poll} }}");
                        return Ok(());
                    }
                    bus.pin().delay_ms(interval_ms);
                }
                warn!("conversion not complete after {max_polls} polls");
            }
        }
        Ok(())
    }
}

/// Function commands
#[repr(u8)]
enum Command {
    ReadScratchpad = 0xBE,
    ConvertTemperature = 0x44,
}

pub mod crc8;
#[cfg(feature = "esp")]
pub mod esp;
pub mod error;
pub mod onewire;
pub mod pin;
pub mod scratchpad;
#[cfg(test)]
mod sim;
pub mod sysfs;
pub mod w1;

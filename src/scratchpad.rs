use crate::{
    CONVERSION_TIME,
    crc8,
    error::{Error, Result},
};
use std::time::Duration;

pub(crate) const NINE: u8 = 0b00011111;
pub(crate) const TEN: u8 = 0b00111111;
pub(crate) const ELEVEN: u8 = 0b01011111;
pub(crate) const TWELVE: u8 = 0b01111111;

/// Scratchpad length, CRC byte included.
pub const LEN: usize = 9;

/// Scratchpad
///
/// The nine bytes as returned by Read Scratchpad, decoded on demand.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Scratchpad(pub [u8; LEN]);

impl Scratchpad {
    /// Temperature (°C)
    pub fn temperature(&self) -> f32 {
        temperature(self.0[1], self.0[0])
    }

    /// Raw temperature register, 1/16 °C per LSB.
    pub fn raw_temperature(&self) -> i16 {
        i16::from_le_bytes([self.0[0], self.0[1]])
    }

    /// Alarm high trigger register (TH)
    pub fn alarm_high(&self) -> i8 {
        self.0[2] as _
    }

    /// Alarm low trigger register (TL)
    pub fn alarm_low(&self) -> i8 {
        self.0[3] as _
    }

    /// Configuration register
    pub fn configuration(&self) -> Result<ConfigurationRegister> {
        ConfigurationRegister::try_from(self.0[4])
    }

    pub fn crc(&self) -> u8 {
        self.0[8]
    }

    /// Checks the CRC byte against the other eight.
    pub fn check_crc(&self) -> Result<()> {
        Ok(crc8::check(&self.0)?)
    }
}

/// Configuration register
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigurationRegister {
    pub resolution: Resolution,
}

impl TryFrom<u8> for ConfigurationRegister {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            NINE => Ok(Self {
                resolution: Resolution::Nine,
            }),
            TEN => Ok(Self {
                resolution: Resolution::Ten,
            }),
            ELEVEN => Ok(Self {
                resolution: Resolution::Eleven,
            }),
            TWELVE => Ok(Self {
                resolution: Resolution::Twelve,
            }),
            configuration_register => Err(Error::ConfigurationRegister {
                configuration_register,
            }),
        }
    }
}

/// Temperature resolution: 9, 10, 11 or 12 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
    /// 9-bit, equates to a temperature resolution of 0.5°C
    Nine,
    /// 10-bit, equates to a temperature resolution of 0.25°C
    Ten,
    /// 11-bit, equates to a temperature resolution of 0.125°C
    Eleven,
    /// 12-bit, equates to a temperature resolution of 0.0625°C
    #[default]
    Twelve,
}

impl Resolution {
    /// Worst case conversion time
    pub fn conversion_time(&self) -> Duration {
        match self {
            Resolution::Nine => CONVERSION_TIME / 8,
            Resolution::Ten => CONVERSION_TIME / 4,
            Resolution::Eleven => CONVERSION_TIME / 2,
            Resolution::Twelve => CONVERSION_TIME,
        }
    }
}

/// Decodes the temperature register: two's complement, 1/16 °C per LSB.
pub fn temperature(msb: u8, lsb: u8) -> f32 {
    i16::from_be_bytes([msb, lsb]) as f32 / 16.0
}

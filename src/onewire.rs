//! Bit-banged Onewire Implementation
//!
//! Drives a 1-Wire bus through a [`Pin`]: the master pulls the line low
//! (output, level low) or releases it (input, high-impedance) and lets the
//! external pull-up or a device set the level. Everything the bus carries is
//! encoded in *when* those two states alternate, so every slot below is a
//! fixed sequence of direction changes and delays.
//!
//! Every slot starts with the line driven low and ends with it released.
//!
//! Timings follow the Maxim recommendations (application note 126).

use crate::{
    error::Result,
    pin::{Direction, Level, Pin},
};
use log::trace;

// Reset and presence detection, 960 µs in total.
pub const RESET_LOW_US: u32 = 480;
pub const PRESENCE_WAIT_US: u32 = 70;
pub const PRESENCE_RELEASE_US: u32 = 410;

// Write slots. Both add up to `SLOT_US`.
pub const WRITE_1_LOW_US: u32 = 6;
pub const WRITE_1_RELEASE_US: u32 = 64;
pub const WRITE_0_LOW_US: u32 = 60;
pub const WRITE_0_RELEASE_US: u32 = 10;

// Read slot: initiation, sample, recovery. Adds up to `SLOT_US`.
pub const READ_INIT_LOW_US: u32 = 6;
pub const READ_SAMPLE_US: u32 = 9;
pub const READ_RECOVERY_US: u32 = 55;

pub const SLOT_US: u32 = 70;

// Settle time after the last bit of a written byte.
pub const BYTE_SETTLE_US: u32 = 5;

/// ROM command codes
///
/// Only Skip ROM is issued: the bus is assumed to carry a single device, so
/// there is nothing to search or match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Command {
    /// Skip addressing
    SkipRom = 0xCC,
}

/// 1-Wire bus master over a single pin
///
/// The bus owns the pin for its whole life so that nothing else can touch the
/// line in the middle of a slot.
#[derive(Debug)]
pub struct OneWire<P> {
    pin: P,
}

impl<P: Pin> OneWire<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }

    pub(crate) fn pin(&mut self) -> &mut P {
        &mut self.pin
    }

    /// Sends a reset pulse, then returns true if a device is present.
    ///
    /// Absence is not an error here, the caller decides whether it is fatal.
    pub fn reset(&mut self) -> Result<bool> {
        self.drive_low()?;
        self.pin.delay_us(RESET_LOW_US);
        self.release()?;
        self.pin.delay_us(PRESENCE_WAIT_US);
        // A present device holds the line low for 60-240 µs.
        let present = self.pin.read_level()? == Level::Low;
        self.pin.delay_us(PRESENCE_RELEASE_US);
        trace!("reset {{ present={present} }}");
        Ok(present)
    }

    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        let (low, release) = if bit {
            (WRITE_1_LOW_US, WRITE_1_RELEASE_US)
        } else {
            (WRITE_0_LOW_US, WRITE_0_RELEASE_US)
        };
        self.drive_low()?;
        self.pin.delay_us(low);
        self.release()?;
        self.pin.delay_us(release);
        Ok(())
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        self.drive_low()?;
        self.pin.delay_us(READ_INIT_LOW_US);
        self.release()?;
        // The device holds a 0 for only 15 µs from the start of the slot.
        self.pin.delay_us(READ_SAMPLE_US);
        let bit = self.pin.read_level()? == Level::High;
        self.pin.delay_us(READ_RECOVERY_US);
        Ok(bit)
    }

    /// Writes a byte, least significant bit first.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        for index in 0..u8::BITS {
            self.write_bit(byte >> index & 1 != 0)?;
        }
        self.pin.delay_us(BYTE_SETTLE_US);
        Ok(())
    }

    /// Reads a byte, least significant bit first.
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut byte = 0;
        for index in 0..u8::BITS {
            if self.read_bit()? {
                byte |= 1 << index;
            }
        }
        Ok(byte)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        for byte in buffer {
            *byte = self.read_byte()?;
        }
        Ok(())
    }

    fn drive_low(&mut self) -> Result<()> {
        self.pin.set_direction(Direction::Output)?;
        self.pin.write_level(Level::Low)?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        Ok(self.pin.set_direction(Direction::Input)?)
    }
}

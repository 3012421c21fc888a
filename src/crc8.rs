//! Dallas/Maxim 1-Wire CRC
//!
//! Feedback polynomial: `X^8 + X^5 + X^4 + X^0`, shifted LSB first, which is
//! the reflected mask `0b1000_1100`.
//!
//! Running the CRC over a block that ends with its own CRC byte yields 0, so
//! a scratchpad can be checked without splitting it.

use crate::error::CrcError;

const MASK: u8 = 0b1000_1100;

/// Calculates the crc8 of the input data.
pub fn calculate(data: &[u8]) -> u8 {
    data.iter().fold(0, |mut crc, byte| {
        crc ^= byte;
        for _ in 0..u8::BITS {
            let feedback = crc & 0b1 != 0;
            crc >>= 1;
            if feedback {
                crc ^= MASK;
            }
        }
        crc
    })
}

/// Checks to see if data (including the crc byte) passes the crc check.
pub fn check(data: &[u8]) -> Result<(), CrcError> {
    match calculate(data) {
        0 => Ok(()),
        crc => Err(CrcError { crc }),
    }
}

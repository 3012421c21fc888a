use crate::scratchpad::{ELEVEN, NINE, TEN, TWELVE};
use std::{io, path::PathBuf};
use thiserror::Error;

/// Result
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Pin(#[from] PinError),
    #[error("no presence pulse, device not found on the bus")]
    NoPresence,
    #[error("device not found")]
    DeviceNotFound,
    #[error(
        "unexpected configuration register {{ configuration_register={configuration_register:b}, expected=[{NINE:b}, {TEN:b}, {ELEVEN:b}, {TWELVE:b}] }}"
    )]
    ConfigurationRegister { configuration_register: u8 },
    #[error(transparent)]
    Crc(#[from] CrcError),
    #[error("kernel driver reported a CRC failure {{ path={path:?} }}")]
    W1Crc { path: PathBuf },
    #[error("unexpected w1_slave contents {{ path={path:?}, line={line:?} }}")]
    W1Parse { path: PathBuf, line: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The CRC error
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("unexpected CRC {{ crc={crc}, expected=0 }}")]
pub struct CrcError {
    pub(crate) crc: u8,
}

/// The pin error
///
/// Raised when the pin backing cannot be configured, written or read. Any of
/// these stops the transaction before (or while) it touches the bus.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("pin unavailable: {0}")]
    Io(#[from] io::Error),
    #[error("pin unavailable: {0:?}")]
    Hal(embedded_hal::digital::ErrorKind),
    #[cfg(feature = "esp")]
    #[error("pin unavailable: {0}")]
    Esp(#[from] esp_idf_svc::sys::EspError),
    #[error("unexpected pin value {value:?}")]
    Value { value: String },
}

//! Kernel w1-therm reader
//!
//! When the `w1-gpio` and `w1-therm` kernel modules own the line, the kernel
//! runs the 1-Wire transaction itself and exposes the result in
//! `/sys/bus/w1/devices/28-*/w1_slave`:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```

use crate::{
    FAMILY_CODE, Thermometer,
    error::{Error, Result},
};
use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEVICES_PATH: &str = "/sys/bus/w1/devices";

/// A DS18B20 read through the kernel w1 driver
#[derive(Clone, Debug)]
pub struct W1Thermometer {
    path: PathBuf,
}

impl W1Thermometer {
    /// Picks the first DS18B20 under [`DEVICES_PATH`].
    pub fn discover() -> Result<Self> {
        Self::discover_at(DEVICES_PATH)
    }

    pub fn discover_at(base: impl AsRef<Path>) -> Result<Self> {
        let prefix = format!("{FAMILY_CODE:02x}-");
        let mut devices = fs::read_dir(base)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect::<Vec<_>>();
        devices.sort();
        let device = devices.into_iter().next().ok_or(Error::DeviceNotFound)?;
        debug!("w1 device {device:?}");
        Ok(Self::new(device.join("w1_slave")))
    }

    /// `path` is the `w1_slave` file itself.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_temperature(&self) -> Result<f32> {
        let contents = fs::read_to_string(&self.path)?;
        parse(&self.path, &contents)
    }
}

impl Thermometer for W1Thermometer {
    fn read_temperature(&mut self) -> Result<f32> {
        W1Thermometer::read_temperature(self)
    }
}

fn parse(path: &Path, contents: &str) -> Result<f32> {
    let mut lines = contents.lines();
    let status = lines.next().unwrap_or_default();
    if !status.trim_end().ends_with("YES") {
        return Err(Error::W1Crc {
            path: path.to_path_buf(),
        });
    }
    let line = lines.next().unwrap_or_default();
    let error = || Error::W1Parse {
        path: path.to_path_buf(),
        line: line.to_owned(),
    };
    let (_, value) = line.split_once("t=").ok_or_else(error)?;
    let millidegrees = value.trim().parse::<i32>().map_err(|_| error())?;
    Ok(millidegrees as f32 / 1000.0)
}

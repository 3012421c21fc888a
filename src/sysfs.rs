//! Linux sysfs GPIO backing
//!
//! Drives a line through `/sys/class/gpio/gpioN/{direction,value}`. The
//! attribute files stay open for the life of the pin: reopening them for
//! every slot costs more than a slot lasts.

use crate::{
    error::PinError,
    pin::{Direction, Level, Pin, SpinDelay},
};
use log::{debug, warn};
use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

pub const GPIO_PATH: &str = "/sys/class/gpio";

/// Time for udev to create the attribute files after an export.
const EXPORT_SETTLE: Duration = Duration::from_millis(100);

/// A sysfs GPIO line
#[derive(Debug)]
pub struct SysfsPin {
    root: PathBuf,
    gpio: u32,
    exported: bool,
    direction_file: File,
    value_file: File,
    direction: Option<Direction>,
    delay: SpinDelay,
}

impl SysfsPin {
    /// Exports `gpio` and opens it.
    ///
    /// The line is unexported on drop only if this call exported it, a line
    /// already exported by someone else is left as found.
    pub fn export(gpio: u32) -> Result<Self, PinError> {
        Self::export_at(GPIO_PATH, gpio)
    }

    pub fn export_at(root: impl AsRef<Path>, gpio: u32) -> Result<Self, PinError> {
        let root = root.as_ref();
        if root.join(format!("gpio{gpio}")).exists() {
            return Self::open_at(root, gpio);
        }
        write(&root.join("export"), &gpio.to_string())?;
        thread::sleep(EXPORT_SETTLE);
        debug!("exported {{ gpio={gpio} }}");
        match Self::open_at(root, gpio) {
            Ok(mut pin) => {
                pin.exported = true;
                Ok(pin)
            }
            Err(error) => {
                if let Err(error) = write(&root.join("unexport"), &gpio.to_string()) {
                    warn!("unexport {{ gpio={gpio}, error={error} }}");
                }
                Err(error)
            }
        }
    }

    /// Opens an already exported line, leaving it exported on drop.
    pub fn open_at(root: impl AsRef<Path>, gpio: u32) -> Result<Self, PinError> {
        let root = root.as_ref().to_path_buf();
        let path = root.join(format!("gpio{gpio}"));
        let options = {
            let mut options = OpenOptions::new();
            options.read(true).write(true);
            options
        };
        Ok(Self {
            direction_file: options.open(path.join("direction"))?,
            value_file: options.open(path.join("value"))?,
            root,
            gpio,
            exported: false,
            direction: None,
            delay: SpinDelay,
        })
    }

    pub fn gpio(&self) -> u32 {
        self.gpio
    }
}

impl Pin for SysfsPin {
    fn set_direction(&mut self, direction: Direction) -> Result<(), PinError> {
        if self.direction == Some(direction) {
            return Ok(());
        }
        let value = match direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        rewrite(&mut self.direction_file, value)?;
        self.direction = Some(direction);
        Ok(())
    }

    fn write_level(&mut self, level: Level) -> Result<(), PinError> {
        let value = match level {
            Level::Low => "0",
            Level::High => "1",
        };
        rewrite(&mut self.value_file, value)?;
        Ok(())
    }

    fn read_level(&mut self) -> Result<Level, PinError> {
        let mut buffer = [0; 2];
        self.value_file.seek(SeekFrom::Start(0))?;
        let length = self.value_file.read(&mut buffer)?;
        match &buffer[..length] {
            [b'0', ..] => Ok(Level::Low),
            [b'1', ..] => Ok(Level::High),
            value => Err(PinError::Value {
                value: String::from_utf8_lossy(value).into_owned(),
            }),
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.wait(Duration::from_micros(us as _));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.wait(Duration::from_millis(ms as _));
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if self.exported {
            if let Err(error) = write(&self.root.join("unexport"), &self.gpio.to_string()) {
                warn!("unexport {{ gpio={}, error={error} }}", self.gpio);
            }
        }
    }
}

fn write(path: &Path, value: &str) -> Result<(), PinError> {
    OpenOptions::new()
        .write(true)
        .open(path)?
        .write_all(value.as_bytes())?;
    Ok(())
}

fn rewrite(file: &mut File, value: &str) -> Result<(), PinError> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(value.as_bytes())?;
    Ok(())
}

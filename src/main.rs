use clap::{Parser, ValueEnum};
use log::{info, warn};
use onewire_thermometer::{
    Config, ConversionWait, Ds18b20Driver, Result, Thermometer, sysfs::SysfsPin,
    w1::W1Thermometer,
};
use std::{thread::sleep, time::Duration};

/// Reads a DS18B20 in a loop
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Where the reading comes from
    #[arg(long, value_enum, default_value_t = Backend::Sysfs)]
    backend: Backend,
    /// GPIO number of the 1-Wire line (sysfs backend)
    #[arg(long, default_value_t = 4)]
    gpio: u32,
    /// Time between readings (ms)
    #[arg(long, default_value_t = 1000)]
    interval: u64,
    /// Wait a fixed time (ms) for the conversion instead of polling the line
    #[arg(long)]
    fixed_wait: Option<u64>,
    /// Reject scratchpads with a bad CRC
    #[arg(long)]
    verify_crc: bool,
    /// Number of readings, 0 for no limit
    #[arg(long, default_value_t = 0)]
    count: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Bit-bang the line through /sys/class/gpio
    Sysfs,
    /// Read the kernel w1-therm driver
    W1,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    info!("Initialize {args:?}");

    let mut thermometer: Box<dyn Thermometer> = match args.backend {
        Backend::Sysfs => {
            let pin = SysfsPin::export(args.gpio)?;
            let mut config = Config::default().verify_crc(args.verify_crc);
            if let Some(ms) = args.fixed_wait {
                config = config.conversion(ConversionWait::Fixed(Duration::from_millis(ms)));
            }
            Box::new(Ds18b20Driver::with_config(pin, config))
        }
        Backend::W1 => Box::new(W1Thermometer::discover()?),
    };
    info!("Thermometer initialized");

    let interval = Duration::from_millis(args.interval);
    poll(thermometer.as_mut(), args.count, || sleep(interval));
    Ok(())
}

/// Reads `count` times (0 for no limit), waiting between readings but not
/// after the last one. Returns the number of successful readings.
fn poll(thermometer: &mut dyn Thermometer, count: u64, mut wait: impl FnMut()) -> u64 {
    let mut succeeded = 0;
    let mut reading = 0;
    loop {
        match thermometer.read_temperature() {
            Ok(temperature) => {
                info!("{temperature:.3} °C");
                succeeded += 1;
            }
            Err(error) => warn!("no reading: {error}"),
        }
        reading += 1;
        if count != 0 && reading >= count {
            return succeeded;
        }
        wait();
    }
}

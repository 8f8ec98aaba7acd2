use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::settings::{SensorSettings, SensorSource};

/// One digital input: `true` while the line is running.
pub trait SignalSensor: Send + 'static {
    fn read_signal(&mut self) -> Result<bool>;

    fn describe(&self) -> String;
}

/// Opens the configured sensor on the blocking pool, since exporting a GPIO
/// pin touches sysfs and waits for it to settle.
pub async fn open_sensor(settings: &SensorSettings) -> Result<Box<dyn SignalSensor>> {
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || open_sensor_blocking(&settings))
        .await
        .context("sensor setup task failed")?
}

fn open_sensor_blocking(settings: &SensorSettings) -> Result<Box<dyn SignalSensor>> {
    let sensor: Box<dyn SignalSensor> = match settings.source {
        SensorSource::Gpio => Box::new(SysfsGpioSensor::open(settings.pin)?),
        SensorSource::Simulated => Box::new(SimulatedLine::new()),
    };
    info!("Using sensor {}", sensor.describe());
    Ok(sensor)
}

const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";
const EXPORT_SETTLE: Duration = Duration::from_millis(100);

/// Input pin read through the Linux sysfs GPIO interface.
///
/// Pull resistors can't be configured through sysfs; wire an external
/// pull-down so a disconnected sensor reads as "stopped".
pub struct SysfsGpioSensor {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsGpioSensor {
    pub fn open(pin: u32) -> Result<Self> {
        Self::open_at(Path::new(SYSFS_GPIO_ROOT), pin)
    }

    fn open_at(root: &Path, pin: u32) -> Result<Self> {
        let pin_dir = root.join(format!("gpio{pin}"));

        if !pin_dir.exists() {
            fs::write(root.join("export"), pin.to_string())
                .with_context(|| format!("failed to export GPIO {pin}"))?;
            // udev needs a moment to fix up permissions on the new nodes.
            thread::sleep(EXPORT_SETTLE);
        }

        fs::write(pin_dir.join("direction"), "in")
            .with_context(|| format!("failed to set GPIO {pin} direction to input"))?;

        Ok(Self {
            pin,
            value_path: pin_dir.join("value"),
        })
    }
}

impl SignalSensor for SysfsGpioSensor {
    fn read_signal(&mut self) -> Result<bool> {
        let raw = fs::read_to_string(&self.value_path)
            .with_context(|| format!("failed to read {}", self.value_path.display()))?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => bail!("unexpected GPIO {} value {other:?}", self.pin),
        }
    }

    fn describe(&self) -> String {
        format!("gpio{} ({})", self.pin, self.value_path.display())
    }
}

/// Line that mostly runs, with occasional outages of random length. Short
/// outages exercise the debounce filter, long ones produce counted stops.
pub struct SimulatedLine {
    rng: StdRng,
    outage_chance: f64,
    outage_samples: std::ops::Range<u32>,
    remaining_outage: u32,
}

impl SimulatedLine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            // At 10 samples/s: an outage roughly every 50s, lasting 2-20s.
            outage_chance: 0.002,
            outage_samples: 20..200,
            remaining_outage: 0,
        }
    }
}

impl Default for SimulatedLine {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSensor for SimulatedLine {
    fn read_signal(&mut self) -> Result<bool> {
        if self.remaining_outage > 0 {
            self.remaining_outage -= 1;
            return Ok(false);
        }

        if self.rng.gen_bool(self.outage_chance) {
            self.remaining_outage = self.rng.gen_range(self.outage_samples.clone()) - 1;
            return Ok(false);
        }

        Ok(true)
    }

    fn describe(&self) -> String {
        "simulated line".to_string()
    }
}

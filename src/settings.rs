use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_PATH_ENV: &str = "LINEWATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "linewatch.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SensorSource {
    Gpio,
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorSettings {
    pub source: SensorSource,
    /// BCM pin number the line sensor is wired to.
    pub pin: u32,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            source: SensorSource::Gpio,
            pin: 17,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub sensor: SensorSettings,
    /// Continuous low time before the line counts as stopped.
    pub debounce_secs: f64,
    pub poll_interval_ms: u64,
    pub push_interval_ms: u64,
    pub history_path: PathBuf,
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sensor: SensorSettings::default(),
            debounce_secs: 10.0,
            poll_interval_ms: 100,
            push_interval_ms: 1000,
            history_path: PathBuf::from("history.csv"),
            bind_addr: "0.0.0.0:5000".into(),
        }
    }
}

impl Settings {
    /// Reads settings from `LINEWATCH_CONFIG` (or `linewatch.json`), then
    /// applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut settings = Self::from_file(&path)?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("LINEWATCH_BIND") {
            self.bind_addr = bind;
        }
        if let Some(path) = lookup("LINEWATCH_HISTORY") {
            self.history_path = PathBuf::from(path);
        }
        let simulate = lookup("LINEWATCH_SIMULATE")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if simulate {
            self.sensor.source = SensorSource::Simulated;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.debounce_secs.is_finite() && self.debounce_secs > 0.0) {
            bail!("debounceSecs must be a positive number, got {}", self.debounce_secs);
        }
        if self.poll_interval_ms == 0 {
            bail!("pollIntervalMs must be greater than zero");
        }
        if self.push_interval_ms == 0 {
            bail!("pushIntervalMs must be greater than zero");
        }
        let Ok(debounce) = Duration::try_from_secs_f64(self.debounce_secs) else {
            bail!("debounceSecs is out of range, got {}", self.debounce_secs);
        };
        if self.poll_interval() > debounce / 10 {
            bail!(
                "pollIntervalMs ({}) must be at most a tenth of debounceSecs ({}s)",
                self.poll_interval_ms,
                self.debounce_secs
            );
        }
        Ok(())
    }

    /// Only valid on settings that passed [`Settings::validate`].
    pub fn debounce(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_millis(self.push_interval_ms)
    }
}

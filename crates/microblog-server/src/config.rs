use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use microblog_sensor::{SensorBackend, SensorModel};

pub struct Config {
    pub db_path: PathBuf,
    pub sensor: SensorConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub backend: SensorBackend,
    pub pin: u8,
    pub model: SensorModel,
    pub timeout: Duration,
}

impl Config {
    /// Read `MICROBLOG_*` variables. Call after `dotenvy::dotenv()`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = get("MICROBLOG_DB_PATH").unwrap_or_else(|| "microblog.db".into());

        let backend = get("MICROBLOG_SENSOR_BACKEND")
            .unwrap_or_else(|| "simulated".into())
            .parse::<SensorBackend>()
            .map_err(anyhow::Error::msg)?;

        let pin: u8 = get("MICROBLOG_SENSOR_PIN")
            .unwrap_or_else(|| "4".into())
            .parse()
            .context("MICROBLOG_SENSOR_PIN must be a GPIO number (0-255)")?;

        let model = get("MICROBLOG_SENSOR_MODEL")
            .unwrap_or_else(|| "dht11".into())
            .parse::<SensorModel>()
            .map_err(anyhow::Error::msg)?;

        let timeout_ms: u64 = get("MICROBLOG_SENSOR_TIMEOUT_MS")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("MICROBLOG_SENSOR_TIMEOUT_MS must be a number of milliseconds")?;

        Ok(Self {
            db_path: db_path.into(),
            sensor: SensorConfig {
                backend,
                pin,
                model,
                timeout: Duration::from_millis(timeout_ms),
            },
        })
    }
}

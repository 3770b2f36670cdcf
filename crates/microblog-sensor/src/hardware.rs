use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, bounded};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::ReadingSource;
use crate::reading::{Reading, SensorFailure};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Supported sensor models. The model decides the start-signal length and
/// how the 40-bit response frame is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorModel {
    Dht11,
    Dht22,
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dht11 => f.write_str("dht11"),
            Self::Dht22 => f.write_str("dht22"),
        }
    }
}

impl FromStr for SensorModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dht11" | "11" => Ok(Self::Dht11),
            "dht22" | "22" | "am2302" => Ok(Self::Dht22),
            other => Err(format!("unknown sensor model '{other}' (expected dht11 or dht22)")),
        }
    }
}

/// What a driver got back from the wire. Either value may be missing when
/// the sensor did not answer or the frame failed its checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    pub humidity: Option<f32>,
    pub temperature: Option<f32>,
}

impl RawSample {
    pub fn empty() -> Self {
        Self::default()
    }

    fn into_reading(self) -> Result<Reading, SensorFailure> {
        match (self.temperature, self.humidity) {
            (Some(t), Some(h)) => Ok(Reading::rounded(f64::from(t), f64::from(h))),
            _ => Err(SensorFailure::NoData),
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("gpio unavailable: {0}")]
    Unavailable(String),
    #[error("pin {pin}: {message}")]
    Pin { pin: u8, message: String },
}

/// Low-level access to a physical sensor.
///
/// Implementations may block, but must bound their own blocking (as the GPIO
/// driver does with a per-edge timeout): a `HardwareSensor` abandons a read
/// that overruns and refuses new reads until the stuck one returns.
/// Serializing access to shared hardware is the driver's job, not the caller's.
pub trait SensorDriver: Send + Sync {
    fn read(&self, pin: u8, model: SensorModel) -> Result<RawSample, DriverError>;
}

/// Decode a DHT response frame (`[hum_hi, hum_lo, temp_hi, temp_lo, checksum]`).
/// A checksum mismatch yields an empty sample.
pub fn decode_frame(model: SensorModel, frame: [u8; 5]) -> RawSample {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return RawSample::empty();
    }

    let (humidity, temperature) = match model {
        SensorModel::Dht11 => {
            let humidity = f32::from(frame[0]) + f32::from(frame[1]) / 10.0;
            let magnitude = f32::from(frame[2]) + f32::from(frame[3] & 0x7f) / 10.0;
            let temperature = if frame[3] & 0x80 != 0 { -magnitude } else { magnitude };
            (humidity, temperature)
        }
        SensorModel::Dht22 => {
            let humidity = f32::from(u16::from_be_bytes([frame[0], frame[1]])) / 10.0;
            let magnitude = f32::from(u16::from_be_bytes([frame[2] & 0x7f, frame[3]])) / 10.0;
            let temperature = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };
            (humidity, temperature)
        }
    };

    RawSample {
        humidity: Some(humidity),
        temperature: Some(temperature),
    }
}

/// A physical sensor on a fixed pin.
///
/// Each read runs the driver on its own thread and waits at most `timeout`.
/// A read that overruns is abandoned and its late result dropped. At most one
/// read thread exists per sensor (clones included); while it is alive further
/// reads fail with `SensorFailure::Busy`.
#[derive(Clone)]
pub struct HardwareSensor {
    pin: u8,
    model: SensorModel,
    driver: Arc<dyn SensorDriver>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

impl HardwareSensor {
    pub fn new(pin: u8, model: SensorModel, driver: Arc<dyn SensorDriver>) -> Self {
        Self {
            pin,
            model,
            driver,
            timeout: DEFAULT_READ_TIMEOUT,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn model(&self) -> SensorModel {
        self.model
    }
}

impl fmt::Debug for HardwareSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareSensor")
            .field("pin", &self.pin)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ReadingSource for HardwareSensor {
    fn get_reading(&self) -> Result<Reading, SensorFailure> {
        let (pin, model) = (self.pin(), self.model());
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(pin, %model, "Previous sensor read still running");
            return Err(SensorFailure::Busy);
        }

        let (tx, rx) = bounded(1);
        let driver = Arc::clone(&self.driver);
        let in_flight = Arc::clone(&self.in_flight);

        let spawned = thread::Builder::new()
            .name(format!("sensor-pin-{pin}"))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| driver.read(pin, model)));
                // Cleared before sending so the caller never sees a stale flag
                in_flight.store(false, Ordering::Release);
                // Receiver is gone if the caller already timed out
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            self.in_flight.store(false, Ordering::Release);
            return Err(SensorFailure::Driver(format!("could not start read thread: {e}")));
        }

        let outcome = match rx.recv_timeout(self.timeout) {
            Ok(Ok(Ok(sample))) => sample.into_reading(),
            Ok(Ok(Err(e))) => Err(SensorFailure::Driver(e.to_string())),
            Ok(Err(_)) => Err(SensorFailure::Driver("driver panicked".into())),
            Err(RecvTimeoutError::Timeout) => Err(SensorFailure::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(SensorFailure::Driver("read thread exited without a result".into()))
            }
        };

        match &outcome {
            Ok(reading) => debug!(pin, %model, ?reading, "Sensor read"),
            Err(failure) => warn!(pin, %model, "Sensor read failed: {}", failure),
        }
        outcome
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One temperature (°C) / relative humidity (%) pair. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
}

impl Reading {
    /// Build a reading with both values rounded to two decimals.
    pub fn rounded(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature: round2(temperature),
            humidity: round2(humidity),
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Why a reading could not be produced. Returned, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorFailure {
    #[error("Failed to retrieve data from the sensor")]
    NoData,
    #[error("sensor did not answer within {0:?}")]
    Timeout(Duration),
    #[error("previous sensor read has not finished")]
    Busy,
    #[error("sensor driver fault: {0}")]
    Driver(String),
}

/// Wire shape of a read attempt: `{"temperature", "humidity"}` on success,
/// `{"error"}` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingReport {
    Reading(Reading),
    Failure { error: String },
}

impl From<Result<Reading, SensorFailure>> for ReadingReport {
    fn from(result: Result<Reading, SensorFailure>) -> Self {
        match result {
            Ok(reading) => Self::Reading(reading),
            Err(failure) => Self::Failure {
                error: failure.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_to_two_decimals() {
        let r = Reading::rounded(21.23456, 55.5);
        assert_eq!(r.temperature, 21.23);
        assert_eq!(r.humidity, 55.5);
        assert_eq!(round2(-3.14159), -3.14);
    }

    #[test]
    fn report_json_shapes() {
        let ok: ReadingReport = Ok(Reading::rounded(22.5, 40.0)).into();
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({ "temperature": 22.5, "humidity": 40.0 })
        );

        let failed: ReadingReport = Err(SensorFailure::NoData).into();
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({ "error": "Failed to retrieve data from the sensor" })
        );
    }
}

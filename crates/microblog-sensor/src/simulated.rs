use std::ops::RangeInclusive;

use rand::Rng;

use crate::provider::ReadingSource;
use crate::reading::{Reading, SensorFailure};

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 20.0..=30.0;
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 30.0..=70.0;

/// Stand-in for a real sensor: uniform values in typical indoor ranges.
/// Every call is independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSensor;

impl SimulatedSensor {
    pub fn new() -> Self {
        Self
    }
}

impl ReadingSource for SimulatedSensor {
    fn get_reading(&self) -> Result<Reading, SensorFailure> {
        let mut rng = rand::rng();
        Ok(Reading::rounded(
            rng.random_range(TEMPERATURE_RANGE),
            rng.random_range(HUMIDITY_RANGE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::round2;

    #[test]
    fn thousand_readings_stay_in_range() {
        let sensor = SimulatedSensor::new();
        for _ in 0..1000 {
            let reading = sensor.get_reading().unwrap();
            assert!(TEMPERATURE_RANGE.contains(&reading.temperature), "{reading:?}");
            assert!(HUMIDITY_RANGE.contains(&reading.humidity), "{reading:?}");
            assert_eq!(round2(reading.temperature), reading.temperature);
            assert_eq!(round2(reading.humidity), reading.humidity);
        }
    }

    #[test]
    fn readings_vary() {
        let sensor = SimulatedSensor::new();
        let first = sensor.get_reading().unwrap();
        let differs = (0..50).any(|_| sensor.get_reading().unwrap() != first);
        assert!(differs);
    }
}

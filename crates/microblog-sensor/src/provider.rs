use std::fmt;
use std::str::FromStr;

use crate::hardware::HardwareSensor;
use crate::reading::{Reading, SensorFailure};
use crate::simulated::SimulatedSensor;

/// Anything that can be polled for a reading.
///
/// Calls are independent of each other. Failures come back as values: an
/// implementation must not panic because the sensor had nothing to say.
pub trait ReadingSource {
    fn get_reading(&self) -> Result<Reading, SensorFailure>;
}

/// Which backend the composing layer asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorBackend {
    Simulated,
    Hardware,
}

impl fmt::Display for SensorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simulated => f.write_str("simulated"),
            Self::Hardware => f.write_str("hardware"),
        }
    }
}

impl FromStr for SensorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" => Ok(Self::Simulated),
            "hardware" | "hw" => Ok(Self::Hardware),
            other => Err(format!(
                "unknown sensor backend '{other}' (expected simulated or hardware)"
            )),
        }
    }
}

/// The reading source chosen at startup, fixed for its lifetime.
#[derive(Debug, Clone)]
pub enum ReadingProvider {
    Simulated(SimulatedSensor),
    Hardware(HardwareSensor),
}

impl ReadingProvider {
    pub fn simulated() -> Self {
        Self::Simulated(SimulatedSensor::new())
    }

    pub fn hardware(sensor: HardwareSensor) -> Self {
        Self::Hardware(sensor)
    }

    pub fn backend(&self) -> SensorBackend {
        match self {
            Self::Simulated(_) => SensorBackend::Simulated,
            Self::Hardware(_) => SensorBackend::Hardware,
        }
    }
}

impl ReadingSource for ReadingProvider {
    fn get_reading(&self) -> Result<Reading, SensorFailure> {
        match self {
            Self::Simulated(sensor) => sensor.get_reading(),
            Self::Hardware(sensor) => sensor.get_reading(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{DriverError, RawSample, SensorDriver, SensorModel};
    use std::sync::Arc;

    struct Silent;

    impl SensorDriver for Silent {
        fn read(&self, _pin: u8, _model: SensorModel) -> Result<RawSample, DriverError> {
            Ok(RawSample {
                humidity: None,
                temperature: None,
            })
        }
    }

    #[test]
    fn simulated_provider_always_reads() {
        let provider = ReadingProvider::simulated();
        assert_eq!(provider.backend(), SensorBackend::Simulated);
        for _ in 0..100 {
            assert!(provider.get_reading().is_ok());
        }
    }

    #[test]
    fn hardware_provider_reports_failure_as_value() {
        let provider = ReadingProvider::hardware(HardwareSensor::new(
            4,
            SensorModel::Dht11,
            Arc::new(Silent),
        ));
        assert_eq!(provider.backend(), SensorBackend::Hardware);
        assert_eq!(provider.get_reading(), Err(SensorFailure::NoData));
    }

    #[test]
    fn backend_parsing() {
        assert_eq!("Simulated".parse::<SensorBackend>(), Ok(SensorBackend::Simulated));
        assert_eq!("hw".parse::<SensorBackend>(), Ok(SensorBackend::Hardware));
        assert!("windows".parse::<SensorBackend>().is_err());
    }
}

//! Temperature/humidity readings from a DHT-family sensor.
//!
//! Two backends implement [`ReadingSource`]:
//! - [`SimulatedSensor`] draws plausible indoor values, for development hosts.
//! - [`HardwareSensor`] asks a [`SensorDriver`] for the pin and model it was
//!   built with, bounded by a timeout.
//!
//! The composing layer picks one through [`SensorBackend`]; nothing in this
//! crate inspects the host platform.

#[cfg(all(feature = "gpio", target_os = "linux"))]
pub mod gpio;

pub mod hardware;
pub mod provider;
pub mod reading;
pub mod simulated;

pub use hardware::{DriverError, HardwareSensor, RawSample, SensorDriver, SensorModel};
pub use provider::{ReadingProvider, ReadingSource, SensorBackend};
pub use reading::{Reading, ReadingReport, SensorFailure};
pub use simulated::SimulatedSensor;

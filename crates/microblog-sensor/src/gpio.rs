//! DHT11/DHT22 over Raspberry Pi GPIO, bit-banged with `rppal`.
//!
//! Timing is best effort from user space. A missed edge shows up as an empty
//! sample (and from there as `SensorFailure::NoData`), the same as a frame
//! that fails its checksum.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use rppal::gpio::{Bias, Gpio, IoPin, Level, Mode};
use tracing::debug;

use crate::hardware::{DriverError, RawSample, SensorDriver, SensorModel, decode_frame};

/// Longest we spin waiting for any single edge.
const EDGE_TIMEOUT: Duration = Duration::from_micros(200);

/// High pulses longer than this encode a 1 (~70us), shorter a 0 (~27us).
const ONE_THRESHOLD: Duration = Duration::from_micros(48);

pub struct GpioDriver {
    gpio: Gpio,
    bus: Mutex<()>,
}

impl GpioDriver {
    pub fn new() -> Result<Self, DriverError> {
        let gpio = Gpio::new().map_err(|e| DriverError::Unavailable(e.to_string()))?;
        Ok(Self {
            gpio,
            bus: Mutex::new(()),
        })
    }
}

impl SensorDriver for GpioDriver {
    fn read(&self, pin: u8, model: SensorModel) -> Result<RawSample, DriverError> {
        // One transaction on the wire at a time
        let _bus = self
            .bus
            .lock()
            .map_err(|_| DriverError::Unavailable("gpio bus lock poisoned".into()))?;

        let mut io = self
            .gpio
            .get(pin)
            .map_err(|e| DriverError::Pin {
                pin,
                message: e.to_string(),
            })?
            .into_io(Mode::Output);
        io.set_bias(Bias::PullUp);

        io.set_low();
        thread::sleep(start_signal(model));
        io.set_high();
        io.set_mode(Mode::Input);

        match read_frame(&io) {
            Some(frame) => Ok(decode_frame(model, frame)),
            None => {
                debug!(pin, %model, "No complete response frame");
                Ok(RawSample::empty())
            }
        }
    }
}

fn start_signal(model: SensorModel) -> Duration {
    match model {
        SensorModel::Dht11 => Duration::from_millis(18),
        SensorModel::Dht22 => Duration::from_micros(1100),
    }
}

fn read_frame(io: &IoPin) -> Option<[u8; 5]> {
    // Preamble: sensor pulls low ~80us, then high ~80us
    wait_for(io, Level::Low)?;
    wait_for(io, Level::High)?;
    wait_for(io, Level::Low)?;

    let mut pulses = [Duration::ZERO; 40];
    for pulse in pulses.iter_mut() {
        wait_for(io, Level::High)?;
        *pulse = wait_for(io, Level::Low)?;
    }
    Some(frame_from_pulses(&pulses))
}

/// Pack 40 high-pulse widths, MSB first, into the 5-byte response frame.
fn frame_from_pulses(pulses: &[Duration; 40]) -> [u8; 5] {
    let mut frame = [0u8; 5];
    for (bit, high) in pulses.iter().enumerate() {
        if *high > ONE_THRESHOLD {
            frame[bit / 8] |= 0x80 >> (bit % 8);
        }
    }
    frame
}

/// Spin until the line reads `level`. Returns the time spent waiting.
fn wait_for(io: &IoPin, level: Level) -> Option<Duration> {
    let start = Instant::now();
    while io.read() != level {
        if start.elapsed() > EDGE_TIMEOUT {
            return None;
        }
    }
    Some(start.elapsed())
}

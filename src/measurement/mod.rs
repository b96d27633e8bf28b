//! Live readings and where they go.

pub mod sink;

pub use sink::{JsonLinesSink, LogSink, MeasurementSink, OutputFormat};

use crate::channel::Channel;
use serde::Serialize;
use std::fmt;

/// One `MEAS:ALL?` reading.
///
/// `channel` is always the channel that was queried; the reply itself carries
/// no channel identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// Queried channel.
    pub channel: Channel,
    /// Output voltage (V).
    pub voltage: f64,
    /// Output current (A).
    pub current: f64,
    /// Output power (W).
    pub power: f64,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.6}V {:.6}A {:.6}W",
            self.channel, self.voltage, self.current, self.power
        )
    }
}

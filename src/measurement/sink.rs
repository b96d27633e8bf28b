//! Reporting sinks for measurements.
//!
//! The poll loop hands every successful [`Measurement`] to a
//! [`MeasurementSink`]. Presentation is entirely the sink's business.

use super::Measurement;
use crate::error::{AppResult, DaqError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;
use tracing::info;

/// Receives each measurement as soon as it is decoded.
pub trait MeasurementSink: Send {
    /// Report one measurement.
    ///
    /// # Errors
    /// Sink-specific; an error stops the poll loop like any other failure.
    fn record(&mut self, measurement: &Measurement) -> AppResult<()>;
}

impl<F> MeasurementSink for F
where
    F: FnMut(&Measurement) -> AppResult<()> + Send,
{
    fn record(&mut self, measurement: &Measurement) -> AppResult<()> {
        self(measurement)
    }
}

/// Measurement output format selectable from config and CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured `tracing` events.
    #[default]
    Text,
    /// One JSON object per line on stdout.
    Json,
}

impl FromStr for OutputFormat {
    type Err = DaqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(DaqError::Configuration(format!(
                "Invalid output format '{}'. Must be one of: text, json",
                other
            ))),
        }
    }
}

/// Emits every measurement as an info-level `tracing` event.
#[derive(Debug, Default)]
pub struct LogSink;

impl MeasurementSink for LogSink {
    fn record(&mut self, m: &Measurement) -> AppResult<()> {
        info!(
            channel = %m.channel,
            voltage = m.voltage,
            current = m.current,
            power = m.power,
            "{}",
            m
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct Record<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    measurement: &'a Measurement,
}

/// Writes one timestamped JSON object per measurement.
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Write records to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> MeasurementSink for JsonLinesSink<W> {
    fn record(&mut self, measurement: &Measurement) -> AppResult<()> {
        let record = Record {
            timestamp: Utc::now(),
            measurement,
        };
        serde_json::to_writer(&mut self.out, &record).map_err(std::io::Error::from)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

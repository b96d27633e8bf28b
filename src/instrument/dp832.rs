//! Rigol DP832 triple-output power supply driver.
//!
//! ## Protocol
//!
//! | Command | Reply |
//! |---|---|
//! | `*IDN?` | `manufacturer,model,serial,version` |
//! | `MEAS:ALL? <token>` | `current,voltage,power` |
//!
//! The measurement reply is current-first. That ordering is how the firmware
//! answers and must not be "fixed" to voltage-first.
//!
//! ## Example Usage
//!
//! ```no_run
//! use dp832_daq::channel::Channel;
//! use dp832_daq::instrument::Dp832;
//!
//! # async fn example() -> dp832_daq::error::AppResult<()> {
//! let mut psu = Dp832::connect_and_verify(
//!     "192.168.0.200:5555",
//!     "DP832",
//!     None,
//!     None,
//! )
//! .await?;
//! println!("Connected to {}", psu.identity());
//!
//! let reading = psu.measure(Channel::Ch1).await?;
//! println!("{}", reading);
//! # Ok(())
//! # }
//! ```

use super::Instrument;
use crate::adapters::{Adapter, LineAdapterBuilder, TcpLineAdapter};
use crate::channel::Channel;
use crate::error::{AppResult, DaqError, ParseError};
use crate::measurement::Measurement;
use std::time::Duration;
use tracing::{debug, info};

/// Model string the DP832 reports in its identity.
pub const DP832_MODEL: &str = "DP832";

const IDN_QUERY: &str = "*IDN?";
const MEASURE_ALL_QUERY: &str = "MEAS:ALL?";

/// A verified DP832 behind some adapter.
///
/// Only obtainable through [`Dp832::verify`] or [`Dp832::connect_and_verify`],
/// so holding one means the handshake passed.
pub struct Dp832<A> {
    adapter: A,
    identity: Instrument,
}

impl Dp832<TcpLineAdapter> {
    /// Dial `address`, identify the instrument and check its model.
    ///
    /// # Errors
    /// - `DaqError::Connect` if the socket cannot be opened
    /// - `DaqError::Io` / `DaqError::Timeout` / `DaqError::Parse` from the handshake
    /// - `DaqError::ModelMismatch` if the model differs from `expected_model`
    pub async fn connect_and_verify(
        address: &str,
        expected_model: &str,
        connect_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
    ) -> AppResult<Self> {
        let adapter = LineAdapterBuilder::new(address)
            .with_connect_timeout(connect_timeout)
            .with_read_timeout(read_timeout)
            .connect()
            .await?;
        Self::verify(adapter, expected_model).await
    }
}

impl<A: Adapter> Dp832<A> {
    /// Run the handshake over an open adapter.
    ///
    /// No measurement command is sent unless the model matches.
    pub async fn verify(mut adapter: A, expected_model: &str) -> AppResult<Self> {
        let identity = identify(&mut adapter).await?;
        if identity.model != expected_model {
            return Err(DaqError::ModelMismatch {
                expected: expected_model.to_string(),
                found: identity.model,
            });
        }

        info!(
            manufacturer = %identity.manufacturer,
            model = %identity.model,
            serial = %identity.serial,
            version = %identity.version,
            "Instrument identified"
        );
        Ok(Self { adapter, identity })
    }

    /// Identity captured during the handshake.
    pub fn identity(&self) -> &Instrument {
        &self.identity
    }

    /// Query live voltage, current and power of one channel.
    ///
    /// # Errors
    /// Adapter errors, or `DaqError::Parse` if the reply is not three numbers.
    pub async fn measure(&mut self, channel: Channel) -> AppResult<Measurement> {
        let command = format!("{} {}", MEASURE_ALL_QUERY, channel.token());
        let reply = self.adapter.exchange(&command).await?;
        let measurement = parse_measurement(channel, &reply)?;
        debug!(%measurement, "Decoded measurement");
        Ok(measurement)
    }

    /// Give back the adapter, e.g. to inspect a mock after a test.
    pub fn into_adapter(self) -> A {
        self.adapter
    }
}

/// Send `*IDN?` and decode the identity fields.
///
/// # Errors
/// Adapter errors, or `ParseError::FieldCount` if fewer than four fields come back.
pub async fn identify<A: Adapter + ?Sized>(adapter: &mut A) -> AppResult<Instrument> {
    let reply = adapter.exchange(IDN_QUERY).await?;
    parse_identity(&reply)
}

/// Decode an `*IDN?` reply. Fields beyond the fourth are ignored.
pub fn parse_identity(reply: &str) -> AppResult<Instrument> {
    let fields: Vec<&str> = reply.split(',').collect();
    if fields.len() < 4 {
        return Err(ParseError::FieldCount {
            expected: 4,
            found: fields.len(),
            payload: reply.to_string(),
        }
        .into());
    }
    if fields.len() > 4 {
        debug!(extra = fields.len() - 4, "Ignoring trailing identity fields");
    }

    Ok(Instrument {
        manufacturer: fields[0].to_string(),
        model: fields[1].to_string(),
        serial: fields[2].to_string(),
        version: fields[3].to_string(),
    })
}

/// Decode a `MEAS:ALL?` reply (`current,voltage,power`) for `channel`.
pub fn parse_measurement(channel: Channel, reply: &str) -> AppResult<Measurement> {
    let fields: Vec<&str> = reply.split(',').collect();
    let [current, voltage, power] = fields.as_slice() else {
        return Err(ParseError::FieldCount {
            expected: 3,
            found: fields.len(),
            payload: reply.to_string(),
        }
        .into());
    };

    Ok(Measurement {
        channel,
        current: parse_field("current", current)?,
        voltage: parse_field("voltage", voltage)?,
        power: parse_field("power", power)?,
    })
}

fn parse_field(field: &'static str, raw: &str) -> Result<f64, ParseError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

//! Instrument drivers.
//!
//! Drivers translate typed operations into SCPI command strings and decode the
//! replies. They never touch sockets directly; all I/O goes through an
//! [`crate::adapters::Adapter`].

pub mod dp832;

pub use dp832::{Dp832, DP832_MODEL};

use serde::Serialize;
use std::fmt;

/// Identity reported by `*IDN?`.
///
/// Captured once by the handshake and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instrument {
    /// Manufacturer field.
    pub manufacturer: String,
    /// Model field, compared against the expected model.
    pub model: String,
    /// Serial number field.
    pub serial: String,
    /// Firmware version field.
    pub version: String,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (serial {}, firmware {})",
            self.manufacturer, self.model, self.serial, self.version
        )
    }
}

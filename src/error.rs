//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! everything that can go wrong while talking to the power supply, from dialing the
//! socket to decoding a reply.
//!
//! ## Error Hierarchy
//!
//! - **`Connect`**: The TCP stream to the instrument could not be established
//!   (unreachable host, refused connection, resolution failure, connect deadline).
//!   Unrecoverable; startup is aborted.
//! - **`ModelMismatch`**: The handshake succeeded but the instrument reported a model
//!   other than the one we were configured for. Carries the observed model string.
//! - **`Io`**, **`ConnectionClosed`**, **`MalformedFrame`**: Failures during an
//!   exchange on an established connection.
//! - **`Timeout`**: The read deadline elapsed before a reply terminator arrived.
//! - **`Parse`**: A reply arrived but could not be decoded (see [`ParseError`]).
//! - **`InvalidChannel`**: A channel index or name outside the closed channel set.
//! - **`Config`** / **`Configuration`**: Loading or validating [`crate::config::Settings`].
//!
//! No variant is retried anywhere in the crate. Every error propagates with `?` to
//! the binary entry point, which decides how the process exits.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum DaqError {
    #[error("Failed to connect to instrument at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected instrument model {expected}, found {found}")]
    ModelMismatch { expected: String, found: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed before a reply terminator was received")]
    ConnectionClosed,

    #[error("Malformed reply frame: {0}")]
    MalformedFrame(String),

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse reply: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

/// Decoding failures for instrument replies.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The reply did not split into the number of comma-separated fields the
    /// query expects.
    #[error("expected {expected} comma-separated fields, found {found} in {payload:?}")]
    FieldCount {
        /// Field count the query requires.
        expected: usize,
        /// Field count actually present.
        found: usize,
        /// Raw reply payload.
        payload: String,
    },

    /// A numeric field could not be read as a real number.
    #[error("field '{field}' is not a number: {value:?}")]
    InvalidNumber {
        /// Name of the first field that failed.
        field: &'static str,
        /// Raw text of that field.
        value: String,
    },
}

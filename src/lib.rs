//! Core library for the dp832_daq polling client.
//!
//! This library contains the line transport, the DP832 driver, the poll loop
//! and the configuration and logging plumbing used by the `dp832_daq` binary.

pub mod acquisition;
pub mod adapters;
pub mod channel;
pub mod config;
pub mod error;
pub mod instrument;
pub mod measurement;
pub mod tracing_setup;

//! Tracing initialization.
//!
//! `RUST_LOG` takes precedence; otherwise the filter comes from
//! `application.log_level`. The formatter is plain text or newline-delimited
//! JSON, per `application.log_format`. Text is coloured only on a terminal.
//!
//! ```bash
//! RUST_LOG=dp832_daq=debug dp832_daq --addr 192.168.0.200:5555
//! DP832_APPLICATION__LOG_FORMAT=json dp832_daq
//! ```

use crate::config::Settings;
use crate::error::{AppResult, DaqError};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else `log_level`.
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Install the global subscriber described by `settings`.
///
/// Logs go to stderr so stdout stays free for JSON measurement output.
///
/// # Errors
/// `DaqError::Configuration` if a global subscriber is already installed.
pub fn init_from_config(settings: &Settings) -> AppResult<()> {
    let filter = env_filter(&settings.application.log_level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match settings.application.log_format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.with_ansi(use_ansi(&std::io::stderr())).try_init(),
    };

    result.map_err(|e| DaqError::Configuration(format!("Failed to initialize tracing: {}", e)))
}

/// Colour only when `out` is a terminal; redirected logs stay plain.
pub fn use_ansi<W: IsTerminal>(out: &W) -> bool {
    out.is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ansi_when_redirected_to_file() {
        let file = tempfile::tempfile().unwrap();
        assert!(!use_ansi(&file));
    }

    #[test]
    fn test_env_filter_falls_back_to_log_level() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter("debug").to_string(), "debug");
        }
    }
}


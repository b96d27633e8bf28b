//! DP832 output channels.
//!
//! The channel set is closed: three physical outputs plus the aggregate
//! pseudo-channel that addresses "all outputs". Everything known about a
//! channel (log name, protocol token, rated envelope) lives in a single
//! `static` table and is exposed read-only through [`ChannelRegistry`].

use crate::error::DaqError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Logical channel of the power supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Device-aggregate pseudo-channel. Encodes as an empty protocol argument.
    Aggregate,
    /// Output 1.
    Ch1,
    /// Output 2.
    Ch2,
    /// Output 3.
    Ch3,
}

/// Physical outputs in the order the poll loop visits them.
pub const PHYSICAL_CHANNELS: [Channel; 3] = [Channel::Ch1, Channel::Ch2, Channel::Ch3];

impl Channel {
    /// Position of this channel in the registry table.
    pub const fn index(self) -> u8 {
        match self {
            Channel::Aggregate => 0,
            Channel::Ch1 => 1,
            Channel::Ch2 => 2,
            Channel::Ch3 => 3,
        }
    }

    /// Name used in logs and reports (`ChC`, `Ch1`, ...).
    pub fn name(self) -> &'static str {
        ChannelRegistry::global().info(self).name
    }

    /// Argument used in `MEAS:ALL?` queries (empty for the aggregate channel).
    pub fn token(self) -> &'static str {
        ChannelRegistry::global().info(self).token
    }

    /// Rated envelope, if the channel is a physical output.
    pub fn range(self) -> Option<&'static ChannelRange> {
        ChannelRegistry::global().info(self).range.as_ref()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl TryFrom<u8> for Channel {
    type Error = DaqError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Channel::Aggregate),
            1 => Ok(Channel::Ch1),
            2 => Ok(Channel::Ch2),
            3 => Ok(Channel::Ch3),
            other => Err(DaqError::InvalidChannel(format!(
                "index {} (valid: 0-3)",
                other
            ))),
        }
    }
}

impl FromStr for Channel {
    type Err = DaqError;

    /// Accepts the log name (`Ch2`) or the protocol token (`CH2`), ignoring case.
    /// The aggregate channel is spelled `ChC`, `all` or `aggregate`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if ["all", "aggregate"]
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(wanted))
        {
            return Ok(Channel::Aggregate);
        }

        ChannelRegistry::global()
            .iter()
            .find(|info| {
                info.name.eq_ignore_ascii_case(wanted)
                    || (!info.token.is_empty() && info.token.eq_ignore_ascii_case(wanted))
            })
            .map(|info| info.channel)
            .ok_or_else(|| DaqError::InvalidChannel(format!("'{}'", s)))
    }
}

/// Rated voltage/current envelope of one physical output.
///
/// Advisory only: live readings are never checked against it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelRange {
    /// Minimum settable voltage (V).
    pub voltage_min: f64,
    /// Maximum settable voltage (V).
    pub voltage_max: f64,
    /// Minimum settable current (A).
    pub current_min: f64,
    /// Maximum settable current (A).
    pub current_max: f64,
}

/// One row of the channel table.
#[derive(Debug, Clone, Copy)]
pub struct ChannelInfo {
    /// Channel this row describes.
    pub channel: Channel,
    /// Log/report name.
    pub name: &'static str,
    /// Protocol argument token.
    pub token: &'static str,
    /// Rated envelope (`None` for the aggregate channel).
    pub range: Option<ChannelRange>,
}

/// Read-only view over the static channel table.
#[derive(Debug)]
pub struct ChannelRegistry {
    entries: [ChannelInfo; 4],
}

// Indexed by `Channel::index()`.
static REGISTRY: ChannelRegistry = ChannelRegistry {
    entries: [
        ChannelInfo {
            channel: Channel::Aggregate,
            name: "ChC",
            token: "",
            range: None,
        },
        ChannelInfo {
            channel: Channel::Ch1,
            name: "Ch1",
            token: "CH1",
            range: Some(ChannelRange {
                voltage_min: 0.0,
                voltage_max: 32.0,
                current_min: 0.0,
                current_max: 3.2,
            }),
        },
        ChannelInfo {
            channel: Channel::Ch2,
            name: "Ch2",
            token: "CH2",
            range: Some(ChannelRange {
                voltage_min: 0.0,
                voltage_max: 32.0,
                current_min: 0.0,
                current_max: 3.2,
            }),
        },
        ChannelInfo {
            channel: Channel::Ch3,
            name: "Ch3",
            token: "CH3",
            range: Some(ChannelRange {
                voltage_min: 0.0,
                voltage_max: 5.3,
                current_min: 0.0,
                current_max: 3.2,
            }),
        },
    ],
};

impl ChannelRegistry {
    /// The process-wide registry.
    pub fn global() -> &'static ChannelRegistry {
        &REGISTRY
    }

    /// Table row for `channel`.
    pub fn info(&self, channel: Channel) -> &ChannelInfo {
        &self.entries[usize::from(channel.index())]
    }

    /// All rows, aggregate first.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.entries.iter()
    }
}

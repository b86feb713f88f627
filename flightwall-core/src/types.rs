//! Shared types and the error enum for flightwall-core.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors produced by flightwall.
#[derive(Debug, Error)]
pub enum FlightwallError {
    #[error("invalid ICAO24 address: {0:?}")]
    InvalidIcao(String),
    #[error("unknown preference key: {0}")]
    UnknownPreference(String),
    #[error("invalid value {value:?} for preference {key}")]
    InvalidPreference { key: &'static str, value: String },
    #[error("config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response status {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, FlightwallError>;

// ---------------------------------------------------------------------------
// ICAO24 identifier
// ---------------------------------------------------------------------------

/// 24-bit transponder address, the stable entity identifier across polls.
///
/// Stored as an integer so keyed collections hash a `u32` instead of a
/// string. Rendered as six lowercase hex digits, which is what the telemetry
/// API uses in its paths and payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Icao24(u32);

impl Icao24 {
    pub const MAX: u32 = 0xFF_FFFF;

    /// Build from a 24-bit integer. Returns `None` if the value needs more bits.
    pub fn new(value: u32) -> Option<Self> {
        (value <= Self::MAX).then_some(Icao24(value))
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl FromStr for Icao24 {
    type Err = FlightwallError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim();
        if hex.is_empty() || hex.len() > 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FlightwallError::InvalidIcao(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(Icao24)
            .map_err(|_| FlightwallError::InvalidIcao(s.to_string()))
    }
}

impl TryFrom<String> for Icao24 {
    type Error = FlightwallError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Icao24> for String {
    fn from(value: Icao24) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Icao24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Connection status
// ---------------------------------------------------------------------------

/// Per-surface connection indicator, driven only by poll outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    /// No poll has completed yet.
    Connecting,
    /// Last poll succeeded. `latency_ms` is the server-measured query time.
    Connected { latency_ms: Option<f64> },
    /// Last poll failed; `failures` counts consecutive failed polls.
    Disconnected { failures: u32, reason: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected { .. })
    }

    /// Record a successful poll.
    pub fn succeed(&mut self, latency_ms: Option<f64>) {
        *self = ConnectionStatus::Connected { latency_ms };
    }

    /// Record a failed poll. The schedule keeps running; this only updates the indicator.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let failures = match self {
            ConnectionStatus::Disconnected { failures, .. } => *failures + 1,
            _ => 1,
        };
        *self = ConnectionStatus::Disconnected {
            failures,
            reason: reason.into(),
        };
    }

    /// Short indicator text for status bars.
    pub fn label(&self) -> String {
        match self {
            ConnectionStatus::Connecting => "connecting".into(),
            ConnectionStatus::Connected {
                latency_ms: Some(ms),
            } => format!("live {ms:.0}ms"),
            ConnectionStatus::Connected { latency_ms: None } => "live".into(),
            ConnectionStatus::Disconnected { failures, .. } => {
                format!("disconnected ({failures})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

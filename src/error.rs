//! Unified error types for the PillBox firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! poll loop's error handling uniform. All variants are `Copy` so they can
//! be carried inside dispense events and silo faults without allocation.
//!
//! Note that a pill timeout is *not* an error: it is an ordinary
//! [`PillOutcome`](crate::app::schedule::PillOutcome).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A silo gate (motor or beam sensor) could not be driven.
    Gate(GateError),
    /// The network or backend could not be reached.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gate(e) => write!(f, "gate: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Gate errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// Silo index outside `0..count`. A programming/config error; the
    /// offending operation is rejected without touching hardware.
    InvalidSilo { silo: usize, count: usize },
    /// Writing the motor output pin failed.
    MotorWrite { silo: usize },
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSilo { silo, count } => {
                write!(f, "invalid silo {silo} (device has {count})")
            }
            Self::MotorWrite { silo } => write!(f, "motor write failed on silo {silo}"),
        }
    }
}

impl From<GateError> for Error {
    fn from(e: GateError) -> Self {
        Self::Gate(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiConnectFailed,
    WifiDisconnected,
    HttpRequestFailed,
    HttpStatus(u16),
    GraphqlErrors,
    MalformedResponse,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::WifiDisconnected => write!(f, "WiFi disconnected"),
            Self::HttpRequestFailed => write!(f, "HTTP request failed"),
            Self::HttpStatus(code) => write!(f, "HTTP error {code}"),
            Self::GraphqlErrors => write!(f, "GraphQL returned errors"),
            Self::MalformedResponse => write!(f, "malformed backend response"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

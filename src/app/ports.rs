//! Port traits: the hexagonal boundary between the dispense sequencer and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DispenseService (domain)
//! ```
//!
//! Driven adapters (silo gates, status LED, clock, backend, event sinks)
//! implement these traits. The [`DispenseService`](super::service::DispenseService)
//! consumes them via generics, so the domain core never touches GPIO,
//! timers or sockets directly and every test can run on the host.

use crate::error::{CommsError, GateError};

use super::events::DispenseEvent;
use super::schedule::{DispenseReport, DueEntry};

// ───────────────────────────────────────────────────────────────
// Silo port (driven adapter: domain ↔ motors + beam sensors)
// ───────────────────────────────────────────────────────────────

/// Index-addressed access to the silo gates, `0..silo_count()`.
///
/// Out-of-range indices are a programming error: implementations log
/// them, touch no hardware, and return [`GateError::InvalidSilo`] (or
/// `false` from [`is_triggered`](Self::is_triggered)).
pub trait SiloPort {
    /// Number of silos fitted.
    fn silo_count(&self) -> usize;

    /// Start the vibration motor. Activating a running motor is a no-op.
    fn activate(&mut self, silo: usize) -> Result<(), GateError>;

    /// Stop the vibration motor. Deactivating a stopped motor is a no-op.
    fn deactivate(&mut self, silo: usize) -> Result<(), GateError>;

    /// `true` while a pill occludes the silo's beam.
    fn is_triggered(&mut self, silo: usize) -> bool;

    /// Force every motor off. Never fails; individual pin errors are logged.
    fn stop_all(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Status light port (driven adapter: domain → LED)
// ───────────────────────────────────────────────────────────────

/// Operator-facing status LED.
pub trait StatusLight {
    fn set_light(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Injectable time source and blocking sleep.
///
/// The pill cycle measures its timeout with [`now_ms`](Self::now_ms) and
/// paces sensor polling with [`sleep_ms`](Self::sleep_ms); tests substitute
/// a simulated clock so no real time passes.
pub trait Clock {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> u64;

    /// Block the caller for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);

    /// Wall-clock seconds since the Unix epoch (UTC).
    fn unix_secs(&self) -> i64;
}

// ───────────────────────────────────────────────────────────────
// Backend ports (driven adapters: domain ↔ remote service)
// ───────────────────────────────────────────────────────────────

/// Supplies the schedule entries due right now.
pub trait DueSource {
    fn due_now(&mut self) -> Result<Vec<DueEntry>, CommsError>;
}

/// Receives the final status of each processed due entry.
///
/// The domain only logs the returned error; it never retries and never
/// re-dispenses.
pub trait ReportSink {
    fn record_dispense(&mut self, report: &DispenseReport<'_>) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DispenseEvent`]s through this port.
/// Adapters decide where they go (serial log, test recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &DispenseEvent);
}

//! Outbound dispense events.
//!
//! The [`DispenseService`](super::service::DispenseService) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on the
//! other side decide what to do with them: log to serial or record them in
//! a test.

use crate::error::{CommsError, GateError};

use super::schedule::{ScheduleStatus, SiloResult};

/// Structured events emitted by the dispense core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispenseEvent {
    /// Processing of a due entry has begun.
    ScheduleStarted {
        schedule_id: String,
        title: String,
        medications: usize,
    },

    /// About to dispense `qty` pills of `name` from `silo_slot`.
    SiloStarted {
        silo_slot: i32,
        name: String,
        qty: u32,
    },

    /// Pill `pill` of `of` fell through the beam.
    PillDispensed { silo: usize, pill: u32, of: u32 },

    /// Pill `pill` of `of` was not detected within `timeout_ms`.
    PillTimedOut {
        silo: usize,
        pill: u32,
        of: u32,
        timeout_ms: u32,
    },

    /// A silo run completed (successfully or not).
    SiloFinished(SiloResult),

    /// A request named a silo that does not exist; nothing was dispensed.
    SiloRejected { silo_slot: i32, silo_count: usize },

    /// A gate failed mid-run; all motors were forced off.
    HardwareFault { silo_slot: i32, error: GateError },

    /// The verdict for a due entry has been computed.
    VerdictReady {
        schedule_id: String,
        status: ScheduleStatus,
    },

    /// The report sink accepted the verdict.
    ReportRecorded {
        schedule_id: String,
        status: ScheduleStatus,
    },

    /// The report sink failed; the dispense is not retried.
    ReportFailed {
        schedule_id: String,
        error: CommsError,
    },
}

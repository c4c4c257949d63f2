//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing dispense events to the logger
//! (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::DispenseEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`DispenseEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DispenseEvent) {
        match event {
            DispenseEvent::ScheduleStarted {
                schedule_id,
                title,
                medications,
            } => {
                info!("SCHED | {} '{}' | {} medication(s)", schedule_id, title, medications);
            }
            DispenseEvent::SiloStarted { silo_slot, name, qty } => {
                info!("SILO  | {} | dispensing {} x{}", silo_slot, name, qty);
            }
            DispenseEvent::PillDispensed { silo, pill, of } => {
                info!("PILL  | silo {} | {}/{} detected", silo, pill, of);
            }
            DispenseEvent::PillTimedOut {
                silo,
                pill,
                of,
                timeout_ms,
            } => {
                warn!("PILL  | silo {} | {}/{} not detected within {}ms", silo, pill, of, timeout_ms);
            }
            DispenseEvent::SiloFinished(r) => {
                let tag = if r.success() { "OK" } else { "SHORT" };
                info!("SILO  | {} | {}/{} dispensed [{}]", r.silo(), r.dispensed(), r.requested(), tag);
            }
            DispenseEvent::SiloRejected { silo_slot, silo_count } => {
                warn!("SILO  | {} | rejected, only {} silo(s) fitted", silo_slot, silo_count);
            }
            DispenseEvent::HardwareFault { silo_slot, error } => {
                warn!("FAULT | silo {} | {} | motors stopped", silo_slot, error);
            }
            DispenseEvent::VerdictReady { schedule_id, status } => {
                info!("VERDICT | {} | {}", schedule_id, status.as_str());
            }
            DispenseEvent::ReportRecorded { schedule_id, status } => {
                info!("REPORT | {} | {} recorded", schedule_id, status.as_str());
            }
            DispenseEvent::ReportFailed { schedule_id, error } => {
                warn!("REPORT | {} | failed: {}", schedule_id, error);
            }
        }
    }
}

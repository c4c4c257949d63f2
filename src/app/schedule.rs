//! Dispense data model: due entries in, silo results and verdicts out.
//!
//! [`DueEntry`] mirrors the core-facing JSON shape
//! (`{scheduleId, title, dueAtISO, medications: [{medicationId, siloSlot, qty}]}`)
//! and [`DispenseReport`] is exactly what the report sink receives.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────
// Input
// ───────────────────────────────────────────────────────────────

/// One scheduled occurrence that must be acted on now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueEntry {
    pub schedule_id: String,
    #[serde(default = "unknown_name")]
    pub title: String,
    #[serde(rename = "dueAtISO")]
    pub due_at_iso: String,
    pub medications: Vec<MedicationRequest>,
}

/// "Dispense `qty` pills of this medication from `silo_slot`".
///
/// `silo_slot` is kept signed as delivered by the backend; the sequencer
/// rejects anything outside `0..silo_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    pub medication_id: String,
    #[serde(default = "unknown_name")]
    pub name: String,
    pub silo_slot: i32,
    pub qty: u32,
}

pub(crate) fn unknown_name() -> String {
    "Unknown".to_owned()
}

impl MedicationRequest {
    pub fn new(medication_id: &str, silo_slot: i32, qty: u32) -> Self {
        Self {
            medication_id: medication_id.to_owned(),
            name: unknown_name(),
            silo_slot,
            qty,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Outcomes
// ───────────────────────────────────────────────────────────────

/// Result of a single pill dispense cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PillOutcome {
    /// The beam broke before the per-pill timeout.
    Detected,
    /// The timeout elapsed first (empty or jammed silo).
    TimedOut,
}

/// Aggregate of one silo's dispense run. Immutable once returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiloResult {
    silo: i32,
    requested: u32,
    dispensed: u32,
}

impl SiloResult {
    pub fn new(silo: i32, requested: u32, dispensed: u32) -> Self {
        Self {
            silo,
            requested,
            dispensed,
        }
    }

    /// Zero-pill failure for a request that never reached the hardware.
    pub fn rejected(silo: i32, requested: u32) -> Self {
        Self::new(silo, requested, 0)
    }

    pub fn silo(&self) -> i32 {
        self.silo
    }

    pub fn requested(&self) -> u32 {
        self.requested
    }

    pub fn dispensed(&self) -> u32 {
        self.dispensed
    }

    pub fn success(&self) -> bool {
        self.dispensed == self.requested
    }
}

/// Overall outcome reported for a due entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleStatus {
    Taken,
    Failed,
}

impl ScheduleStatus {
    /// TAKEN iff every silo result succeeded; vacuously TAKEN when empty.
    pub fn from_results(results: &[SiloResult]) -> Self {
        if results.iter().all(SiloResult::success) {
            Self::Taken
        } else {
            Self::Failed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Taken => "TAKEN",
            Self::Failed => "FAILED",
        }
    }
}

/// Final verdict for one due entry. Built once, reported once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleVerdict {
    schedule_id: String,
    due_at_iso: String,
    acted_at_iso: String,
    status: ScheduleStatus,
    silo_results: Vec<SiloResult>,
}

impl ScheduleVerdict {
    /// `aborted` forces FAILED regardless of the results gathered so far.
    pub fn new(entry: &DueEntry, acted_at_iso: String, silo_results: Vec<SiloResult>, aborted: bool) -> Self {
        let status = if aborted {
            ScheduleStatus::Failed
        } else {
            ScheduleStatus::from_results(&silo_results)
        };
        Self {
            schedule_id: entry.schedule_id.clone(),
            due_at_iso: entry.due_at_iso.clone(),
            acted_at_iso,
            status,
            silo_results,
        }
    }

    pub fn schedule_id(&self) -> &str {
        &self.schedule_id
    }

    pub fn due_at_iso(&self) -> &str {
        &self.due_at_iso
    }

    pub fn acted_at_iso(&self) -> &str {
        &self.acted_at_iso
    }

    pub fn status(&self) -> ScheduleStatus {
        self.status
    }

    pub fn silo_results(&self) -> &[SiloResult] {
        &self.silo_results
    }

    /// The payload handed to the report sink.
    pub fn report(&self) -> DispenseReport<'_> {
        DispenseReport {
            schedule_id: &self.schedule_id,
            due_at_iso: &self.due_at_iso,
            acted_at_iso: &self.acted_at_iso,
            status: self.status,
        }
    }
}

/// `{scheduleId, dueAtISO, actedAtISO, status}` as sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseReport<'a> {
    pub schedule_id: &'a str,
    #[serde(rename = "dueAtISO")]
    pub due_at_iso: &'a str,
    #[serde(rename = "actedAtISO")]
    pub acted_at_iso: &'a str,
    pub status: ScheduleStatus,
}

/// Format Unix seconds as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn iso_timestamp(unix_secs: i64) -> String {
    DateTime::from_timestamp(unix_secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

//! Dispense service: the hexagonal core.
//!
//! [`DispenseService`] owns the dispenser configuration and running
//! counters. All I/O flows through port traits injected at call sites, so
//! the whole orchestration runs against mock adapters in tests.
//!
//! ```text
//!  DueSource ──▶ ┌───────────────────────────┐ ──▶ ReportSink
//!                │      DispenseService       │
//!   SiloPort ◀──▶│ schedule · silo · cycle    │ ──▶ EventSink
//!                └───────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::config::{BlinkPattern, DispenserConfig};
use crate::error::CommsError;
use crate::safety::MotorGuard;

use super::events::DispenseEvent;
use super::feedback;
use super::ports::{Clock, DueSource, EventSink, ReportSink, SiloPort, StatusLight};
use super::schedule::{DueEntry, ScheduleStatus, ScheduleVerdict, iso_timestamp};
use super::silo::{self, SiloFault};

/// LED pattern shown at the start of the boot self-test.
const SELF_TEST_BLINK: BlinkPattern = BlinkPattern::new(3, 200);

/// Running counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispenseStats {
    /// Due entries processed.
    pub schedules: u64,
    pub taken: u64,
    pub failed: u64,
    /// Verdicts the backend did not accept.
    pub reports_failed: u64,
}

// ───────────────────────────────────────────────────────────────
// DispenseService
// ───────────────────────────────────────────────────────────────

/// Orchestrates due entries into silo runs, verdicts and reports.
pub struct DispenseService {
    config: DispenserConfig,
    stats: DispenseStats,
}

impl DispenseService {
    pub fn new(config: DispenserConfig) -> Self {
        Self {
            config,
            stats: DispenseStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put every output in its safe state: LED off, all motors off.
    pub fn init_hardware<H: SiloPort + StatusLight>(&self, hw: &mut H) {
        hw.set_light(false);
        hw.stop_all();
        info!("hardware initialised: {} silo(s), motors off", hw.silo_count());
    }

    /// Boot self-test: blink, pulse each motor once, sample every beam.
    ///
    /// Returns the beam state per silo (`true` = blocked). A blocked beam at
    /// boot usually means a pill is stuck in the chute.
    pub fn self_test<H: SiloPort + StatusLight>(
        &self,
        hw: &mut H,
        clock: &mut impl Clock,
    ) -> Vec<bool> {
        info!("running hardware self-test");
        feedback::blink(hw, clock, SELF_TEST_BLINK);

        let silo_count = hw.silo_count();
        {
            let mut guard = MotorGuard::new(hw);
            for silo in 0..silo_count {
                info!("  testing motor {}", silo);
                feedback::pulse_one(&mut *guard, clock, silo, self.config.self_test_pulse_ms);
                clock.sleep_ms(self.config.self_test_gap_ms);
            }
        }

        let beams: Vec<bool> = (0..silo_count).map(|silo| hw.is_triggered(silo)).collect();
        for (silo, &blocked) in beams.iter().enumerate() {
            if blocked {
                warn!("  beam sensor {}: BLOCKED", silo);
            } else {
                info!("  beam sensor {}: clear", silo);
            }
        }
        info!("self-test complete");
        beams
    }

    // ── Dispensing ────────────────────────────────────────────

    /// Dispense one due entry end to end and report the verdict once.
    ///
    /// Motors run only inside a [`MotorGuard`] scope; the report is sent
    /// after the guard has forced every motor off. A reporting failure is
    /// logged and emitted but never retried.
    pub fn dispense_schedule<H: SiloPort + StatusLight>(
        &mut self,
        entry: &DueEntry,
        hw: &mut H,
        clock: &mut impl Clock,
        reporter: &mut impl ReportSink,
        sink: &mut impl EventSink,
    ) -> ScheduleVerdict {
        info!(
            "processing '{}' ({} medication(s))",
            entry.title,
            entry.medications.len()
        );
        sink.emit(&DispenseEvent::ScheduleStarted {
            schedule_id: entry.schedule_id.clone(),
            title: entry.title.clone(),
            medications: entry.medications.len(),
        });

        let mut results = Vec::with_capacity(entry.medications.len());
        let mut aborted = false;
        {
            let mut guard = MotorGuard::new(hw);
            feedback::pulse_all(&mut *guard, clock, self.config.start_pulse_ms);

            for med in &entry.medications {
                info!("  {} x{} from silo {}", med.name, med.qty, med.silo_slot);
                sink.emit(&DispenseEvent::SiloStarted {
                    silo_slot: med.silo_slot,
                    name: med.name.clone(),
                    qty: med.qty,
                });

                match silo::dispense_from_silo(
                    &mut *guard,
                    clock,
                    med.silo_slot,
                    med.qty,
                    &self.config,
                    sink,
                ) {
                    Ok(result) => results.push(result),
                    Err(SiloFault { partial, error: e }) => {
                        error!("silo {}: {}; aborting entry", med.silo_slot, e);
                        guard.stop_all();
                        sink.emit(&DispenseEvent::HardwareFault {
                            silo_slot: med.silo_slot,
                            error: e,
                        });
                        results.push(partial);
                        aborted = true;
                        break;
                    }
                }
            }
        }

        let verdict = ScheduleVerdict::new(entry, iso_timestamp(clock.unix_secs()), results, aborted);
        let status = verdict.status();
        info!("'{}' -> {}", entry.title, status.as_str());
        sink.emit(&DispenseEvent::VerdictReady {
            schedule_id: verdict.schedule_id().to_owned(),
            status,
        });

        match reporter.record_dispense(&verdict.report()) {
            Ok(()) => sink.emit(&DispenseEvent::ReportRecorded {
                schedule_id: verdict.schedule_id().to_owned(),
                status,
            }),
            Err(e) => {
                warn!("report for {} failed: {}", verdict.schedule_id(), e);
                self.stats.reports_failed += 1;
                sink.emit(&DispenseEvent::ReportFailed {
                    schedule_id: verdict.schedule_id().to_owned(),
                    error: e,
                });
            }
        }

        self.stats.schedules += 1;
        match status {
            ScheduleStatus::Taken => {
                self.stats.taken += 1;
                feedback::blink(hw, clock, self.config.success_blink);
            }
            ScheduleStatus::Failed => {
                self.stats.failed += 1;
                feedback::blink(hw, clock, self.config.failure_blink);
            }
        }

        verdict
    }

    /// Process a batch of due entries in order.
    ///
    /// Motors are forced off before the batch starts. Each entry is
    /// independent: a failed or unreported entry never blocks the next.
    pub fn process_due<H: SiloPort + StatusLight>(
        &mut self,
        entries: &[DueEntry],
        hw: &mut H,
        clock: &mut impl Clock,
        reporter: &mut impl ReportSink,
        sink: &mut impl EventSink,
    ) -> Vec<ScheduleVerdict> {
        hw.stop_all();
        let mut verdicts = Vec::with_capacity(entries.len());
        for entry in entries {
            verdicts.push(self.dispense_schedule(entry, hw, clock, reporter, sink));
        }
        verdicts
    }

    /// One poll cycle: fetch the due list, then dispense and report it.
    ///
    /// An empty list returns without touching the motors beyond the
    /// initial safety stop.
    pub fn run_poll_cycle<H, B>(
        &mut self,
        backend: &mut B,
        hw: &mut H,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) -> Result<Vec<ScheduleVerdict>, CommsError>
    where
        H: SiloPort + StatusLight,
        B: DueSource + ReportSink,
    {
        hw.stop_all();
        let due = backend.due_now()?;
        if due.is_empty() {
            info!("no medications due");
            return Ok(Vec::new());
        }

        info!("{} schedule(s) due", due.len());
        Ok(self.process_due(&due, hw, clock, backend, sink))
    }

    /// Show the error pattern on the status LED.
    pub fn signal_error(&self, light: &mut impl StatusLight, clock: &mut impl Clock) {
        feedback::blink(light, clock, self.config.error_blink);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &DispenserConfig {
        &self.config
    }

    pub fn stats(&self) -> DispenseStats {
        self.stats
    }
}

//! Silo dispense sequencer: `qty` pill cycles against one silo.
//!
//! A timed-out pill does not abort the silo; the remaining pills are still
//! attempted and the shortfall shows up in the [`SiloResult`].

use crate::config::DispenserConfig;
use crate::error::GateError;

use super::cycle::{self, CycleFault, CycleTiming};
use super::events::DispenseEvent;
use super::feedback;
use super::ports::{Clock, EventSink, SiloPort, StatusLight};
use super::schedule::{PillOutcome, SiloResult};

/// A gate failed part-way through a silo run.
///
/// `partial` keeps the pills that were confirmed before the failure so the
/// count is never lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiloFault {
    pub partial: SiloResult,
    pub error: GateError,
}

/// Dispense `qty` pills from `silo_slot`.
///
/// An out-of-range slot yields a zero, failed result without any hardware
/// access.
pub fn dispense_from_silo<H: SiloPort + StatusLight>(
    hw: &mut H,
    clock: &mut impl Clock,
    silo_slot: i32,
    qty: u32,
    config: &DispenserConfig,
    sink: &mut impl EventSink,
) -> Result<SiloResult, SiloFault> {
    let silo_count = hw.silo_count();
    let Some(silo) = usize::try_from(silo_slot).ok().filter(|&s| s < silo_count) else {
        sink.emit(&DispenseEvent::SiloRejected {
            silo_slot,
            silo_count,
        });
        return Ok(SiloResult::rejected(silo_slot, qty));
    };

    let timing = CycleTiming::from(config);
    let mut dispensed = 0;

    for pill in 1..=qty {
        match cycle::dispense_pill(hw, clock, silo, timing) {
            Ok(PillOutcome::Detected) => {
                dispensed += 1;
                sink.emit(&DispenseEvent::PillDispensed { silo, pill, of: qty });
                feedback::flash(hw, clock, config.pill_blink_ms);
                if pill < qty {
                    clock.sleep_ms(config.pill_settle_ms);
                }
            }
            Ok(PillOutcome::TimedOut) => {
                sink.emit(&DispenseEvent::PillTimedOut {
                    silo,
                    pill,
                    of: qty,
                    timeout_ms: timing.timeout_ms,
                });
            }
            Err(CycleFault { outcome, error }) => {
                if outcome == Some(PillOutcome::Detected) {
                    dispensed += 1;
                    sink.emit(&DispenseEvent::PillDispensed { silo, pill, of: qty });
                }
                return Err(SiloFault {
                    partial: SiloResult::new(silo_slot, qty, dispensed),
                    error,
                });
            }
        }
    }

    let result = SiloResult::new(silo_slot, qty, dispensed);
    sink.emit(&DispenseEvent::SiloFinished(result));
    Ok(result)
}

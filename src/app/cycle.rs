//! Pill dispense cycle: vibrate one silo until a pill breaks the beam or
//! the per-pill timeout expires.
//!
//! ```text
//!   activate ──▶ [ elapsed ≥ timeout? ──yes──▶ TimedOut ]
//!                [ triggered?        ──yes──▶ Detected ]
//!                [ sleep(poll)       ──────▶ loop      ]
//!   deactivate (always) ◀──────────────────────────────┘
//! ```
//!
//! The timeout check runs before the detection check on every sample, so a
//! pill first seen exactly at the timeout boundary counts as `TimedOut`.

use log::debug;

use crate::config::DispenserConfig;
use crate::error::GateError;

use super::ports::{Clock, SiloPort};
use super::schedule::PillOutcome;

/// Timing parameters of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTiming {
    pub timeout_ms: u32,
    pub poll_ms: u32,
}

impl From<&DispenserConfig> for CycleTiming {
    fn from(c: &DispenserConfig) -> Self {
        Self {
            timeout_ms: c.pill_timeout_ms,
            poll_ms: c.sensor_poll_ms,
        }
    }
}

/// A motor write failed during a cycle.
///
/// `outcome` is what the beam reported before the failing stop, or `None`
/// when the motor never started. A `Detected` outcome here is a pill that
/// really fell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleFault {
    pub outcome: Option<PillOutcome>,
    pub error: GateError,
}

/// Dispense exactly one pill from `silo`.
///
/// An `Err` only arises from a failed motor write; a timeout is an ordinary
/// [`PillOutcome::TimedOut`]. The caller must still force the motor off
/// after a fault.
pub fn dispense_pill(
    silos: &mut impl SiloPort,
    clock: &mut impl Clock,
    silo: usize,
    timing: CycleTiming,
) -> Result<PillOutcome, CycleFault> {
    if let Err(error) = silos.activate(silo) {
        // Half-applied writes must not leave the motor running.
        let _ = silos.deactivate(silo);
        return Err(CycleFault { outcome: None, error });
    }

    let started = clock.now_ms();
    let timeout = u64::from(timing.timeout_ms);
    let outcome = loop {
        let elapsed = clock.now_ms().saturating_sub(started);
        if elapsed >= timeout {
            break PillOutcome::TimedOut;
        }
        if silos.is_triggered(silo) {
            debug!("silo {}: pill detected after {}ms", silo, elapsed);
            break PillOutcome::Detected;
        }
        clock.sleep_ms(timing.poll_ms);
    };

    silos.deactivate(silo).map_err(|error| CycleFault {
        outcome: Some(outcome),
        error,
    })?;
    Ok(outcome)
}

//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the dispensing rules for the PillBox: the pill
//! cycle, the per-silo sequencer, schedule verdicts and the orchestrating
//! service. All interaction with hardware and the backend happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod cycle;
pub mod events;
pub mod feedback;
pub mod ports;
pub mod schedule;
pub mod service;
pub mod silo;

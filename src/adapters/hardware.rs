//! Hardware adapter: bridges the gate bank and status LED to the domain
//! port traits.
//!
//! This is the only type the dispense core sees on the device. On
//! non-espidf targets the same adapter wraps in-memory pins.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::{SiloPort, StatusLight};
use crate::drivers::gate::GateBank;
use crate::drivers::status_led::StatusLed;
use crate::error::GateError;

/// Concrete adapter that combines all dispenser hardware behind the ports.
pub struct HardwareAdapter<M, D, L> {
    gates: GateBank<M, D>,
    led: StatusLed<L>,
}

impl<M: OutputPin, D: InputPin, L: OutputPin> HardwareAdapter<M, D, L> {
    pub fn new(gates: GateBank<M, D>, led: StatusLed<L>) -> Self {
        Self { gates, led }
    }
}

// ── SiloPort implementation ───────────────────────────────────

impl<M: OutputPin, D: InputPin, L: OutputPin> SiloPort for HardwareAdapter<M, D, L> {
    fn silo_count(&self) -> usize {
        self.gates.silo_count()
    }

    fn activate(&mut self, silo: usize) -> Result<(), GateError> {
        self.gates.activate(silo)
    }

    fn deactivate(&mut self, silo: usize) -> Result<(), GateError> {
        self.gates.deactivate(silo)
    }

    fn is_triggered(&mut self, silo: usize) -> bool {
        self.gates.is_triggered(silo)
    }

    fn stop_all(&mut self) {
        self.gates.stop_all();
    }
}

// ── StatusLight implementation ────────────────────────────────

impl<M: OutputPin, D: InputPin, L: OutputPin> StatusLight for HardwareAdapter<M, D, L> {
    fn set_light(&mut self, on: bool) {
        self.led.set_light(on);
    }
}

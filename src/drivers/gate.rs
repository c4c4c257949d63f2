//! Silo gate driver: one vibration motor plus one IR break-beam sensor.
//!
//! Motors are active-high through the driver transistor. The beam receiver
//! pulls its line low while the beam is broken when `active_low` is set.
//!
//! ## Dual-target design
//!
//! Generic over `embedded-hal` 1.0 pins. On ESP-IDF `main()` hands in
//! `PinDriver`s; on the host the tests hand in in-memory pins.

use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;
use log::{error, warn};

use crate::app::ports::SiloPort;
use crate::config::MAX_SILOS;
use crate::error::GateError;

/// A single silo's motor and beam sensor.
pub struct Gate<M, D> {
    motor: M,
    beam: D,
    active_low: bool,
    motor_on: bool,
}

impl<M: OutputPin, D: InputPin> Gate<M, D> {
    pub fn new(motor: M, beam: D, active_low: bool) -> Self {
        Self {
            motor,
            beam,
            active_low,
            motor_on: false,
        }
    }

    pub fn is_motor_on(&self) -> bool {
        self.motor_on
    }

    /// Drive the motor; the cached state only changes on a successful write.
    fn set_motor(&mut self, on: bool) -> Result<(), M::Error> {
        if on {
            self.motor.set_high()?;
        } else {
            self.motor.set_low()?;
        }
        self.motor_on = on;
        Ok(())
    }

    fn beam_broken(&mut self) -> Result<bool, D::Error> {
        let level = self.beam.is_high()?;
        Ok(level != self.active_low)
    }
}

/// The fitted set of gates, addressed by silo index.
pub struct GateBank<M, D> {
    gates: Vec<Gate<M, D>, MAX_SILOS>,
}

impl<M: OutputPin, D: InputPin> GateBank<M, D> {
    pub fn new() -> Self {
        Self { gates: Vec::new() }
    }

    /// Append a gate; fails once [`MAX_SILOS`] gates are fitted.
    pub fn push(&mut self, gate: Gate<M, D>) -> Result<(), Gate<M, D>> {
        self.gates.push(gate)
    }

    pub fn gate(&self, silo: usize) -> Option<&Gate<M, D>> {
        self.gates.get(silo)
    }

    fn checked(&mut self, silo: usize) -> Result<&mut Gate<M, D>, GateError> {
        let count = self.gates.len();
        self.gates.get_mut(silo).ok_or_else(|| {
            error!("invalid silo index {} (have {})", silo, count);
            GateError::InvalidSilo { silo, count }
        })
    }
}

impl<M: OutputPin, D: InputPin> Default for GateBank<M, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: OutputPin, D: InputPin> SiloPort for GateBank<M, D> {
    fn silo_count(&self) -> usize {
        self.gates.len()
    }

    fn activate(&mut self, silo: usize) -> Result<(), GateError> {
        self.checked(silo)?.set_motor(true).map_err(|e| {
            error!("silo {}: motor start failed: {:?}", silo, e);
            GateError::MotorWrite { silo }
        })
    }

    fn deactivate(&mut self, silo: usize) -> Result<(), GateError> {
        self.checked(silo)?.set_motor(false).map_err(|e| {
            error!("silo {}: motor stop failed: {:?}", silo, e);
            GateError::MotorWrite { silo }
        })
    }

    fn is_triggered(&mut self, silo: usize) -> bool {
        let Ok(gate) = self.checked(silo) else {
            return false;
        };
        gate.beam_broken().unwrap_or_else(|e| {
            warn!("silo {}: beam read failed: {:?}", silo, e);
            false
        })
    }

    fn stop_all(&mut self) {
        for (silo, gate) in self.gates.iter_mut().enumerate() {
            if let Err(e) = gate.set_motor(false) {
                error!("silo {}: failed to stop motor: {:?}", silo, e);
            }
        }
    }
}

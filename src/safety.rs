//! Motor safety guard.
//!
//! Every dispensing window runs inside a [`MotorGuard`]. Dropping the guard
//! calls [`SiloPort::stop_all`], so the motors are forced off on the normal
//! path, on an early return after a gate fault, and while unwinding from a
//! panic alike.
//!
//! ## Invariants
//!
//! 1. No motor is left running once a due entry has been processed.
//! 2. No network call (due-list fetch, report) is made while the guard is
//!    alive; the borrow checker enforces this because the guard holds the
//!    only mutable borrow of the hardware.

use core::ops::{Deref, DerefMut};

use log::debug;

use crate::app::ports::SiloPort;

/// Exclusive borrow of the hardware that stops every motor on drop.
pub struct MotorGuard<'a, S: SiloPort> {
    hw: &'a mut S,
}

impl<'a, S: SiloPort> MotorGuard<'a, S> {
    pub fn new(hw: &'a mut S) -> Self {
        Self { hw }
    }
}

impl<S: SiloPort> Deref for MotorGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.hw
    }
}

impl<S: SiloPort> DerefMut for MotorGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.hw
    }
}

impl<S: SiloPort> Drop for MotorGuard<'_, S> {
    fn drop(&mut self) {
        self.hw.stop_all();
        debug!("motor guard released: all motors off");
    }
}

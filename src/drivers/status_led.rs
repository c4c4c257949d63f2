//! Single-colour status LED driver.
//!
//! Generic over an `embedded-hal` output pin. A failed write is logged and
//! otherwise ignored; the LED never influences a dispense outcome.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::StatusLight;

pub struct StatusLed<P> {
    pin: P,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> StatusLight for StatusLed<P> {
    fn set_light(&mut self, on: bool) {
        let res = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = res {
            warn!("status LED write failed: {:?}", e);
        }
    }
}

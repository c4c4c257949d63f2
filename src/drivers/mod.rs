//! Peripheral drivers for the silo gates and the status LED.

pub mod gate;
pub mod status_led;

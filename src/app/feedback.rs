//! Operator feedback: LED blinks and haptic motor pulses.
//!
//! Purely observational. Nothing here influences a verdict, and pin errors
//! are logged rather than propagated.

use log::warn;

use crate::config::BlinkPattern;

use super::ports::{Clock, SiloPort, StatusLight};

/// Blink the status LED `pattern.count` times, ending with the LED off.
pub fn blink(light: &mut impl StatusLight, clock: &mut impl Clock, pattern: BlinkPattern) {
    for _ in 0..pattern.count {
        light.set_light(true);
        clock.sleep_ms(pattern.interval_ms);
        light.set_light(false);
        clock.sleep_ms(pattern.interval_ms);
    }
}

/// Single short LED flash; returns as soon as the LED is off again.
pub fn flash(light: &mut impl StatusLight, clock: &mut impl Clock, duration_ms: u32) {
    light.set_light(true);
    clock.sleep_ms(duration_ms);
    light.set_light(false);
}

/// Vibrate every silo at once for `duration_ms`, then force all motors off.
pub fn pulse_all(silos: &mut impl SiloPort, clock: &mut impl Clock, duration_ms: u32) {
    for silo in 0..silos.silo_count() {
        if let Err(e) = silos.activate(silo) {
            warn!("haptic pulse: {}", e);
        }
    }
    clock.sleep_ms(duration_ms);
    silos.stop_all();
}

/// Vibrate one silo for `duration_ms`.
pub fn pulse_one(silos: &mut impl SiloPort, clock: &mut impl Clock, silo: usize, duration_ms: u32) {
    if let Err(e) = silos.activate(silo) {
        warn!("haptic pulse: {}", e);
    }
    clock.sleep_ms(duration_ms);
    if let Err(e) = silos.deactivate(silo) {
        warn!("haptic pulse: {}; stopping all motors", e);
        silos.stop_all();
    }
}

//! GPIO pin assignments for the PillBox main board.
//!
//! Single source of truth: `main` builds every pin driver from these
//! tables rather than hard-coding numbers. Silo `i` uses
//! `VIBRATION_MOTOR_GPIOS[i]` and `BEAM_SENSOR_GPIOS[i]`.

// ---------------------------------------------------------------------------
// Silos
// ---------------------------------------------------------------------------

/// Digital outputs driving the pancake vibration motor of each silo
/// (through a logic-level MOSFET, active HIGH).
pub const VIBRATION_MOTOR_GPIOS: [i32; 3] = [16, 17, 18];

/// Digital inputs from the IR beam-break receiver of each silo.
/// Pulled up; the receiver pulls the line LOW while a pill breaks the beam.
pub const BEAM_SENSOR_GPIOS: [i32; 3] = [14, 13, 12];

/// Beam sensors are active-low.
pub const BEAM_SENSOR_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// Single-colour status LED (active HIGH).
pub const STATUS_LED_GPIO: i32 = 21;

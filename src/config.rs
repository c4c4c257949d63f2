//! System configuration parameters
//!
//! All tunable parameters for the PillBox dispenser. Durations are in
//! milliseconds and must be positive; [`DispenserConfig::validate`] is run
//! once at boot and a failure there halts startup.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on the number of silos a single board can drive.
pub const MAX_SILOS: usize = 8;

/// A blink sequence on the status LED: `count` on/off cycles, each half
/// lasting `interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkPattern {
    pub count: u8,
    pub interval_ms: u32,
}

impl BlinkPattern {
    pub const fn new(count: u8, interval_ms: u32) -> Self {
        Self { count, interval_ms }
    }
}

/// Core dispenser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenserConfig {
    // --- Hardware ---
    /// Number of silos (motor + beam sensor pairs) fitted.
    pub silo_count: u8,

    // --- Dispense cycle ---
    /// Maximum vibration time per pill before giving up.
    pub pill_timeout_ms: u32,
    /// Beam sensor sampling interval while vibrating.
    pub sensor_poll_ms: u32,
    /// Pause after a detected pill before the next one is released.
    pub pill_settle_ms: u32,

    // --- Feedback ---
    /// LED pulse after every detected pill.
    pub pill_blink_ms: u32,
    /// Haptic pulse on all silos before a schedule starts dispensing.
    pub start_pulse_ms: u32,
    /// Per-motor pulse during the boot self-test.
    pub self_test_pulse_ms: u32,
    /// Gap between motors during the boot self-test.
    pub self_test_gap_ms: u32,
    pub success_blink: BlinkPattern,
    pub failure_blink: BlinkPattern,
    /// Shown when a whole poll cycle errors out.
    pub error_blink: BlinkPattern,

    // --- Polling ---
    /// Delay between due-medication checks.
    pub poll_interval_ms: u32,
    /// Window passed to the backend's `dueNow` query.
    pub due_window_minutes: u32,
}

impl Default for DispenserConfig {
    fn default() -> Self {
        Self {
            silo_count: 3,

            pill_timeout_ms: 10_000,
            sensor_poll_ms: 50,
            pill_settle_ms: 300,

            pill_blink_ms: 100,
            start_pulse_ms: 500,
            self_test_pulse_ms: 200,
            self_test_gap_ms: 100,
            success_blink: BlinkPattern::new(3, 200),
            failure_blink: BlinkPattern::new(6, 100),
            error_blink: BlinkPattern::new(5, 100),

            poll_interval_ms: 60_000, // 1/min
            due_window_minutes: 1,
        }
    }
}

impl DispenserConfig {
    /// Reject values the sequencer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.silo_count == 0 {
            return Err(Error::Config("silo_count must be at least 1"));
        }
        if self.silo_count as usize > MAX_SILOS {
            return Err(Error::Config("silo_count exceeds MAX_SILOS"));
        }

        let durations = [
            (self.pill_timeout_ms, "pill_timeout_ms must be positive"),
            (self.sensor_poll_ms, "sensor_poll_ms must be positive"),
            (self.pill_settle_ms, "pill_settle_ms must be positive"),
            (self.pill_blink_ms, "pill_blink_ms must be positive"),
            (self.start_pulse_ms, "start_pulse_ms must be positive"),
            (self.self_test_pulse_ms, "self_test_pulse_ms must be positive"),
            (self.self_test_gap_ms, "self_test_gap_ms must be positive"),
            (self.poll_interval_ms, "poll_interval_ms must be positive"),
            (self.due_window_minutes, "due_window_minutes must be positive"),
        ];
        if let Some(&(_, msg)) = durations.iter().find(|(v, _)| *v == 0) {
            return Err(Error::Config(msg));
        }

        for pattern in [self.success_blink, self.failure_blink, self.error_blink] {
            if pattern.count == 0 || pattern.interval_ms == 0 {
                return Err(Error::Config("blink patterns need a count and interval"));
            }
        }

        if self.sensor_poll_ms > self.pill_timeout_ms {
            return Err(Error::Config("sensor_poll_ms must not exceed pill_timeout_ms"));
        }
        Ok(())
    }

    pub fn silo_count(&self) -> usize {
        self.silo_count as usize
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// WiFi credentials and backend location.
///
/// Baked in at build time from the `PILLBOX_*` environment variables.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// GraphQL endpoint, e.g. `http://10.0.0.5:8081/query`.
    pub backend_url: String,
    pub patient_id: String,
    pub wifi_timeout_secs: u32,
    pub http_timeout_ms: u32,
}

impl NetworkConfig {
    pub fn from_build_env() -> Result<Self> {
        Self::from_parts(
            option_env!("PILLBOX_WIFI_SSID").unwrap_or(""),
            option_env!("PILLBOX_WIFI_PASSWORD").unwrap_or(""),
            option_env!("PILLBOX_BACKEND_URL").unwrap_or("http://192.168.4.1:8081/query"),
            option_env!("PILLBOX_PATIENT_ID").unwrap_or(""),
        )
    }

    pub fn from_parts(ssid: &str, password: &str, backend_url: &str, patient_id: &str) -> Result<Self> {
        let mut wifi_ssid = heapless::String::new();
        wifi_ssid
            .push_str(ssid)
            .map_err(|_| Error::Config("WiFi SSID longer than 32 bytes"))?;
        let mut wifi_password = heapless::String::new();
        wifi_password
            .push_str(password)
            .map_err(|_| Error::Config("WiFi password longer than 64 bytes"))?;
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(Error::Config("backend URL must be http(s)"));
        }

        Ok(Self {
            wifi_ssid,
            wifi_password,
            backend_url: backend_url.to_owned(),
            patient_id: patient_id.to_owned(),
            wifi_timeout_secs: 30,
            http_timeout_ms: 10_000,
        })
    }
}

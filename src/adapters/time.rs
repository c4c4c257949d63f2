//! System clock adapter.
//!
//! Implements [`Clock`] for the dispense core.
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`;
//!   wall-clock time from the SNTP-synced system clock.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and `SystemTime`
//!   for host-side runs.
//!
//! Sleeping is `std::thread::sleep` on both targets; on ESP-IDF it yields to
//! FreeRTOS.

use std::time::Duration;

use crate::app::ports::Clock;

/// Reject obviously unsynced wall-clock values (before 2020-01-01).
pub const EPOCH_2020: i64 = 1_577_836_800;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// `true` once SNTP (or the host OS) has set a plausible wall clock.
    pub fn is_synced(&self) -> bool {
        self.unix_secs() >= EPOCH_2020
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        // SAFETY: read-only query of the high-resolution timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    fn unix_secs(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

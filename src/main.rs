//! PillBox Firmware: Main Entry Point
//!
//! Hexagonal architecture with a blocking poll loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink   SystemClock   WifiAdapter │
//! │  (Silo+StatusLight)   (EventSink)    (Clock)       (Connect.)  │
//! │  GraphqlBackend<EspHttpTransport>  (DueSource + ReportSink)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            DispenseService (pure logic)                │    │
//! │  │  schedule · silo sequencer · pill cycle · MotorGuard   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::time::{Duration, Instant};

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::{EspSntp, SyncStatus};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, info, warn};

use pillbox::adapters::graphql::GraphqlBackend;
use pillbox::adapters::hardware::HardwareAdapter;
use pillbox::adapters::http::EspHttpTransport;
use pillbox::adapters::log_sink::LogEventSink;
use pillbox::adapters::time::SystemClock;
use pillbox::adapters::wifi::{ConnectivityPort, WifiAdapter};
use pillbox::app::feedback;
use pillbox::app::ports::{Clock, StatusLight};
use pillbox::app::service::DispenseService;
use pillbox::config::{BlinkPattern, DispenserConfig, NetworkConfig};
use pillbox::drivers::gate::{Gate, GateBank};
use pillbox::drivers::status_led::StatusLed;
use pillbox::error::Error;
use pillbox::pins;

type MotorPin = PinDriver<'static, AnyOutputPin, Output>;
type BeamPin = PinDriver<'static, AnyIOPin, Input>;
type Hardware = HardwareAdapter<MotorPin, BeamPin, MotorPin>;

/// Shown while WiFi association keeps failing at boot.
const WIFI_RETRY_BLINK: BlinkPattern = BlinkPattern::new(10, 100);
const WIFI_RETRY_DELAY_MS: u32 = 10_000;
/// Shown when the backend does not answer the boot ping.
const BACKEND_UNREACHABLE_BLINK: BlinkPattern = BlinkPattern::new(5, 200);
const SNTP_WAIT_SECS: u64 = 15;

// ── Hardware construction ─────────────────────────────────────

fn build_hardware(config: &DispenserConfig) -> Result<Hardware> {
    if config.silo_count() > pins::VIBRATION_MOTOR_GPIOS.len() {
        return Err(Error::Config("silo_count exceeds the wired motor pins").into());
    }

    let mut gates = GateBank::new();
    for silo in 0..config.silo_count() {
        // SAFETY: each GPIO number in `pins` is claimed exactly once, here.
        let motor = PinDriver::output(unsafe { AnyOutputPin::new(pins::VIBRATION_MOTOR_GPIOS[silo]) })?;
        let mut beam = PinDriver::input(unsafe { AnyIOPin::new(pins::BEAM_SENSOR_GPIOS[silo]) })?;
        beam.set_pull(Pull::Up)?;
        if gates
            .push(Gate::new(motor, beam, pins::BEAM_SENSOR_ACTIVE_LOW))
            .is_err()
        {
            return Err(Error::Init("more silos configured than the gate bank holds").into());
        }
    }

    // SAFETY: as above.
    let led = PinDriver::output(unsafe { AnyOutputPin::new(pins::STATUS_LED_GPIO) })?;
    Ok(HardwareAdapter::new(gates, StatusLed::new(led)))
}

fn wait_for_sntp(sntp: &EspSntp<'_>) {
    let started = Instant::now();
    while sntp.get_sync_status() != SyncStatus::Completed {
        if started.elapsed() > Duration::from_secs(SNTP_WAIT_SECS) {
            warn!("SNTP: no sync after {}s; timestamps may be wrong until it completes", SNTP_WAIT_SECS);
            return;
        }
        std::thread::sleep(Duration::from_millis(250));
    }
    info!("SNTP: clock synchronised");
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PillBox v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = DispenserConfig::default();
    config.validate()?;
    let net = NetworkConfig::from_build_env()?;

    // ── 3. Hardware to a safe state ───────────────────────────
    let mut hw = build_hardware(&config)?;
    let mut clock = SystemClock::new();
    let mut sink = LogEventSink::new();
    let mut service = DispenseService::new(config);
    service.init_hardware(&mut hw);

    // ── 4. WiFi ───────────────────────────────────────────────
    info!("[1/3] Connecting to WiFi");
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?, &net).map_err(Error::from)?;

    while let Err(e) = wifi.connect() {
        error!("WiFi: {}; retrying in {}s", e, WIFI_RETRY_DELAY_MS / 1_000);
        feedback::blink(&mut hw, &mut clock, WIFI_RETRY_BLINK);
        clock.sleep_ms(WIFI_RETRY_DELAY_MS);
    }
    hw.set_light(true);

    let sntp = EspSntp::new_default()?;
    wait_for_sntp(&sntp);

    // ── 5. Backend ────────────────────────────────────────────
    info!("[2/3] Testing backend connection");
    let transport = EspHttpTransport::new(net.http_timeout_ms).map_err(Error::from)?;
    let mut backend = GraphqlBackend::new(transport, &net, service.config().due_window_minutes);
    match backend.ping() {
        Ok(()) => info!("backend OK"),
        Err(e) => {
            warn!("backend unreachable: {}", e);
            feedback::blink(&mut hw, &mut clock, BACKEND_UNREACHABLE_BLINK);
        }
    }

    // ── 6. Self-test ──────────────────────────────────────────
    info!("[3/3] Hardware check");
    service.self_test(&mut hw, &mut clock);

    // ── 7. Poll loop ──────────────────────────────────────────
    let poll_ms = service.config().poll_interval_ms;
    info!("Entering main loop (polling every {}s)", poll_ms / 1_000);

    loop {
        if !clock.is_synced() {
            warn!("wall clock not set yet; report timestamps will be wrong");
        }
        let cycle = wifi
            .ensure_connected()
            .and_then(|()| service.run_poll_cycle(&mut backend, &mut hw, &mut clock, &mut sink));

        match cycle {
            Ok(verdicts) if !verdicts.is_empty() => {
                let stats = service.stats();
                info!(
                    "cycle done: {} schedule(s) | totals: {} taken, {} failed, {} unreported",
                    verdicts.len(),
                    stats.taken,
                    stats.failed,
                    stats.reports_failed
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!("poll cycle failed: {}", e);
                service.signal_error(&mut hw, &mut clock);
            }
        }

        clock.sleep_ms(poll_ms);
    }
}

//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the hexagonal boundary for network
//! connectivity. The poll loop calls
//! [`ensure_connected`](ConnectivityPort::ensure_connected) before every
//! backend round-trip.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via
//!   `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: simulation with scripted failures for tests.

use log::{error, info, warn};

use crate::config::NetworkConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

pub trait ConnectivityPort {
    fn connect(&mut self) -> Result<(), CommsError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;

    /// Reconnect if the link dropped since the last call.
    fn ensure_connected(&mut self) -> Result<(), CommsError> {
        if self.is_connected() {
            return Ok(());
        }
        warn!("WiFi: link lost, reconnecting");
        self.connect()
    }
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// 1-32 printable ASCII bytes.
pub fn validate_ssid(ssid: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CommsError::WifiConnectFailed);
    }
    Ok(())
}

/// Empty for an open network, otherwise 8-64 bytes (WPA2).
pub fn validate_password(password: &str) -> Result<(), CommsError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CommsError::WifiConnectFailed);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    /// Per-attempt association timeout.
    timeout_secs: u32,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: remaining connect attempts that should fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    /// Simulation: whether the simulated AP still has us associated.
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>, net: &NetworkConfig) -> Result<Self, CommsError> {
        validate_ssid(&net.wifi_ssid)?;
        validate_password(&net.wifi_password)?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: net.wifi_ssid.clone(),
            password: net.wifi_password.clone(),
            timeout_secs: net.wifi_timeout_secs,
            wifi,
        })
    }

    /// Host simulation: the first `failures` connect attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated(net: &NetworkConfig, failures: u32) -> Result<Self, CommsError> {
        validate_ssid(&net.wifi_ssid)?;
        validate_password(&net.wifi_password)?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: net.wifi_ssid.clone(),
            password: net.wifi_password.clone(),
            timeout_secs: net.wifi_timeout_secs,
            sim_failures: failures,
            sim_link_up: false,
        })
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }

    /// Simulation: the AP dropped us.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim_link_up = false;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiConnectFailed)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiConnectFailed)?,
            auth_method,
            ..Default::default()
        });

        let step = |r: Result<(), esp_idf_svc::sys::EspError>, what: &str| {
            r.map_err(|e| {
                error!("WiFi: {} failed: {}", what, e);
                CommsError::WifiConnectFailed
            })
        };

        step(self.wifi.set_configuration(&config), "configure")?;
        if !self.wifi.is_started().unwrap_or(false) {
            step(self.wifi.start(), "start")?;
        }
        step(self.wifi.wifi_mut().connect(), "connect")?;

        let started = std::time::Instant::now();
        while !self.wifi.is_connected().unwrap_or(false) {
            if started.elapsed().as_secs() >= u64::from(self.timeout_secs) {
                warn!("WiFi: no association after {}s", self.timeout_secs);
                return Err(CommsError::WifiConnectFailed);
            }
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
        step(self.wifi.wait_netif_up(), "DHCP")?;

        if let Ok(ip) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: address {}", ip.ip);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!("WiFi(sim): simulated association failure");
            return Err(CommsError::WifiConnectFailed);
        }
        self.sim_link_up = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect failed: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim_link_up = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), CommsError> {
        if self.is_connected() {
            return Ok(());
        }

        let security = if self.password.is_empty() { "open" } else { "WPA2" };
        info!("WiFi: connecting to '{}' ({})", self.ssid, security);
        self.state = WifiState::Connecting;

        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Failed;
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

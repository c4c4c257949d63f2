//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to               |
//! |-------------|-----------------------|---------------------------|
//! | `hardware`  | SiloPort, StatusLight | Gate bank + status LED    |
//! | `log_sink`  | EventSink             | Serial log output         |
//! | `time`      | Clock                 | ESP32 system timer / SNTP |
//! | `graphql`   | DueSource, ReportSink | PillBox GraphQL backend   |
//! | `http`      | HttpTransport         | ESP-IDF HTTP client       |
//! | `wifi`      | ConnectivityPort      | ESP-IDF WiFi STA          |

pub mod graphql;
pub mod hardware;
#[cfg(target_os = "espidf")]
pub mod http;
pub mod log_sink;
pub mod time;
pub mod wifi;

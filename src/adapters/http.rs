//! ESP-IDF HTTP client transport.
//!
//! Implements [`HttpTransport`] with `EspHttpConnection`. One connection is
//! kept open and reused across requests; HTTPS endpoints are verified
//! against the ESP-IDF certificate bundle.

use core::time::Duration;

use esp_idf_svc::http::Method;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use log::warn;

use crate::error::CommsError;

use super::graphql::{HttpResponse, HttpTransport};

/// Upper bound on a response body; the due list is small.
const MAX_BODY: usize = 16 * 1024;

pub struct EspHttpTransport {
    conn: EspHttpConnection,
}

impl EspHttpTransport {
    pub fn new(timeout_ms: u32) -> Result<Self, CommsError> {
        let config = Configuration {
            timeout: Some(Duration::from_millis(u64::from(timeout_ms))),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let conn = EspHttpConnection::new(&config).map_err(|e| {
            warn!("HTTP: client init failed: {}", e);
            CommsError::HttpRequestFailed
        })?;
        Ok(Self { conn })
    }
}

fn failed(what: &str, e: impl core::fmt::Display) -> CommsError {
    warn!("HTTP: {} failed: {}", what, e);
    CommsError::HttpRequestFailed
}

impl HttpTransport for EspHttpTransport {
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, CommsError> {
        let len = body.len().to_string();
        let headers = [
            ("Content-Type", "application/json"),
            ("Content-Length", len.as_str()),
        ];

        self.conn
            .initiate_request(Method::Post, url, &headers)
            .map_err(|e| failed("request", e))?;

        let mut written = 0;
        while written < body.len() {
            let n = self.conn.write(&body[written..]).map_err(|e| failed("write", e))?;
            if n == 0 {
                return Err(CommsError::HttpRequestFailed);
            }
            written += n;
        }

        self.conn.initiate_response().map_err(|e| failed("response", e))?;
        let status = self.conn.status();

        let mut out = Vec::new();
        let mut buf = [0_u8; 512];
        loop {
            let n = self.conn.read(&mut buf).map_err(|e| failed("read", e))?;
            if n == 0 {
                break;
            }
            if out.len() + n > MAX_BODY {
                warn!("HTTP: response exceeds {} bytes", MAX_BODY);
                return Err(CommsError::MalformedResponse);
            }
            out.extend_from_slice(&buf[..n]);
        }

        Ok(HttpResponse { status, body: out })
    }
}

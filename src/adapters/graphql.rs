//! GraphQL backend adapter.
//!
//! Implements [`DueSource`] and [`ReportSink`] against the PillBox backend.
//! Requests go out as `{"query": ..., "variables": ...}` JSON over an
//! [`HttpTransport`]; responses are checked for HTTP status, a GraphQL
//! `errors` array and a missing `data` object, in that order.
//!
//! The backend's nested due-list shape
//!
//! ```text
//! { schedule { id title } dueAtISO medications { medication { id name } qty siloSlot } }
//! ```
//!
//! is flattened into [`DueEntry`] here so the core never sees it.

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::app::ports::{DueSource, ReportSink};
use crate::app::schedule::{DispenseReport, DueEntry, MedicationRequest, ScheduleStatus, unknown_name};
use crate::config::NetworkConfig;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Documents
// ───────────────────────────────────────────────────────────────

pub const DUE_NOW_QUERY: &str = "\
query DueNow($patientId: ID!, $windowMinutes: Int) {
  dueNow(patientId: $patientId, windowMinutes: $windowMinutes) {
    schedule { id title lockoutMinutes }
    dueAtISO
    medications { medication { id name } qty siloSlot }
  }
}";

pub const RECORD_DISPENSE_MUTATION: &str = "\
mutation RecordDispense($input: DispenseActionInput!) {
  recordDispenseAction(input: $input) { id status }
}";

pub const PING_QUERY: &str = "query { ping }";

/// Value of `actionSource` on every report this firmware sends.
pub const ACTION_SOURCE: &str = "device";

// ───────────────────────────────────────────────────────────────
// Transport port
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Blocking HTTP POST of a JSON body.
pub trait HttpTransport {
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Wire types
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Request<'a, V> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<V>,
}

#[derive(Deserialize)]
struct Response<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize)]
struct GraphqlError {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DueNowVars<'a> {
    patient_id: &'a str,
    window_minutes: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DueNowData {
    /// Kept raw so one malformed entry cannot sink the whole list.
    #[serde(default)]
    due_now: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct WireDue {
    schedule: WireSchedule,
    #[serde(rename = "dueAtISO")]
    due_at_iso: String,
    #[serde(default)]
    medications: Option<Vec<WireMedication>>,
}

#[derive(Deserialize)]
struct WireSchedule {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMedication {
    #[serde(default)]
    medication: Option<WireMedicationRef>,
    #[serde(default)]
    qty: Option<i64>,
    #[serde(default)]
    silo_slot: Option<i64>,
}

#[derive(Deserialize)]
struct WireMedicationRef {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
struct RecordVars<'a> {
    input: DispenseActionInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DispenseActionInput<'a> {
    patient_id: &'a str,
    schedule_id: &'a str,
    #[serde(rename = "dueAtISO")]
    due_at_iso: &'a str,
    #[serde(rename = "actedAtISO")]
    acted_at_iso: &'a str,
    status: ScheduleStatus,
    action_source: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordData {
    record_dispense_action: Option<RecordedAction>,
}

#[derive(Deserialize)]
struct RecordedAction {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct PingData {
    #[serde(default)]
    ping: Option<serde_json::Value>,
}

impl From<WireMedication> for MedicationRequest {
    fn from(w: WireMedication) -> Self {
        let (id, name) = match w.medication {
            Some(m) => (m.id.unwrap_or_default(), m.name),
            None => (String::new(), None),
        };
        let slot = w.silo_slot.unwrap_or(0);
        let qty = w.qty.unwrap_or(1);
        let mut req = MedicationRequest::new(
            &id,
            slot.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
            qty.clamp(0, i64::from(u32::MAX)) as u32,
        );
        if let Some(name) = name {
            req.name = name;
        }
        req
    }
}

impl From<WireDue> for DueEntry {
    fn from(w: WireDue) -> Self {
        Self {
            title: w.schedule.title.unwrap_or_else(unknown_name),
            schedule_id: w.schedule.id,
            due_at_iso: w.due_at_iso,
            medications: w
                .medications
                .unwrap_or_default()
                .into_iter()
                .map(MedicationRequest::from)
                .collect(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Decoding
// ───────────────────────────────────────────────────────────────

/// Decode a GraphQL response body into its `data` payload.
fn decode<D: DeserializeOwned>(body: &[u8]) -> Result<D, CommsError> {
    let resp: Response<D> = serde_json::from_slice(body).map_err(|e| {
        warn!("GraphQL: unparseable response: {}", e);
        CommsError::MalformedResponse
    })?;

    if let Some(errors) = resp.errors.filter(|e| !e.is_empty()) {
        for e in &errors {
            warn!("GraphQL error: {}", e.message);
        }
        return Err(CommsError::GraphqlErrors);
    }
    resp.data.ok_or(CommsError::MalformedResponse)
}

/// Parse a `dueNow` response body into due entries.
///
/// A `null` due list is an empty one. Entries that do not match the wire
/// shape are logged and skipped; the rest are kept.
pub fn parse_due_now(body: &[u8]) -> Result<Vec<DueEntry>, CommsError> {
    let data: DueNowData = decode(body)?;
    Ok(data
        .due_now
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(i, raw)| match serde_json::from_value::<WireDue>(raw) {
            Ok(w) => Some(DueEntry::from(w)),
            Err(e) => {
                warn!("GraphQL: skipping due entry {}: {}", i, e);
                None
            }
        })
        .collect())
}

/// POST one GraphQL document; anything but HTTP 200 is an error.
fn post<T: HttpTransport, V: Serialize>(
    transport: &mut T,
    url: &str,
    query: &str,
    variables: Option<V>,
) -> Result<Vec<u8>, CommsError> {
    let body = serde_json::to_vec(&Request { query, variables }).map_err(|_| CommsError::MalformedResponse)?;
    let resp = transport.post_json(url, &body)?;
    if resp.status != 200 {
        warn!("GraphQL: HTTP {}", resp.status);
        return Err(CommsError::HttpStatus(resp.status));
    }
    Ok(resp.body)
}

// ───────────────────────────────────────────────────────────────
// Backend client
// ───────────────────────────────────────────────────────────────

pub struct GraphqlBackend<T> {
    transport: T,
    url: String,
    patient_id: String,
    window_minutes: u32,
}

impl<T: HttpTransport> GraphqlBackend<T> {
    pub fn new(transport: T, net: &NetworkConfig, window_minutes: u32) -> Self {
        Self {
            transport,
            url: net.backend_url.clone(),
            patient_id: net.patient_id.clone(),
            window_minutes,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Check that the backend answers at all.
    pub fn ping(&mut self) -> Result<(), CommsError> {
        let body = post::<_, ()>(&mut self.transport, &self.url, PING_QUERY, None)?;
        let data: PingData = decode(&body)?;
        debug!("GraphQL: ping -> {:?}", data.ping);
        Ok(())
    }
}

impl<T: HttpTransport> DueSource for GraphqlBackend<T> {
    fn due_now(&mut self) -> Result<Vec<DueEntry>, CommsError> {
        let vars = DueNowVars {
            patient_id: &self.patient_id,
            window_minutes: self.window_minutes,
        };
        let body = post(&mut self.transport, &self.url, DUE_NOW_QUERY, Some(vars))?;
        parse_due_now(&body)
    }
}

impl<T: HttpTransport> ReportSink for GraphqlBackend<T> {
    fn record_dispense(&mut self, report: &DispenseReport<'_>) -> Result<(), CommsError> {
        let vars = RecordVars {
            input: DispenseActionInput {
                patient_id: &self.patient_id,
                schedule_id: report.schedule_id,
                due_at_iso: report.due_at_iso,
                acted_at_iso: report.acted_at_iso,
                status: report.status,
                action_source: ACTION_SOURCE,
            },
        };
        let body = post(&mut self.transport, &self.url, RECORD_DISPENSE_MUTATION, Some(vars))?;
        let data: RecordData = decode(&body)?;
        let action = data.record_dispense_action.ok_or(CommsError::MalformedResponse)?;
        info!(
            "recorded dispense {} as {} (action {})",
            report.schedule_id,
            report.status.as_str(),
            action.id.as_deref().unwrap_or("?")
        );
        Ok(())
    }
}

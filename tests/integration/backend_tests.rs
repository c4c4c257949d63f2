//! Integration tests: the GraphQL backend adapter wired into the poll cycle.

use std::collections::VecDeque;

use super::mock_hw::{RecordingSink, SIM_ISO, SimSilo, rig};

use pillbox::adapters::graphql::{GraphqlBackend, HttpResponse, HttpTransport};
use pillbox::app::schedule::ScheduleStatus;
use pillbox::app::service::DispenseService;
use pillbox::config::{DispenserConfig, NetworkConfig};
use pillbox::error::CommsError;

/// Scripted HTTP server: answers requests in order and keeps their bodies.
#[derive(Default)]
struct ScriptedHttp {
    replies: VecDeque<Result<HttpResponse, CommsError>>,
    requests: Vec<serde_json::Value>,
}

impl ScriptedHttp {
    fn reply(mut self, status: u16, body: &str) -> Self {
        self.replies.push_back(Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
        self
    }

    fn fail(mut self, e: CommsError) -> Self {
        self.replies.push_back(Err(e));
        self
    }
}

impl HttpTransport for ScriptedHttp {
    fn post_json(&mut self, _url: &str, body: &[u8]) -> Result<HttpResponse, CommsError> {
        self.requests.push(serde_json::from_slice(body).expect("request is JSON"));
        self.replies
            .pop_front()
            .unwrap_or(Err(CommsError::HttpRequestFailed))
    }
}

fn backend(http: ScriptedHttp) -> GraphqlBackend<ScriptedHttp> {
    let net = NetworkConfig::from_parts("PillNet", "password1", "http://10.0.0.2:8081/query", "patient-42")
        .expect("valid network config");
    GraphqlBackend::new(http, &net, 1)
}

const DUE_TWO: &str = r#"{"data":{"dueNow":[
    {"schedule":{"id":"morning","title":"Morning"},"dueAtISO":"2026-10-03T04:00:00Z",
     "medications":[{"medication":{"id":"m1","name":"Aspirin"},"qty":2,"siloSlot":0}]},
    {"schedule":{"id":"vitamins","title":"Vitamins"},"dueAtISO":"2026-10-03T04:00:00Z",
     "medications":[{"medication":{"id":"m2","name":"Zinc"},"qty":1,"siloSlot":1}]}
]}}"#;

const RECORDED: &str = r#"{"data":{"recordDispenseAction":{"id":"act-1","status":"TAKEN"}}}"#;

#[test]
fn poll_cycle_round_trip_through_graphql() {
    let http = ScriptedHttp::default()
        .reply(200, DUE_TWO)
        .reply(200, RECORDED)
        .reply(200, RECORDED);
    let mut backend = backend(http);
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(5, 0), SimSilo::empty(), SimSilo::empty()]);
    let mut sink = RecordingSink::default();
    let mut svc = DispenseService::new(DispenserConfig::default());

    let verdicts = svc
        .run_poll_cycle(&mut backend, &mut hw, &mut clock, &mut sink)
        .unwrap();

    assert_eq!(verdicts[0].status(), ScheduleStatus::Taken);
    assert_eq!(verdicts[1].status(), ScheduleStatus::Failed);

    let requests = &backend.transport().requests;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0]["variables"]["patientId"], "patient-42");

    let first = &requests[1]["variables"]["input"];
    assert_eq!(first["scheduleId"], "morning");
    assert_eq!(first["status"], "TAKEN");
    assert_eq!(first["actedAtISO"], SIM_ISO);
    assert_eq!(first["actionSource"], "device");

    let second = &requests[2]["variables"]["input"];
    assert_eq!(second["scheduleId"], "vitamins");
    assert_eq!(second["status"], "FAILED");
}

#[test]
fn graphql_error_on_report_is_not_retried() {
    let http = ScriptedHttp::default()
        .reply(200, DUE_TWO)
        .reply(200, r#"{"errors":[{"message":"duplicate action"}]}"#)
        .reply(200, RECORDED);
    let mut backend = backend(http);
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(5, 0); 3]);
    let mut sink = RecordingSink::default();
    let mut svc = DispenseService::new(DispenserConfig::default());

    let verdicts = svc
        .run_poll_cycle(&mut backend, &mut hw, &mut clock, &mut sink)
        .unwrap();

    assert_eq!(verdicts.len(), 2);
    assert_eq!(backend.transport().requests.len(), 3, "one fetch, one report per entry");
    assert_eq!(svc.stats().reports_failed, 1);
}

#[test]
fn unreachable_backend_fails_the_cycle_before_any_motor_runs() {
    let mut backend = backend(ScriptedHttp::default().fail(CommsError::HttpRequestFailed));
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(5, 0); 3]);
    let mut sink = RecordingSink::default();
    let mut svc = DispenseService::new(DispenserConfig::default());

    let result = svc.run_poll_cycle(&mut backend, &mut hw, &mut clock, &mut sink);

    assert_eq!(result, Err(CommsError::HttpRequestFailed));
    assert_eq!(hw.activations_of(0), 0);
}

#[test]
fn ping_checks_status() {
    let mut ok = backend(ScriptedHttp::default().reply(200, r#"{"data":{"ping":"pong"}}"#));
    assert_eq!(ok.ping(), Ok(()));

    let mut down = backend(ScriptedHttp::default().reply(503, ""));
    assert_eq!(down.ping(), Err(CommsError::HttpStatus(503)));
}

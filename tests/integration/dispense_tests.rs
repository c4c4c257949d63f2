//! Integration tests: DispenseService driving a simulated dispenser.

use super::mock_hw::{HwCall, MockBackend, RecordingSink, SIM_ISO, SimSilo, rig};

use pillbox::app::events::DispenseEvent;
use pillbox::app::schedule::{DueEntry, MedicationRequest, ScheduleStatus, SiloResult};
use pillbox::app::service::DispenseService;
use pillbox::config::DispenserConfig;
use pillbox::error::{CommsError, GateError};

fn entry(id: &str, meds: &[(i32, u32)]) -> DueEntry {
    DueEntry {
        schedule_id: id.into(),
        title: format!("Schedule {id}"),
        due_at_iso: "2026-10-03T03:59:30Z".into(),
        medications: meds
            .iter()
            .map(|&(slot, qty)| MedicationRequest::new("med", slot, qty))
            .collect(),
    }
}

fn service() -> DispenseService {
    DispenseService::new(DispenserConfig::default())
}

// ── Reference scenarios ───────────────────────────────────────

#[test]
fn all_pills_detected_is_taken() {
    let (mut hw, mut clock) = rig(vec![
        SimSilo::stocked(10, 200),
        SimSilo::stocked(10, 200),
        SimSilo::stocked(10, 200),
    ]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    let v = service().dispense_schedule(
        &entry("s1", &[(0, 2), (1, 1)]),
        &mut hw,
        &mut clock,
        &mut backend,
        &mut sink,
    );

    assert_eq!(v.status(), ScheduleStatus::Taken);
    assert_eq!(
        v.silo_results(),
        &[SiloResult::new(0, 2, 2), SiloResult::new(1, 1, 1)]
    );
    assert_eq!(backend.reports.len(), 1);
    assert_eq!(backend.reports[0].status, ScheduleStatus::Taken);
    assert_eq!(backend.reports[0].acted_at_iso, SIM_ISO);
    assert_eq!(backend.reports[0].due_at_iso, "2026-10-03T03:59:30Z");
    assert!(!hw.any_motor_on());
}

#[test]
fn one_empty_silo_fails_the_entry() {
    let (mut hw, mut clock) = rig(vec![
        SimSilo::stocked(10, 0),
        SimSilo::empty(),
        SimSilo::stocked(10, 0),
    ]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    let v = service().dispense_schedule(
        &entry("s2", &[(0, 2), (1, 1)]),
        &mut hw,
        &mut clock,
        &mut backend,
        &mut sink,
    );

    assert_eq!(v.status(), ScheduleStatus::Failed);
    assert_eq!(v.silo_results()[0], SiloResult::new(0, 2, 2));
    assert_eq!(v.silo_results()[1], SiloResult::new(1, 1, 0));
    assert!(!v.silo_results()[1].success());
    assert_eq!(backend.statuses(), vec![("s2", ScheduleStatus::Failed)]);
    assert_eq!(
        sink.count(|e| matches!(e, DispenseEvent::PillTimedOut { silo: 1, .. })),
        1
    );
    assert!(!hw.any_motor_on());
}

#[test]
fn empty_medication_list_is_taken_with_timestamp() {
    let (mut hw, mut clock) = rig(vec![SimSilo::empty(); 3]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    let v = service().dispense_schedule(&entry("s3", &[]), &mut hw, &mut clock, &mut backend, &mut sink);

    assert_eq!(v.status(), ScheduleStatus::Taken);
    assert!(v.silo_results().is_empty());
    assert_eq!(v.acted_at_iso(), SIM_ISO);
    assert_eq!(backend.statuses(), vec![("s3", ScheduleStatus::Taken)]);
}

#[test]
fn pill_exactly_at_timeout_is_not_counted() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(5, 10_000)]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    let v = service().dispense_schedule(&entry("s4", &[(0, 1)]), &mut hw, &mut clock, &mut backend, &mut sink);

    assert_eq!(v.silo_results(), &[SiloResult::new(0, 1, 0)]);
    assert_eq!(v.status(), ScheduleStatus::Failed);
    assert_eq!(hw.silos[0].stock, 5);
}

#[test]
fn pill_one_poll_before_timeout_is_counted() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(5, 9_950)]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    let v = service().dispense_schedule(&entry("s5", &[(0, 1)]), &mut hw, &mut clock, &mut backend, &mut sink);

    assert_eq!(v.status(), ScheduleStatus::Taken);
}

// ── Sequencer behaviour ───────────────────────────────────────

#[test]
fn timeout_does_not_stop_remaining_pills() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(1, 0)]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    let v = service().dispense_schedule(&entry("s6", &[(0, 3)]), &mut hw, &mut clock, &mut backend, &mut sink);

    assert_eq!(v.silo_results(), &[SiloResult::new(0, 3, 1)]);
    // One activation for the start pulse, then one per requested pill.
    assert_eq!(hw.activations_of(0), 1 + 3);
    assert_eq!(
        sink.count(|e| matches!(e, DispenseEvent::PillTimedOut { .. })),
        2
    );
}

#[test]
fn settle_delay_only_between_detected_pills() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(5, 0)]);
    let time = clock.0.clone();
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();
    let config = DispenserConfig::default();

    service().dispense_schedule(&entry("s7", &[(0, 2)]), &mut hw, &mut clock, &mut backend, &mut sink);

    let success = config.success_blink;
    let expected = u64::from(config.start_pulse_ms)
        + 2 * u64::from(config.pill_blink_ms)
        + u64::from(config.pill_settle_ms)
        + u64::from(success.count) * 2 * u64::from(success.interval_ms);
    assert_eq!(time.get(), expected);
}

#[test]
fn invalid_silo_is_rejected_without_touching_other_motors() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(5, 0); 3]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    let v = service().dispense_schedule(
        &entry("s8", &[(7, 2), (-1, 1), (2, 1)]),
        &mut hw,
        &mut clock,
        &mut backend,
        &mut sink,
    );

    assert_eq!(v.status(), ScheduleStatus::Failed);
    assert_eq!(v.silo_results()[0], SiloResult::rejected(7, 2));
    assert_eq!(v.silo_results()[1], SiloResult::rejected(-1, 1));
    assert_eq!(v.silo_results()[2], SiloResult::new(2, 1, 1));
    // Start pulse only; no dispensing attempt on silos 0 and 1.
    assert_eq!(hw.activations_of(0), 1);
    assert_eq!(hw.activations_of(1), 1);
    assert_eq!(
        sink.count(|e| matches!(e, DispenseEvent::SiloRejected { silo_count: 3, .. })),
        2
    );
}

#[test]
fn only_one_motor_runs_while_dispensing() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(10, 120); 3]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    service().dispense_schedule(
        &entry("s9", &[(0, 2), (2, 3), (1, 1)]),
        &mut hw,
        &mut clock,
        &mut backend,
        &mut sink,
    );

    let activations: Vec<usize> = hw
        .calls
        .iter()
        .filter_map(|c| match c {
            HwCall::Activate { others_on, .. } => Some(*others_on),
            _ => None,
        })
        .collect();
    // The first three are the simultaneous start pulse.
    assert_eq!(&activations[..3], &[0, 1, 2]);
    assert!(activations[3..].iter().all(|&others| others == 0));
}

// ── Fault handling ────────────────────────────────────────────

#[test]
fn gate_fault_aborts_entry_and_next_entry_still_runs() {
    let mut silos = vec![SimSilo::stocked(10, 0); 3];
    silos[1].broken = true;
    let (mut hw, mut clock) = rig(silos);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();
    let mut svc = service();

    let verdicts = svc.process_due(
        &[entry("bad", &[(1, 2), (0, 1)]), entry("good", &[(0, 1)])],
        &mut hw,
        &mut clock,
        &mut backend,
        &mut sink,
    );

    assert_eq!(verdicts[0].status(), ScheduleStatus::Failed);
    assert_eq!(verdicts[0].silo_results(), &[SiloResult::new(1, 2, 0)]);
    assert_eq!(verdicts[1].status(), ScheduleStatus::Taken);
    assert_eq!(
        backend.statuses(),
        vec![("bad", ScheduleStatus::Failed), ("good", ScheduleStatus::Taken)]
    );
    assert!(sink.events.contains(&DispenseEvent::HardwareFault {
        silo_slot: 1,
        error: GateError::MotorWrite { silo: 1 },
    }));
    assert!(!hw.any_motor_on());
    assert_eq!(svc.stats().failed, 1);
    assert_eq!(svc.stats().taken, 1);
}

#[test]
fn pill_detected_before_a_failed_stop_is_still_counted() {
    let mut silos = vec![SimSilo::stocked(10, 0); 3];
    silos[2].stuck_on = true;
    let (mut hw, mut clock) = rig(silos);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();
    let mut svc = service();

    let verdicts = svc.process_due(&[entry("jam", &[(2, 3)])], &mut hw, &mut clock, &mut backend, &mut sink);

    assert_eq!(verdicts[0].status(), ScheduleStatus::Failed);
    assert_eq!(verdicts[0].silo_results(), &[SiloResult::new(2, 3, 1)]);
    assert_eq!(verdicts[0].silo_results()[0].dispensed(), 1);
    assert_eq!(hw.silos[2].stock, 9);
    assert_eq!(sink.count(|e| matches!(e, DispenseEvent::PillDispensed { silo: 2, .. })), 1);
    assert!(!hw.any_motor_on(), "stop_all halts the stuck motor");
}

#[test]
fn report_failure_does_not_block_next_entry() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(10, 0); 3]);
    let mut backend = MockBackend {
        reject_reports_for: vec!["first".into()],
        ..MockBackend::default()
    };
    let mut sink = RecordingSink::default();
    let mut svc = service();

    let verdicts = svc.process_due(
        &[entry("first", &[(0, 1)]), entry("second", &[(1, 1)])],
        &mut hw,
        &mut clock,
        &mut backend,
        &mut sink,
    );

    assert_eq!(verdicts.len(), 2);
    // Each verdict is reported exactly once, the failed one included.
    assert_eq!(backend.reports.len(), 2);
    assert_eq!(svc.stats().reports_failed, 1);
    assert!(sink.events.contains(&DispenseEvent::ReportFailed {
        schedule_id: "first".into(),
        error: CommsError::HttpStatus(500),
    }));
    assert_eq!(
        sink.count(|e| matches!(e, DispenseEvent::ReportRecorded { .. })),
        1
    );
}

// ── Poll cycle ────────────────────────────────────────────────

#[test]
fn poll_cycle_with_nothing_due_leaves_motors_alone() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(10, 0); 3]);
    let mut backend = MockBackend::default();
    let mut sink = RecordingSink::default();

    let verdicts = service()
        .run_poll_cycle(&mut backend, &mut hw, &mut clock, &mut sink)
        .unwrap();

    assert!(verdicts.is_empty());
    assert_eq!(backend.fetches, 1);
    assert!(backend.reports.is_empty());
    assert_eq!(hw.calls, vec![HwCall::StopAll]);
}

#[test]
fn poll_cycle_fetch_error_is_returned() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(10, 0); 3]);
    let mut backend = MockBackend {
        fetch_error: Some(CommsError::HttpRequestFailed),
        ..MockBackend::default()
    };
    let mut sink = RecordingSink::default();

    let result = service().run_poll_cycle(&mut backend, &mut hw, &mut clock, &mut sink);

    assert_eq!(result, Err(CommsError::HttpRequestFailed));
    assert!(!hw.any_motor_on());
    assert!(sink.events.is_empty());
}

#[test]
fn poll_cycle_dispenses_and_reports_everything_due() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(10, 300); 3]);
    let mut backend = MockBackend::serving(vec![entry("a", &[(0, 1)]), entry("b", &[(2, 2)])]);
    let mut sink = RecordingSink::default();
    let mut svc = service();

    let verdicts = svc
        .run_poll_cycle(&mut backend, &mut hw, &mut clock, &mut sink)
        .unwrap();

    assert_eq!(verdicts.len(), 2);
    assert_eq!(
        backend.statuses(),
        vec![("a", ScheduleStatus::Taken), ("b", ScheduleStatus::Taken)]
    );
    assert_eq!(hw.silos[2].stock, 8);
    assert_eq!(svc.stats().schedules, 2);
}

// ── Self-test ─────────────────────────────────────────────────

#[test]
fn self_test_pulses_each_motor_and_reads_beams() {
    let (mut hw, mut clock) = rig(vec![SimSilo::stocked(10, 0); 3]);

    let beams = service().self_test(&mut hw, &mut clock);

    assert_eq!(beams, vec![false; 3]);
    for silo in 0..3 {
        assert_eq!(hw.activations_of(silo), 1);
    }
    assert!(!hw.any_motor_on());
    assert!(!hw.light);
}

#![allow(clippy::unwrap_used)]
// Watchdog-protected mutation against the in-memory router.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use tikfleet_core::watchdog::IP_SERVICE_PATH;
use tikfleet_core::{
    FieldChange, FleetEvent, LeaseState, MatchKey, MemorySink, MutationBatch, ResourcePath,
    WatchdogOptions, apply_guarded, observe_lease,
};

use common::{FakeRouter, SCHEDULER};

// ── Helpers ─────────────────────────────────────────────────────────

fn lock_down() -> MutationBatch {
    MutationBatch::ip_services([("ssh", "10.0.0.0/8"), ("www", "10.0.0.0/8")]).unwrap()
}

/// Protocol events in order, without the trailing `MutationFinished`.
fn event_names(sink: &MemorySink) -> Vec<&'static str> {
    sink.events()
        .iter()
        .filter_map(|e| match e {
            FleetEvent::LeaseArmed { .. } => Some("armed"),
            FleetEvent::FieldApplied { .. } => Some("applied"),
            FleetEvent::FieldFailed { .. } => Some("failed"),
            FleetEvent::VerifyFailed { .. } => Some("verify_failed"),
            FleetEvent::LeaseDisarmed { .. } => Some("disarmed"),
            FleetEvent::LeaseCleanupFailed { .. } => Some("cleanup_failed"),
            _ => None,
        })
        .collect()
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn verified_apply_disarms_the_lease_and_keeps_the_change() {
    let router = FakeRouter::with_services("core-1");
    let sink = MemorySink::new();

    let outcome = apply_guarded(
        &router,
        "core-1",
        &lock_down(),
        &WatchdogOptions::default(),
        &sink,
    )
    .await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.still_armed_lease, None);
    assert_eq!(outcome.applied.len(), 2);
    let lease = outcome.lease.as_ref().unwrap();
    assert_eq!(lease.state, LeaseState::Disarmed);
    assert!(lease.name.starts_with("rollback_"));

    assert_eq!(
        router.calls(),
        vec![
            format!("read {IP_SERVICE_PATH}"),
            format!("arm {}", lease.name),
            format!("write {IP_SERVICE_PATH} name=ssh address=10.0.0.0/8"),
            format!("write {IP_SERVICE_PATH} name=www address=10.0.0.0/8"),
            "verify".to_owned(),
            format!("disarm {}", lease.name),
        ]
    );
    assert!(router.menu(SCHEDULER).is_empty());
    assert_eq!(
        router.field(IP_SERVICE_PATH, "www", "address").as_deref(),
        Some("10.0.0.0/8")
    );
    assert_eq!(
        event_names(&sink),
        vec!["armed", "applied", "applied", "disarmed"]
    );
}

#[tokio::test(start_paused = true)]
async fn verification_waits_for_the_settle_delay() {
    let router = FakeRouter::with_services("core-1");
    let options = WatchdogOptions {
        settle_delay: Duration::from_secs(7),
        ..WatchdogOptions::default()
    };

    let start = tokio::time::Instant::now();
    let outcome = apply_guarded(&router, "core-1", &lock_down(), &options, &MemorySink::new()).await;

    assert!(outcome.success);
    assert!(start.elapsed() >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn lease_script_restores_captured_values() {
    let router = FakeRouter::with_services("core-1");
    let batch = MutationBatch::ip_services([("www", "10.0.0.0/8"), ("api", "10.0.0.0/8")]).unwrap();

    let outcome = apply_guarded(
        &router,
        "core-1",
        &batch,
        &WatchdogOptions::default(),
        &MemorySink::new(),
    )
    .await;

    let lease = outcome.lease.unwrap();
    assert!(
        lease
            .script
            .contains(r#"/ip service set [find name="www"] address="192.168.88.0/24""#)
    );
    // `api` had no address property; restoring clears it.
    assert!(
        lease
            .script
            .contains(r#"/ip service set [find name="api"] address="""#)
    );
    assert!(lease.script.ends_with(&format!(
        r#"/system scheduler remove [find name="{}"]"#,
        lease.name
    )));
    assert_eq!(outcome.captured.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn unarmed_apply_never_touches_the_scheduler() {
    let router = FakeRouter::with_services("core-1");
    let options = WatchdogOptions {
        arm: false,
        ..WatchdogOptions::default()
    };

    let outcome = apply_guarded(&router, "core-1", &lock_down(), &options, &MemorySink::new()).await;

    assert!(outcome.success);
    assert!(outcome.lease.is_none());
    assert_eq!(router.count("arm"), 0);
    assert_eq!(router.count("disarm"), 0);
}

// ── Failures before any write ───────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn arm_failure_sends_no_writes() {
    let router = FakeRouter::with_services("core-1");
    router.fail_arm();

    let outcome = apply_guarded(
        &router,
        "core-1",
        &lock_down(),
        &WatchdogOptions::default(),
        &MemorySink::new(),
    )
    .await;

    assert!(!outcome.success);
    assert!(outcome.lease.is_none());
    assert_eq!(outcome.still_armed_lease, None);
    assert_eq!(router.count("write"), 0);
    assert_eq!(router.count("verify"), 0);
    assert_eq!(router.field(IP_SERVICE_PATH, "ssh", "address").as_deref(), Some(""));
}

#[tokio::test(start_paused = true)]
async fn missing_record_aborts_during_capture() {
    let router = FakeRouter::with_services("core-1");
    let batch = MutationBatch::ip_services([("ssh", "10.0.0.0/8"), ("telnet", "10.0.0.0/8")]).unwrap();

    let outcome = apply_guarded(
        &router,
        "core-1",
        &batch,
        &WatchdogOptions::default(),
        &MemorySink::new(),
    )
    .await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("name=telnet"));
    assert_eq!(router.calls(), vec![format!("read {IP_SERVICE_PATH}")]);
}

#[tokio::test(start_paused = true)]
async fn empty_batch_makes_no_device_calls() {
    let router = FakeRouter::with_services("core-1");
    let sink = MemorySink::new();

    let outcome = apply_guarded(
        &router,
        "core-1",
        &MutationBatch::new(),
        &WatchdogOptions::default(),
        &sink,
    )
    .await;

    assert!(!outcome.success);
    assert!(router.calls().is_empty());
    assert_eq!(
        sink.events(),
        vec![FleetEvent::MutationFinished {
            device: "core-1".into(),
            success: false,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn unencodable_value_fails_before_arming() {
    let router = FakeRouter::with_services("core-1").with_menu(
        "/snmp/community",
        vec![common::record(&[("name", "public"), ("addresses", "bell\u{7}")])],
    );
    let mut batch = MutationBatch::new();
    batch.push(
        FieldChange::new(
            ResourcePath::new("/snmp/community").unwrap(),
            MatchKey::name("public"),
            "addresses",
            "10.0.0.0/8",
        )
        .unwrap(),
    );

    let outcome = apply_guarded(
        &router,
        "core-1",
        &batch,
        &WatchdogOptions::default(),
        &MemorySink::new(),
    )
    .await;

    assert!(!outcome.success);
    assert_eq!(router.count("arm"), 0);
    assert_eq!(router.count("write"), 0);
}

// ── Failures after writes ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn lockout_leaves_the_lease_armed_and_it_reverts() {
    let router = FakeRouter::with_services("core-1");
    router.lock_out_on("www");
    let sink = MemorySink::new();

    let outcome = apply_guarded(
        &router,
        "core-1",
        &lock_down(),
        &WatchdogOptions::default(),
        &sink,
    )
    .await;

    assert!(!outcome.success);
    let lease = outcome.lease.clone().unwrap();
    assert_eq!(outcome.still_armed_lease.as_deref(), Some(lease.name.as_str()));
    assert_eq!(lease.state, LeaseState::Armed);
    assert_eq!(router.count("disarm"), 0);
    assert_eq!(router.menu(SCHEDULER).len(), 1);
    assert_eq!(
        event_names(&sink),
        vec!["armed", "applied", "applied", "verify_failed"]
    );

    // The router runs the lease on its own, then management comes back.
    router.fire_lease(&lease.name);
    router.restore();

    assert_eq!(observe_lease(&router, &lease).await.unwrap(), LeaseState::Fired);
    assert_eq!(router.field(IP_SERVICE_PATH, "ssh", "address").as_deref(), Some(""));
    assert_eq!(
        router.field(IP_SERVICE_PATH, "www", "address").as_deref(),
        Some("192.168.88.0/24")
    );
    assert!(router.menu(SCHEDULER).is_empty());
}

#[tokio::test(start_paused = true)]
async fn disarm_failure_is_still_a_success() {
    let router = FakeRouter::with_services("core-1");
    router.fail_disarm();
    let sink = MemorySink::new();

    let outcome = apply_guarded(
        &router,
        "core-1",
        &lock_down(),
        &WatchdogOptions::default(),
        &sink,
    )
    .await;

    assert!(outcome.success);
    let lease = outcome.lease.clone().unwrap();
    assert_eq!(lease.state, LeaseState::Armed);
    assert_eq!(outcome.still_armed_lease, Some(lease.name.clone()));
    assert_eq!(event_names(&sink).last(), Some(&"cleanup_failed"));
    assert_eq!(observe_lease(&router, &lease).await.unwrap(), LeaseState::Armed);
}

#[tokio::test(start_paused = true)]
async fn partial_apply_disarms_but_reports_failure() {
    let router = FakeRouter::with_services("core-1");
    router.fail_write("www", "address");

    let outcome = apply_guarded(
        &router,
        "core-1",
        &lock_down(),
        &WatchdogOptions::default(),
        &MemorySink::new(),
    )
    .await;

    assert!(!outcome.success);
    assert_eq!(outcome.still_armed_lease, None);
    assert_eq!(outcome.applied.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].change.key, MatchKey::name("www"));
    assert!(outcome.error.unwrap().contains("name=www"));
    assert_eq!(outcome.lease.unwrap().state, LeaseState::Disarmed);
    assert!(router.menu(SCHEDULER).is_empty());
}

#[tokio::test(start_paused = true)]
async fn disarmed_lease_observes_as_disarmed() {
    let router = FakeRouter::with_services("core-1");

    let outcome = apply_guarded(
        &router,
        "core-1",
        &lock_down(),
        &WatchdogOptions::default(),
        &MemorySink::new(),
    )
    .await;

    let lease = outcome.lease.unwrap();
    assert_eq!(observe_lease(&router, &lease).await.unwrap(), LeaseState::Disarmed);
}

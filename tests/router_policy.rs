use borealis::executor::{CommandExecutor, ExecutorError};
use borealis::intent::IntentResult;
use borealis::registry::parse_source;
use borealis::router::{ConfidenceRouter, Routed, RouteDecision, RoutingThresholds};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::tempdir;

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn intent(id: &str, confidence: f64) -> IntentResult {
    IntentResult {
        intent_id: id.to_string(),
        confidence,
        source_text: "lock the screen".to_string(),
    }
}

fn calibrated_router() -> ConfidenceRouter {
    ConfidenceRouter::new(RoutingThresholds::new(0.4, 0.75).expect("thresholds"))
}

#[test]
fn high_confidence_intent_auto_executes() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("lock-session");
    write_script(&bin, "#!/bin/sh\necho session locked\n");

    let registry =
        parse_source(&format!("LOCK_SCREEN = {}", bin.display())).expect("registry");
    let executor = CommandExecutor::new(registry);

    let routed = calibrated_router()
        .route(&executor, &intent("LOCK_SCREEN", 0.9))
        .expect("routed");
    match routed {
        Routed::Executed(outcome) => {
            assert_eq!(outcome.command_id, "LOCK_SCREEN");
            assert_eq!(outcome.stdout.trim(), "session locked");
        }
        other => panic!("unexpected routing: {other:?}"),
    }
}

#[test]
fn mid_confidence_asks_for_confirmation_without_spawning() {
    let dir = tempdir().expect("tempdir");
    let marker = dir.path().join("marker");
    let bin = dir.path().join("toucher");
    write_script(&bin, &format!("#!/bin/sh\ntouch {}\n", marker.display()));

    let registry =
        parse_source(&format!("LOCK_SCREEN = {}", bin.display())).expect("registry");
    let executor = CommandExecutor::new(registry);

    let routed = calibrated_router()
        .route(&executor, &intent("LOCK_SCREEN", 0.5))
        .expect("routed");
    assert!(matches!(routed, Routed::NeedsConfirmation));
    assert!(!marker.exists());
}

#[test]
fn low_confidence_is_rejected_without_spawning() {
    let dir = tempdir().expect("tempdir");
    let marker = dir.path().join("marker");
    let bin = dir.path().join("toucher");
    write_script(&bin, &format!("#!/bin/sh\ntouch {}\n", marker.display()));

    let registry =
        parse_source(&format!("LOCK_SCREEN = {}", bin.display())).expect("registry");
    let executor = CommandExecutor::new(registry);

    let routed = calibrated_router()
        .route(&executor, &intent("LOCK_SCREEN", 0.2))
        .expect("routed");
    assert!(matches!(routed, Routed::Rejected));
    assert!(!marker.exists());
}

#[test]
fn boundary_confidences_belong_to_the_upper_band() {
    let router = calibrated_router();
    assert_eq!(router.decide(0.4), RouteDecision::Confirm);
    assert_eq!(router.decide(0.75), RouteDecision::Execute);
}

#[test]
fn not_allowed_from_executor_passes_through_on_execute_branch() {
    let registry = parse_source("SAY = echo hi").expect("registry");
    let executor = CommandExecutor::new(registry);

    let err = calibrated_router()
        .route(&executor, &intent("WIPE_DISK", 0.99))
        .expect_err("not allowed");
    match err {
        ExecutorError::NotAllowed { command_id } => assert_eq!(command_id, "WIPE_DISK"),
        other => panic!("unexpected error: {other:?}"),
    }
}

use safe_outputs::ErrorCode;
use safe_outputs::config::FailurePolicy;
use safe_outputs::diagnostics::MemorySink;
use safe_outputs::error::PlatformError;
use safe_outputs::operation::OperationStatus;
use serde_json::json;

use crate::batch::{config, error_codes, run, run_with_sink, statuses};
use crate::fake_platform::FakePlatform;

#[tokio::test]
async fn transient_failure_is_retried_and_recovers() {
    let platform = FakePlatform::new();
    platform.fail_next("create_comment", PlatformError::from_status(502, "Bad Gateway", false, None));
    let sink = MemorySink::new();

    let summary = run_with_sink(
        &config(),
        &platform,
        &sink,
        &[json!({"type": "add_comment", "issue_number": 8, "body": "retry me"})],
    )
    .await;

    assert_eq!(statuses(&summary), vec![OperationStatus::Executed]);
    assert_eq!(platform.call_names(), vec!["create_comment", "create_comment"]);
    assert_eq!(sink.count("request_retried"), 1);
}

#[tokio::test]
async fn exhausted_retries_are_a_transient_failure() {
    let platform = FakePlatform::new();
    for _ in 0..3 {
        platform.fail_next("create_comment", PlatformError::transient("connection reset"));
    }

    let summary = run(
        &config(),
        &platform,
        &[json!({"type": "add_comment", "issue_number": 8, "body": "nope"})],
    )
    .await;

    assert_eq!(statuses(&summary), vec![OperationStatus::Failed]);
    assert_eq!(
        error_codes(&summary),
        vec![Some(ErrorCode::PlatformTransientFailure.to_string())]
    );
    assert_eq!(platform.calls().len(), 3);
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let platform = FakePlatform::new();
    platform.fail_next("create_comment", PlatformError::from_status(404, "Not Found", false, None));

    let summary = run(
        &config(),
        &platform,
        &[json!({"type": "add_comment", "issue_number": 8, "body": "gone"})],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![Some(ErrorCode::PlatformRequestFailed.to_string())]
    );
    assert_eq!(platform.calls().len(), 1);
}

#[tokio::test]
async fn abort_remaining_skips_operations_not_yet_started() {
    let mut config = config();
    config.dispatch.failure_policy = FailurePolicy::AbortRemaining;
    let platform = FakePlatform::new();
    platform.fail_next("create_comment", PlatformError::from_status(403, "Forbidden", false, None));

    let summary = run(
        &config,
        &platform,
        &[
            json!({"type": "add_comment", "issue_number": 1, "body": "first"}),
            json!({"type": "add_labels", "issue_number": 2, "labels": ["later"]}),
        ],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![
            Some(ErrorCode::PlatformRequestFailed.to_string()),
            Some(ErrorCode::SkippedAfterFailure.to_string()),
        ]
    );
    assert_eq!(platform.call_names(), vec!["create_comment"]);
}

#[tokio::test]
async fn isolate_keeps_running_independent_operations() {
    let platform = FakePlatform::new();
    platform.fail_next("create_comment", PlatformError::from_status(403, "Forbidden", false, None));

    let summary = run(
        &config(),
        &platform,
        &[
            json!({"type": "add_comment", "issue_number": 1, "body": "first"}),
            json!({"type": "add_labels", "issue_number": 2, "labels": ["later"]}),
        ],
    )
    .await;

    assert_eq!(
        statuses(&summary),
        vec![OperationStatus::Failed, OperationStatus::Executed]
    );
    assert_eq!(summary.per_type["add_labels"].accepted, 1);
    assert_eq!(summary.per_type["add_comment"].rejected, 1);
}

use safe_outputs::ErrorCode;
use safe_outputs::config::config_digest;
use safe_outputs::diagnostics::MemorySink;
use safe_outputs::operation::OperationStatus;
use serde_json::json;

use crate::batch::{config, run, run_with_sink, statuses};
use crate::fake_platform::FakePlatform;

fn records() -> Vec<serde_json::Value> {
    vec![
        json!({"type": "create_issue", "title": "t", "body": "b"}),
        json!({"type": "add_comment", "issue_number": 1, "body": "c"}),
    ]
}

#[tokio::test]
async fn mismatched_digest_fails_the_batch_before_any_call() {
    let mut config = config();
    config.integrity = Some("0".repeat(64));
    let platform = FakePlatform::new();
    let sink = MemorySink::new();

    let summary = run_with_sink(&config, &platform, &sink, &records()).await;

    assert!(platform.calls().is_empty());
    assert!(summary.results.is_empty());
    assert_eq!(summary.total, 2);
    let batch_error = summary
        .errors
        .iter()
        .find(|e| e.index.is_none())
        .expect("batch-level error");
    assert_eq!(batch_error.code, ErrorCode::ConfigIntegrityMismatch);
    assert!(summary.render_markdown().contains("- batch `CONFIG_INTEGRITY_MISMATCH`"));
    assert_eq!(sink.count("operation_executed"), 0);
}

#[tokio::test]
async fn matching_digest_runs_normally() {
    let mut config = config();
    config.integrity = Some(config_digest(&config).unwrap());
    // Per-run knobs are outside the digest.
    config.run_url = Some("https://github.com/octo/app/actions/runs/2".into());
    let platform = FakePlatform::new();

    let summary = run(&config, &platform, &records()).await;

    assert_eq!(
        statuses(&summary),
        vec![OperationStatus::Executed, OperationStatus::Executed]
    );
    assert_eq!(platform.calls().len(), 2);
}

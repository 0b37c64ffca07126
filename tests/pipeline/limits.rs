use safe_outputs::ErrorCode;
use safe_outputs::operation::OperationStatus;
use serde_json::json;

use crate::batch::{config, error_codes, run, statuses};
use crate::fake_platform::FakePlatform;

fn issues(n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| json!({"type": "create_issue", "title": format!("Issue {i}"), "body": "x"}))
        .collect()
}

#[tokio::test]
async fn first_max_operations_are_kept_in_batch_order() {
    let mut config = config();
    config.operations.create_issue.as_mut().unwrap().common.max = 3;
    let platform = FakePlatform::new();

    let summary = run(&config, &platform, &issues(5)).await;

    assert_eq!(
        statuses(&summary),
        vec![
            OperationStatus::Executed,
            OperationStatus::Executed,
            OperationStatus::Executed,
            OperationStatus::Rejected,
            OperationStatus::Rejected,
        ]
    );
    let limit = ErrorCode::LimitExceeded.to_string();
    assert_eq!(error_codes(&summary)[3].as_deref(), Some(limit.as_str()));
    assert_eq!(error_codes(&summary)[4].as_deref(), Some(limit.as_str()));
    assert_eq!(platform.calls().len(), 3);
    assert_eq!(summary.per_type["create_issue"].accepted, 3);
    assert_eq!(summary.per_type["create_issue"].rejected, 2);
}

#[tokio::test]
async fn invalid_operations_do_not_consume_the_limit() {
    let mut config = config();
    config.operations.create_issue.as_mut().unwrap().common.max = 2;
    let platform = FakePlatform::new();

    let summary = run(
        &config,
        &platform,
        &[
            json!({"type": "create_issue", "body": "no title"}),
            json!({"type": "create_issue", "title": "a", "body": "x"}),
            json!({"type": "create_issue", "title": "b", "body": "x"}),
        ],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![Some(ErrorCode::InvalidSchema.to_string()), None, None]
    );
    assert_eq!(platform.calls().len(), 2);
}

#[tokio::test]
async fn disabled_type_is_unknown() {
    let mut config = config();
    config.operations.add_comment.as_mut().unwrap().common.max = 0;
    let platform = FakePlatform::new();

    let summary = run(
        &config,
        &platform,
        &[json!({"type": "add_comment", "issue_number": 1, "body": "hello"})],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![Some(ErrorCode::UnknownOperation.to_string())]
    );
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn empty_batch_is_a_successful_no_op() {
    let platform = FakePlatform::new();
    let summary = run(&config(), &platform, &[]).await;

    assert_eq!(summary.total, 0);
    assert!(summary.results.is_empty());
    assert!(summary.errors.is_empty());
    assert!(platform.calls().is_empty());
}

use safe_outputs::ErrorCode;
use safe_outputs::error::PlatformError;
use safe_outputs::operation::OperationStatus;
use serde_json::json;

use crate::batch::{config, error_codes, run, statuses};
use crate::fake_platform::FakePlatform;

fn code(code: ErrorCode) -> Option<String> {
    Some(code.to_string())
}

#[tokio::test]
async fn mutual_references_are_a_cycle() {
    let platform = FakePlatform::new();
    let summary = run(
        &config(),
        &platform,
        &[
            json!({"type": "create_issue", "temporary_id": "aw_aaa", "parent": "aw_bbb", "title": "A", "body": "x"}),
            json!({"type": "create_issue", "temporary_id": "aw_bbb", "parent": "aw_aaa", "title": "B", "body": "x"}),
            json!({"type": "create_issue", "title": "C", "body": "unrelated"}),
        ],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![code(ErrorCode::DependencyCycle), code(ErrorCode::DependencyCycle), None]
    );
    assert_eq!(platform.call_names(), vec!["create_issue"]);
}

#[tokio::test]
async fn undeclared_temporary_id_is_missing() {
    let platform = FakePlatform::new();
    let summary = run(
        &config(),
        &platform,
        &[json!({"type": "link_sub_issue", "parent": "aw_nope", "sub_issue": 3})],
    )
    .await;

    assert_eq!(error_codes(&summary), vec![code(ErrorCode::MissingDependency)]);
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn duplicate_declarations_reject_both_and_block_users() {
    let platform = FakePlatform::new();
    let summary = run(
        &config(),
        &platform,
        &[
            json!({"type": "create_issue", "temporary_id": "aw_dup", "title": "one", "body": "x"}),
            json!({"type": "create_issue", "temporary_id": "aw_dup", "title": "two", "body": "x"}),
            json!({"type": "add_comment", "issue_number": "aw_dup", "body": "hello"}),
        ],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![
            code(ErrorCode::DuplicateTemporaryId),
            code(ErrorCode::DuplicateTemporaryId),
            code(ErrorCode::BlockedByDependency),
        ]
    );
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn seeded_ids_resolve_without_a_creator() {
    let mut config = config();
    config
        .temporary_ids
        .insert("aw_prior1".into(), "octo/app#12".into());
    let platform = FakePlatform::new();

    let summary = run(
        &config,
        &platform,
        &[json!({"type": "add_comment", "issue_number": "aw_prior1", "body": "again"})],
    )
    .await;

    assert_eq!(statuses(&summary), vec![OperationStatus::Executed]);
    assert_eq!(summary.results[0].resource.as_ref().unwrap().number, 12);
}

#[tokio::test]
async fn failed_creator_blocks_only_its_dependents() {
    let platform = FakePlatform::new();
    platform.fail_next("create_issue", PlatformError::from_status(422, "Validation Failed", false, None));

    let summary = run(
        &config(),
        &platform,
        &[
            json!({"type": "create_issue", "temporary_id": "aw_parent", "title": "P", "body": "x"}),
            json!({"type": "link_sub_issue", "parent": "aw_parent", "sub_issue": 9}),
            json!({"type": "add_comment", "issue_number": 4, "body": "independent"}),
        ],
    )
    .await;

    assert_eq!(
        statuses(&summary),
        vec![
            OperationStatus::Failed,
            OperationStatus::Blocked,
            OperationStatus::Executed,
        ]
    );
    assert_eq!(
        error_codes(&summary),
        vec![
            code(ErrorCode::PlatformRequestFailed),
            code(ErrorCode::BlockedByDependency),
            None,
        ]
    );
    assert!(!summary.temporary_ids.contains_key("aw_parent"));
}

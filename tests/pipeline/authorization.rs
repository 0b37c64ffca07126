use safe_outputs::ErrorCode;
use safe_outputs::operation::OperationStatus;
use safe_outputs::platform::PlatformRequest;
use serde_json::json;

use crate::batch::{config, config_with, error_codes, run};
use crate::fake_platform::FakePlatform;

#[tokio::test]
async fn cross_repository_is_denied_by_default() {
    let platform = FakePlatform::new();
    let summary = run(
        &config(),
        &platform,
        &[json!({"type": "create_issue", "repo": "other/repo", "title": "t", "body": "b"})],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![Some(ErrorCode::UnauthorizedRepository.to_string())]
    );
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn missing_repository_targets_own_repository() {
    let platform = FakePlatform::new();
    run(
        &config(),
        &platform,
        &[json!({"type": "add_labels", "issue_number": 5, "labels": ["bug"]})],
    )
    .await;

    let calls = platform.calls();
    let PlatformRequest::AddLabels { repository, number, .. } = &calls[0] else {
        panic!("expected add_labels, got {:?}", calls[0]);
    };
    assert_eq!(repository.to_string(), "octo/app");
    assert_eq!(*number, 5);
}

#[tokio::test]
async fn allowlisted_repository_is_used_and_malformed_is_distinct() {
    let platform = FakePlatform::new();
    let summary = run(
        &config_with(r#"allowed_repos = ["octo/docs"]"#),
        &platform,
        &[
            json!({"type": "create_issue", "repo": "octo/docs", "title": "t", "body": "b"}),
            json!({"type": "create_issue", "repo": "not a repo", "title": "t", "body": "b"}),
        ],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![None, Some(ErrorCode::MalformedRepository.to_string())]
    );
    assert_eq!(
        summary.results[0].resource.as_ref().unwrap().repository.to_string(),
        "octo/docs"
    );
}

#[tokio::test]
async fn disallowed_links_are_redacted_not_rejected() {
    let platform = FakePlatform::new();
    let summary = run(
        &config_with(r#"allowed_domains = ["github.com"]"#),
        &platform,
        &[json!({
            "type": "add_comment",
            "issue_number": 1,
            "body": "See https://github.com/octo/app and https://evil.example/x"
        })],
    )
    .await;

    assert!(summary.errors.is_empty());
    let calls = platform.calls();
    let PlatformRequest::CreateComment { body, .. } = &calls[0] else {
        panic!("expected a comment");
    };
    assert!(body.contains("https://github.com/octo/app"));
    assert!(!body.contains("evil.example"));
    assert!(!summary.redactions.is_empty());
}

#[tokio::test]
async fn link_redaction_can_reject_the_operation() {
    let platform = FakePlatform::new();
    let summary = run(
        &config_with(
            r#"
allowed_domains = ["github.com"]

[sanitize]
reject_on_link_redaction = true
"#,
        ),
        &platform,
        &[json!({"type": "add_comment", "issue_number": 1, "body": "[click](https://evil.example/x)"})],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![Some(ErrorCode::UnauthorizedDomain.to_string())]
    );
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn created_placeholder_does_not_widen_another_types_allowlist() {
    let mut config = config();
    if let Some(create_issue) = config.operations.create_issue.as_mut() {
        create_issue.common.allowed_repos = Some(vec!["other/allowed".into()]);
    }
    let platform = FakePlatform::starting_at(9);
    let summary = run(
        &config,
        &platform,
        &[
            json!({"type": "create_issue", "repo": "other/allowed", "temporary_id": "aw_abc123", "title": "t", "body": "b"}),
            json!({"type": "add_comment", "issue_number": "aw_abc123", "body": "posted where?"}),
            json!({"type": "add_comment", "repo": "other/allowed", "issue_number": 9, "body": "direct"}),
        ],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![
            None,
            Some(ErrorCode::UnauthorizedRepository.to_string()),
            Some(ErrorCode::UnauthorizedRepository.to_string()),
        ]
    );
    assert_eq!(summary.results[1].status, OperationStatus::Rejected);
    assert_eq!(platform.call_names(), vec!["create_issue"]);
}

#[tokio::test]
async fn seeded_placeholder_into_unlisted_repository_is_rejected() {
    let platform = FakePlatform::new();
    let summary = run(
        &config_with(
            r#"
[temporary_ids]
aw_prior1 = "other/repo#5"
aw_prior2 = "octo/app#6"
"#,
        ),
        &platform,
        &[
            json!({"type": "add_labels", "issue_number": "aw_prior1", "labels": ["bug"]}),
            json!({"type": "add_labels", "issue_number": "aw_prior2", "labels": ["bug"]}),
        ],
    )
    .await;

    assert_eq!(
        error_codes(&summary),
        vec![Some(ErrorCode::UnauthorizedRepository.to_string()), None]
    );
    let calls = platform.calls();
    assert_eq!(calls.len(), 1);
    let PlatformRequest::AddLabels { repository, number, .. } = &calls[0] else {
        panic!("expected add_labels, got {:?}", calls[0]);
    };
    assert_eq!(repository.to_string(), "octo/app");
    assert_eq!(*number, 6);
}

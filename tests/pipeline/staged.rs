use safe_outputs::operation::OperationStatus;
use serde_json::json;

use crate::batch::{config, config_with, error_codes, run, statuses};
use crate::fake_platform::FakePlatform;

fn batch() -> Vec<serde_json::Value> {
    vec![
        json!({"type": "create_issue", "temporary_id": "aw_epic1", "title": "Epic", "body": "Plan"}),
        json!({"type": "link_sub_issue", "parent": "aw_epic1", "sub_issue": 42}),
        json!({"type": "add_labels", "issue_number": 42, "labels": ["triage"]}),
        json!({"type": "add_comment", "repo": "elsewhere/repo", "issue_number": 1, "body": "hi"}),
    ]
}

#[tokio::test]
async fn staged_mode_makes_no_calls_and_matches_live_outcomes() {
    let live_platform = FakePlatform::new();
    let live = run(&config(), &live_platform, &batch()).await;

    let staged_platform = FakePlatform::new();
    let staged = run(&config_with("staged = true"), &staged_platform, &batch()).await;

    assert!(staged_platform.calls().is_empty());
    assert!(staged.staged);
    assert_eq!(error_codes(&live), error_codes(&staged));
    assert_eq!(
        statuses(&staged),
        vec![
            OperationStatus::Previewed,
            OperationStatus::Previewed,
            OperationStatus::Previewed,
            OperationStatus::Rejected,
        ]
    );
    assert_eq!(
        statuses(&live),
        vec![
            OperationStatus::Executed,
            OperationStatus::Executed,
            OperationStatus::Executed,
            OperationStatus::Rejected,
        ]
    );
    assert_eq!(live.accepted(), staged.accepted());
    assert_eq!(live.rejected(), staged.rejected());
}

#[tokio::test]
async fn staged_preview_lists_would_be_operations() {
    let platform = FakePlatform::new();
    let summary = run(&config_with("staged = true"), &platform, &batch()).await;

    let preview = summary.preview.as_ref().expect("staged run has a preview");
    assert!(preview.no_resources_created);
    assert_eq!(preview.items.len(), 3);

    let markdown = summary.render_markdown();
    assert!(markdown.contains("## Staged Mode: Preview"));
    assert!(markdown.contains("No resources were created"));
    assert!(markdown.contains("`create_issue`"));
    assert!(markdown.contains("UNAUTHORIZED_REPOSITORY"));
    assert!(summary.results.iter().all(|r| r.resource.is_none()));
}

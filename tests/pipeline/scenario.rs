use safe_outputs::operation::OperationStatus;
use safe_outputs::platform::PlatformRequest;
use serde_json::json;

use crate::batch::{config, config_with, run};
use crate::fake_platform::FakePlatform;

#[tokio::test]
async fn issue_then_sub_issue_link_with_neutralized_mention() {
    let platform = FakePlatform::starting_at(57);
    let summary = run(
        &config(),
        &platform,
        &[
            json!({"type": "create-issue", "temporaryId": "aw_abc123", "title": "&#64;alice please review", "body": "Tracking issue"}),
            json!({"type": "link-sub-issue", "parentRef": "aw_abc123", "childRef": 42}),
        ],
    )
    .await;

    assert_eq!(
        summary.results.iter().map(|r| r.status).collect::<Vec<_>>(),
        vec![OperationStatus::Executed, OperationStatus::Executed]
    );
    assert!(summary.errors.is_empty());

    let calls = platform.calls();
    let PlatformRequest::CreateIssue { title, .. } = &calls[0] else {
        panic!("first call should create the issue, got {:?}", calls[0]);
    };
    assert_eq!(title, "`@alice` please review");

    assert_eq!(
        platform.call_names(),
        vec!["create_issue", "get_issue", "add_sub_issue"]
    );
    assert!(matches!(
        &calls[2],
        PlatformRequest::AddSubIssue { parent: 57, sub_issue_id: 10_042, .. }
    ));

    assert_eq!(summary.temporary_ids["aw_abc123"], "octo/app#57");
    assert_eq!(summary.results[0].resource.as_ref().unwrap().number, 57);
    assert_eq!(summary.per_type["create_issue"].accepted, 1);
    assert_eq!(summary.per_type["link_sub_issue"].accepted, 1);
    assert!(summary.redactions.iter().any(|r| r.index == 0 && r.field == "title"));
}

#[tokio::test]
async fn in_body_reference_is_rendered_with_the_real_number() {
    let platform = FakePlatform::starting_at(7);
    let summary = run(
        &config(),
        &platform,
        &[
            json!({"type": "create_issue", "temporary_id": "aw_parent1", "title": "Epic", "body": "Umbrella"}),
            json!({"type": "add_comment", "issue_number": 3, "body": "Follow-up in #aw_parent1, see `#aw_parent1` too"}),
        ],
    )
    .await;

    assert!(summary.errors.is_empty());
    let calls = platform.calls();
    let PlatformRequest::CreateComment { body, number, .. } = &calls[1] else {
        panic!("expected a comment, got {:?}", calls[1]);
    };
    assert_eq!(*number, 3);
    assert_eq!(body, "Follow-up in #7, see `#aw_parent1` too");
}

#[tokio::test]
async fn footer_is_appended_after_sanitization() {
    let config = config_with(
        r#"
run_url = "https://github.com/octo/app/actions/runs/9"

[templates]
footer = "> AI generated by {{ workflow_name }} @ {{ run_url }}"
"#,
    );
    let platform = FakePlatform::new();
    run(
        &config,
        &platform,
        &[json!({"type": "add_comment", "issue_number": 1, "body": "Done, thanks @bob"})],
    )
    .await;

    let calls = platform.calls();
    let PlatformRequest::CreateComment { body, .. } = &calls[0] else {
        panic!("expected a comment");
    };
    assert_eq!(
        body,
        "Done, thanks `@bob`\n\n> AI generated by triage @ https://github.com/octo/app/actions/runs/9"
    );
}

#[tokio::test]
async fn reports_are_recorded_without_platform_calls() {
    let platform = FakePlatform::new();
    let summary = run(
        &config(),
        &platform,
        &[
            json!({"type": "noop", "message": "Nothing needed"}),
            json!({"type": "missing-tool", "tool": "browser", "reason": "needs JS"}),
        ],
    )
    .await;

    assert!(platform.calls().is_empty());
    assert_eq!(summary.results[0].report.as_deref(), Some("Nothing needed"));
    assert_eq!(summary.results[1].report.as_deref(), Some("browser: needs JS"));
    assert!(summary.render_markdown().contains("### Agent reports"));
}

#[tokio::test]
async fn malformed_records_are_skipped_and_counted() {
    let platform = FakePlatform::new();
    let input = format!(
        "{}\nnot json at all\n{{\"no_type\": true}}\n",
        json!({"type": "noop", "message": "ok"})
    );
    let sink = safe_outputs::diagnostics::MemorySink::new();
    let summary = safe_outputs::Pipeline::new(&config(), &platform, &sink)
        .run(&input)
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.skipped_records, 2);
    assert_eq!(summary.results[0].status, OperationStatus::Executed);
}

#[tokio::test]
async fn encoded_mentions_neutralize_like_literal_ones() {
    let platform = FakePlatform::new();
    run(
        &config(),
        &platform,
        &[
            json!({"type": "add_comment", "issue_number": 1, "body": "ping @user"}),
            json!({"type": "add_comment", "issue_number": 1, "body": "ping &#64;user"}),
            json!({"type": "add_comment", "issue_number": 1, "body": "ping &amp;commat;user"}),
        ],
    )
    .await;

    let bodies: Vec<String> = platform
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            PlatformRequest::CreateComment { body, .. } => Some(body),
            _ => None,
        })
        .collect();
    assert_eq!(bodies.len(), 3);
    assert_eq!(bodies[0], "ping `@user`");
    assert!(bodies.iter().all(|b| b == &bodies[0]));
}

#![allow(dead_code)]

use safe_outputs::diagnostics::MemorySink;
use safe_outputs::dispatch::RetryPolicy;
use safe_outputs::operation::OperationStatus;
use safe_outputs::{BatchSummary, Pipeline, SafeOutputsConfig};
use serde_json::Value;
use std::time::Duration;

use crate::fake_platform::FakePlatform;

const TOP_LEVEL: &str = r#"
repository = "octo/app"
workflow_name = "triage"
"#;

/// Every type enabled with `max = 5`.
const OPERATIONS: &str = r#"
[operations.create_issue]
max = 5
[operations.add_comment]
max = 5
[operations.create_pull_request]
max = 5
[operations.update_issue]
max = 5
[operations.close_issue]
max = 5
[operations.add_labels]
max = 5
[operations.remove_labels]
max = 5
[operations.link_sub_issue]
max = 5
[operations.noop]
max = 5
[operations.missing_tool]
max = 5
"#;

pub fn config() -> SafeOutputsConfig {
    config_with("")
}

/// Own repository `octo/app`, every type enabled with `max = 5`, plus
/// `extra` (top-level keys before tables; no `[operations.*]` tables).
pub fn config_with(extra: &str) -> SafeOutputsConfig {
    let toml = format!("{TOP_LEVEL}\n{extra}\n{OPERATIONS}");
    let config = SafeOutputsConfig::from_toml_str(&toml).unwrap();
    config.validate().unwrap();
    config
}

pub fn ndjson(records: &[Value]) -> String {
    records
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Retries without real waiting.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        multiplier: 2,
        max_delay: Duration::ZERO,
    }
}

pub async fn run(config: &SafeOutputsConfig, platform: &FakePlatform, records: &[Value]) -> BatchSummary {
    let sink = MemorySink::new();
    run_with_sink(config, platform, &sink, records).await
}

pub async fn run_with_sink(
    config: &SafeOutputsConfig,
    platform: &FakePlatform,
    sink: &MemorySink,
    records: &[Value],
) -> BatchSummary {
    Pipeline::new(config, platform, sink)
        .with_retry(fast_retry())
        .run(&ndjson(records))
        .await
        .unwrap()
}

pub fn statuses(summary: &BatchSummary) -> Vec<OperationStatus> {
    summary.results.iter().map(|r| r.status).collect()
}

pub fn error_codes(summary: &BatchSummary) -> Vec<Option<String>> {
    summary
        .results
        .iter()
        .map(|r| {
            summary
                .errors
                .iter()
                .find(|e| e.index == Some(r.index))
                .map(|e| e.code.to_string())
        })
        .collect()
}

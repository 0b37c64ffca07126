use super::Operation;
use serde_json::Value;

/// Records that could be turned into operations plus the count of records
/// that could not.
#[derive(Debug, Default)]
pub struct IngestResult {
    pub operations: Vec<Operation>,
    pub skipped: usize,
}

/// Parse the agent's record stream.
///
/// Accepts newline-delimited JSON (one record per line) or a single JSON
/// document of the form `{"items": [...]}`. A record must be an object with a
/// string `type`; anything else is skipped with a warning.
pub fn parse_records(input: &str) -> IngestResult {
    if let Some(items) = parse_items_document(input) {
        return collect(items.into_iter().map(Ok));
    }
    collect(
        input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_no, line)| {
                serde_json::from_str::<Value>(line.trim()).map_err(|e| {
                    tracing::warn!(line = line_no + 1, error = %e, "Skipping malformed record");
                })
            }),
    )
}

fn parse_items_document(input: &str) -> Option<Vec<Value>> {
    let trimmed = input.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let Value::Object(mut doc) = serde_json::from_str::<Value>(input).ok()? else {
        return None;
    };
    if doc.contains_key("type") {
        return None;
    }
    match doc.remove("items")? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn collect(records: impl Iterator<Item = Result<Value, ()>>) -> IngestResult {
    let mut result = IngestResult::default();
    for record in records {
        let Ok(value) = record else {
            result.skipped += 1;
            continue;
        };
        match into_operation(result.operations.len(), value) {
            Some(op) => result.operations.push(op),
            None => {
                tracing::warn!("Skipping record without a string `type` field");
                result.skipped += 1;
            }
        }
    }
    result
}

fn into_operation(index: usize, value: Value) -> Option<Operation> {
    let Value::Object(mut fields) = value else {
        return None;
    };
    let Some(Value::String(tag)) = fields.remove("type") else {
        return None;
    };
    Some(Operation::new(index, tag, fields))
}

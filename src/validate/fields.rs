use crate::error::{ErrorCode, OperationError, echo_value};
use crate::operation::{IssueRef, TemporaryId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) const MAX_TITLE_CHARS: usize = 256;
pub(crate) const MAX_BODY_CHARS: usize = 262_144;
pub(crate) const MAX_MESSAGE_CHARS: usize = 65_536;
pub(crate) const MAX_NAME_CHARS: usize = 255;
pub(crate) const MAX_LABEL_CHARS: usize = 64;
pub(crate) const MAX_LIST_ITEMS: usize = 50;
pub(crate) const MAX_WORKFLOW_INPUTS: usize = 25;

pub(crate) fn schema_error(field: &str, message: impl Into<String>) -> OperationError {
    OperationError::new(ErrorCode::InvalidSchema, message).field(field)
}

/// Consuming view over a raw field map. Every read removes the field, so
/// whatever remains at [`FieldReader::finish`] was never part of the schema.
pub(crate) struct FieldReader {
    fields: Map<String, Value>,
}

impl FieldReader {
    pub(crate) fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Remove `name` or one of its aliases. Supplying two spellings of the
    /// same field is ambiguous.
    fn take(&mut self, name: &str, aliases: &[&str]) -> Result<Option<Value>, OperationError> {
        let mut found: Option<(&str, Value)> = None;
        for key in std::iter::once(name).chain(aliases.iter().copied()) {
            let Some(value) = self.fields.remove(key) else {
                continue;
            };
            if let Some((first, _)) = &found {
                return Err(schema_error(
                    name,
                    format!("'{first}' and '{key}' both set the same field"),
                ));
            }
            found = Some((key, value));
        }
        Ok(found
            .map(|(_, value)| value)
            .filter(|value| !value.is_null()))
    }

    pub(crate) fn optional_string(
        &mut self,
        name: &str,
        aliases: &[&str],
        max_chars: usize,
    ) -> Result<Option<String>, OperationError> {
        match self.take(name, aliases)? {
            None => Ok(None),
            Some(Value::String(s)) => {
                let count = s.chars().count();
                if count > max_chars {
                    return Err(schema_error(
                        name,
                        format!("{name} is {count} characters; the limit is {max_chars}"),
                    ));
                }
                Ok(Some(s))
            }
            Some(_) => Err(schema_error(name, format!("{name} must be a string"))),
        }
    }

    pub(crate) fn required_string(
        &mut self,
        name: &str,
        aliases: &[&str],
        max_chars: usize,
    ) -> Result<String, OperationError> {
        self.optional_string(name, aliases, max_chars)?
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| schema_error(name, format!("{name} is required")))
    }

    pub(crate) fn optional_bool(&mut self, name: &str) -> Result<Option<bool>, OperationError> {
        match self.take(name, &[])? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(_) => Err(schema_error(name, format!("{name} must be true or false"))),
        }
    }

    /// A list of strings; a single string is accepted as a one-item list.
    pub(crate) fn string_list(&mut self, name: &str) -> Result<Vec<String>, OperationError> {
        let items = match self.take(name, &[])? {
            None => return Ok(Vec::new()),
            Some(Value::String(s)) => vec![s],
            Some(Value::Array(values)) => values
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    _ => Err(schema_error(name, format!("{name} must contain only strings"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(schema_error(name, format!("{name} must be a list of strings"))),
        };
        if items.len() > MAX_LIST_ITEMS {
            return Err(schema_error(
                name,
                format!("{name} has {} entries; the limit is {MAX_LIST_ITEMS}", items.len()),
            ));
        }
        Ok(items)
    }

    pub(crate) fn optional_ref(
        &mut self,
        name: &str,
        aliases: &[&str],
    ) -> Result<Option<IssueRef>, OperationError> {
        self.take(name, aliases)?
            .map(|value| {
                IssueRef::from_value(&value).map_err(|e| schema_error(name, format!("{name} {e}")))
            })
            .transpose()
    }

    pub(crate) fn required_ref(
        &mut self,
        name: &str,
        aliases: &[&str],
    ) -> Result<IssueRef, OperationError> {
        self.optional_ref(name, aliases)?
            .ok_or_else(|| schema_error(name, format!("{name} is required")))
    }

    /// Issue reference that falls back to the triggering issue.
    pub(crate) fn ref_or_context(
        &mut self,
        name: &str,
        aliases: &[&str],
        context: Option<u64>,
    ) -> Result<IssueRef, OperationError> {
        match self.optional_ref(name, aliases)? {
            Some(reference) => Ok(reference),
            None => context.map(IssueRef::Number).ok_or_else(|| {
                schema_error(
                    name,
                    format!("{name} is required when the run has no triggering issue"),
                )
            }),
        }
    }

    pub(crate) fn temporary_id(&mut self) -> Result<Option<TemporaryId>, OperationError> {
        const FIELD: &str = "temporary_id";
        match self.take(FIELD, &["temporaryId"])? {
            None => Ok(None),
            Some(Value::String(raw)) => TemporaryId::parse(&raw).map(Some).ok_or_else(|| {
                schema_error(
                    FIELD,
                    format!(
                        "'{}' is not a temporary id (expected aw_ + 3-12 alphanumerics)",
                        echo_value(&raw)
                    ),
                )
            }),
            Some(_) => Err(schema_error(FIELD, "temporary_id must be a string")),
        }
    }

    /// String-valued map; numbers and booleans are stringified.
    pub(crate) fn string_map(&mut self, name: &str) -> Result<BTreeMap<String, String>, OperationError> {
        let object = match self.take(name, &[])? {
            None => return Ok(BTreeMap::new()),
            Some(Value::Object(object)) => object,
            Some(_) => return Err(schema_error(name, format!("{name} must be an object"))),
        };
        if object.len() > MAX_WORKFLOW_INPUTS {
            return Err(schema_error(
                name,
                format!("{name} has {} keys; the limit is {MAX_WORKFLOW_INPUTS}", object.len()),
            ));
        }
        object
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(schema_error(
                            name,
                            format!("{name}.{} must be a string, number or boolean", echo_value(&key)),
                        ));
                    }
                };
                if text.chars().count() > MAX_MESSAGE_CHARS {
                    return Err(schema_error(name, format!("{name}.{} is too long", echo_value(&key))));
                }
                Ok((key, text))
            })
            .collect()
    }

    /// Fail on the first field nobody asked for.
    pub(crate) fn finish(self) -> Result<(), OperationError> {
        match self.fields.keys().next() {
            None => Ok(()),
            Some(key) => Err(schema_error(
                key,
                format!("unknown field '{}'", echo_value(key)),
            )),
        }
    }
}

/// Trim, cap at 64 characters, drop empties and case-insensitive duplicates.
pub(crate) fn normalize_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    labels
        .into_iter()
        .filter_map(|label| {
            let capped: String = label.trim().chars().take(MAX_LABEL_CHARS).collect();
            let capped = capped.trim_end().to_string();
            (!capped.is_empty() && seen.insert(capped.to_lowercase())).then_some(capped)
        })
        .collect()
}

/// Platform login: 1-39 letters, digits or `-`, with an optional `[bot]`
/// suffix.
pub(crate) fn is_login(name: &str) -> bool {
    let base = name.strip_suffix("[bot]").unwrap_or(name);
    (1..=39).contains(&base.len())
        && !base.starts_with('-')
        && base.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Git ref name check, strict enough to keep shell and URL metacharacters out.
pub(crate) fn is_branch_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_CHARS
        && !name.starts_with('-')
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.ends_with(".lock")
        && !name.contains("..")
        && !name.contains("//")
        && !name.contains("@{")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reader(value: Value) -> FieldReader {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        FieldReader::new(map)
    }

    #[test]
    fn unknown_fields_are_named() {
        let mut r = reader(json!({"title": "t", "extra": 1}));
        r.required_string("title", &[], MAX_TITLE_CHARS).unwrap();
        let err = r.finish().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSchema);
        assert_eq!(err.field.as_deref(), Some("extra"));
    }

    #[test]
    fn aliases_are_accepted_but_not_both() {
        let mut r = reader(json!({"parentRef": "aw_abc123"}));
        assert!(r.required_ref("parent_issue_number", &["parentRef"]).is_ok());

        let mut r = reader(json!({"parent": 1, "parent_issue": 2}));
        let err = r.optional_ref("parent", &["parent_issue"]).unwrap_err();
        assert!(err.message.contains("both"));
    }

    #[test]
    fn wrong_kinds_and_lengths_are_rejected() {
        let mut r = reader(json!({"title": 5}));
        assert!(r.required_string("title", &[], 10).is_err());

        let mut r = reader(json!({"title": "x".repeat(11)}));
        let err = r.required_string("title", &[], 10).unwrap_err();
        assert!(err.message.contains("limit is 10"));

        let mut r = reader(json!({"title": "   "}));
        assert!(r.required_string("title", &[], 10).is_err());

        let mut r = reader(json!({"draft": "yes"}));
        assert!(r.optional_bool("draft").is_err());
    }

    #[test]
    fn null_counts_as_absent() {
        let mut r = reader(json!({"body": null}));
        assert_eq!(r.optional_string("body", &[], 10).unwrap(), None);
        r.finish().unwrap();
    }

    #[test]
    fn context_fallback_for_issue_number() {
        let mut r = reader(json!({}));
        assert_eq!(
            r.ref_or_context("issue_number", &[], Some(9)).unwrap(),
            IssueRef::Number(9)
        );
        let mut r = reader(json!({}));
        assert!(r.ref_or_context("issue_number", &[], None).is_err());
    }

    #[test]
    fn temporary_id_accepts_camel_case_key() {
        let mut r = reader(json!({"temporaryId": "AW_ABC123"}));
        assert_eq!(r.temporary_id().unwrap().unwrap().as_str(), "aw_abc123");
        let mut r = reader(json!({"temporary_id": "aw_!"}));
        assert!(r.temporary_id().is_err());
    }

    #[test]
    fn string_map_stringifies_scalars() {
        let mut r = reader(json!({"inputs": {"a": "x", "b": 2, "c": true}}));
        let map = r.string_map("inputs").unwrap();
        assert_eq!(map["b"], "2");
        assert_eq!(map["c"], "true");
        let mut r = reader(json!({"inputs": {"a": [1]}}));
        assert!(r.string_map("inputs").is_err());
    }

    #[test]
    fn labels_are_trimmed_capped_and_deduplicated() {
        let labels = normalize_labels(vec![
            " bug ".into(),
            "Bug".into(),
            String::new(),
            "x".repeat(70),
        ]);
        assert_eq!(labels, vec!["bug".to_string(), "x".repeat(64)]);
    }

    #[test]
    fn branch_and_login_shapes() {
        assert!(is_branch_name("feature/fix-1.2"));
        assert!(!is_branch_name("../main"));
        assert!(!is_branch_name("a b"));
        assert!(!is_branch_name("-rf"));
        assert!(is_login("octocat"));
        assert!(is_login("copilot-swe-agent"));
        assert!(is_login("dependabot[bot]"));
        assert!(!is_login("bad name"));
    }
}

use super::{Redaction, RedactionKind};

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Remove `<!-- ... -->` comments, which render invisibly but still reach
/// anything that reads the raw markdown. An unclosed comment hides the rest
/// of the prose and is removed to the end.
pub(super) fn strip_html_comments(prose: &str, redactions: &mut Vec<Redaction>) -> String {
    if !prose.contains(COMMENT_OPEN) {
        return prose.to_string();
    }
    let mut out = String::with_capacity(prose.len());
    let mut rest = prose;
    while let Some(start) = rest.find(COMMENT_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + COMMENT_OPEN.len()..];
        let (removed, remaining) = match after_open.find(COMMENT_CLOSE) {
            Some(end) => {
                let consumed = start + COMMENT_OPEN.len() + end + COMMENT_CLOSE.len();
                (&rest[start..consumed], &rest[consumed..])
            }
            None => (&rest[start..], ""),
        };
        redactions.push(Redaction::new(
            RedactionKind::HiddenComment,
            removed.chars().count(),
            "hidden HTML comment removed",
        ));
        rest = remaining;
    }
    out.push_str(rest);
    out
}

use super::{Redaction, RedactionKind};
use regex::Regex;
use std::sync::LazyLock;

/// CSI, OSC and two-byte escape sequences (7-bit and the 8-bit CSI/OSC).
static ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\x1b\[|\x{9b})[0-?]*[ -/]*[@-~]|(?:\x1b\]|\x{9d})[^\x07\x1b\x{9c}\n]*(?:\x07|\x1b\\|\x{9c})?|\x1b[@-Z\\-_]",
    )
    .unwrap()
});

fn is_stray_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Remove terminal escape sequences, then any other C0/C1 control
/// character except tab, newline and carriage return.
pub(super) fn strip_control(text: &str, redactions: &mut Vec<Redaction>) -> String {
    if !text.chars().any(is_stray_control) {
        return text.to_string();
    }

    let without_sequences = ESCAPE_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        redactions.push(Redaction::new(
            RedactionKind::ControlSequence,
            caps[0].chars().count(),
            "terminal escape sequence removed",
        ));
        String::new()
    });

    let mut out = String::with_capacity(without_sequences.len());
    let mut run = 0usize;
    for c in without_sequences.chars() {
        if is_stray_control(c) {
            run += 1;
            continue;
        }
        if run > 0 {
            redactions.push(control_redaction(run));
            run = 0;
        }
        out.push(c);
    }
    if run > 0 {
        redactions.push(control_redaction(run));
    }
    out
}

fn control_redaction(run: usize) -> Redaction {
    Redaction::new(
        RedactionKind::ControlSequence,
        run,
        "control characters removed",
    )
}

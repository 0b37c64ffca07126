use super::{Redaction, RedactionKind};
use unicode_normalization::UnicodeNormalization;

/// Canonical composition (NFC).
pub(super) fn normalize(text: &str) -> String {
    text.nfc().collect()
}

/// Characters that hide or reorder text without being visible.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{034F}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
            | '\u{E0000}'..='\u{E007F}'
    )
}

/// Remove zero-width, bidi-control and tag characters. Each contiguous run
/// is logged as one redaction.
pub(super) fn strip_invisible(text: &str, redactions: &mut Vec<Redaction>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for c in text.chars() {
        if is_invisible(c) {
            run += 1;
            continue;
        }
        if run > 0 {
            redactions.push(invisible_redaction(run));
            run = 0;
        }
        out.push(c);
    }
    if run > 0 {
        redactions.push(invisible_redaction(run));
    }
    out
}

fn invisible_redaction(run: usize) -> Redaction {
    Redaction::new(
        RedactionKind::InvisibleCharacter,
        run,
        "zero-width or bidirectional control characters removed",
    )
}

/// Fold full-width ASCII look-alikes (U+FF01..U+FF5E) and the ideographic
/// space to plain ASCII.
pub(super) fn fold_fullwidth(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

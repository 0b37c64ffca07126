use super::{Redaction, RedactionKind};

/// Openers recognised by common template engines: Jinja/Liquid/Handlebars
/// (`{{`, `{%`, `{#`), ERB/EJS (`<%`) and shell/JS interpolation (`${`).
const OPENERS: &[(char, char)] = &[('{', '{'), ('{', '%'), ('{', '#'), ('<', '%'), ('$', '{')];

/// Insert a backslash between the two characters of every template opener.
/// `{{ x }}` becomes `{\{ x }}`, which renders the same in markdown but is
/// no longer an opener. Overlapping openers (`${{`) are each broken, and
/// already-escaped text is left alone.
pub(super) fn escape_delimiters(prose: &str, redactions: &mut Vec<Redaction>) -> String {
    let mut out = String::with_capacity(prose.len());
    let mut escaped = 0usize;
    let mut prev: Option<char> = None;
    for c in prose.chars() {
        if let Some(p) = prev
            && OPENERS.contains(&(p, c))
        {
            out.push('\\');
            escaped += 1;
        }
        out.push(c);
        prev = Some(c);
    }
    if escaped > 0 {
        redactions.push(Redaction::new(
            RedactionKind::TemplateDelimiter,
            escaped * 2,
            format!("{escaped} template delimiter(s) escaped"),
        ));
    }
    out
}

use crate::error::{SanitizeError, echo_value};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]{1,8})|#[xX]([0-9A-Fa-f]{1,8})|([A-Za-z][A-Za-z0-9]{1,31}));").unwrap()
});

/// Named references worth decoding: markup, punctuation an attacker can use
/// to smuggle syntax, and the invisible characters stripped later.
const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
    ("commat", '@'),
    ("num", '#'),
    ("dollar", '$'),
    ("percnt", '%'),
    ("excl", '!'),
    ("quest", '?'),
    ("colon", ':'),
    ("semi", ';'),
    ("comma", ','),
    ("period", '.'),
    ("sol", '/'),
    ("bsol", '\\'),
    ("grave", '`'),
    ("lowbar", '_'),
    ("equals", '='),
    ("plus", '+'),
    ("ast", '*'),
    ("midast", '*'),
    ("verbar", '|'),
    ("vert", '|'),
    ("Hat", '^'),
    ("lpar", '('),
    ("rpar", ')'),
    ("lsqb", '['),
    ("lbrack", '['),
    ("rsqb", ']'),
    ("rbrack", ']'),
    ("lcub", '{'),
    ("lbrace", '{'),
    ("rcub", '}'),
    ("rbrace", '}'),
    ("copy", '\u{00A9}'),
    ("reg", '\u{00AE}'),
    ("trade", '\u{2122}'),
    ("hellip", '\u{2026}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201C}'),
    ("rdquo", '\u{201D}'),
    ("shy", '\u{00AD}'),
    ("zwsp", '\u{200B}'),
    ("zwnj", '\u{200C}'),
    ("zwj", '\u{200D}'),
    ("lrm", '\u{200E}'),
    ("rlm", '\u{200F}'),
];

fn lookup_named(name: &str) -> Option<char> {
    NAMED.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}

/// The character a reference decodes to, or `None` when it must be left
/// as-is (unknown name, NUL, surrogate, beyond U+10FFFF).
fn decode_reference(caps: &Captures<'_>) -> Option<char> {
    if let Some(dec) = caps.get(1) {
        let code = dec.as_str().parse::<u32>().ok()?;
        return char::from_u32(code).filter(|c| *c != '\0');
    }
    if let Some(hex) = caps.get(2) {
        let code = u32::from_str_radix(hex.as_str(), 16).ok()?;
        return char::from_u32(code).filter(|c| *c != '\0');
    }
    caps.get(3).and_then(|name| lookup_named(name.as_str()))
}

fn decode_once(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            decode_reference(caps).map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

/// Decode entity references, including one level of double encoding.
///
/// Anything still decodable afterwards was encoded three or more times and
/// is rejected.
pub(super) fn decode(text: &str) -> Result<String, SanitizeError> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }
    let decoded = decode_once(&decode_once(text));
    ensure_decoded(&decoded)?;
    Ok(decoded)
}

/// Fails when `text` still contains a reference that would decode.
pub(super) fn ensure_decoded(text: &str) -> Result<(), SanitizeError> {
    if !text.contains('&') {
        return Ok(());
    }
    match ENTITY_RE
        .captures_iter(text)
        .find(|caps| decode_reference(caps).is_some())
    {
        Some(caps) => Err(SanitizeError::NestedEncoding {
            fragment: echo_value(&caps[0]),
        }),
        None => Ok(()),
    }
}

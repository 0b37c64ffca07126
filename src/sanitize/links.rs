use super::{Redaction, RedactionKind};
use crate::authorize::{DomainAllowlist, LinkVerdict, classify_url};
use crate::error::echo_value;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

pub(super) const URL_REDACTION: &str = "redacted";

/// Markdown links and images (`[text](url "title")`, one level of nested
/// brackets and parentheses), or a bare URL.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?P<bang>!?)\[(?P<text>(?:[^\[\]\n]|\[[^\[\]\n]*\])*)\]"#,
        r#"\(\s*<?(?P<url>(?:[^()\s<>]|\([^()\s]*\))+)>?(?P<title>\s+(?:"[^"\n]*"|'[^'\n]*'))?\s*\)"#,
        r#"|(?P<bare>(?i:\b(?:https?|ftp)://|\bwww\.)[^\s<>()\[\]"'`]+)"#,
    ))
    .unwrap()
});

/// Link reference definitions (`[id]: url`), whose target may sit on the
/// next line.
static DEFINITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^(?P<lead>[ ]{0,3}\[[^\]\n]+\]:[ \t]*(?:\n[ \t]*)?)(?:<(?P<angled>[^<>\n]*)>|(?P<plain>[^\s<>]+))",
    )
    .unwrap()
});

/// URL-valued attributes of raw HTML tags.
static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?P<lead>\b(?:src|href|srcset|poster|background|action|formaction)\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<uq>[^\s"'>]+))"#,
    )
    .unwrap()
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Redact link targets with executable schemes always, and targets outside
/// `allowlist` when one is configured.
pub(super) fn filter_links(
    prose: &str,
    allowlist: Option<&DomainAllowlist>,
    redactions: &mut Vec<Redaction>,
) -> String {
    let prose = filter_definitions(prose, allowlist, redactions);
    let prose = filter_attributes(&prose, allowlist, redactions);
    if !prose.contains(':') && !prose.contains("www.") && !prose.contains("](") {
        return prose.into_owned();
    }
    LINK_RE
        .replace_all(&prose, |caps: &Captures<'_>| {
            if let Some(bare) = caps.name("bare") {
                return filter_bare(bare.as_str(), allowlist, redactions);
            }
            let bang = caps.name("bang").map_or("", |m| m.as_str());
            let text = caps.name("text").map_or("", |m| m.as_str());
            let url = caps.name("url").map_or("", |m| m.as_str());
            let title = caps.name("title").map_or("", |m| m.as_str());
            let text = filter_bare_in(text, allowlist, redactions);
            match check(url, allowlist) {
                None => format!("{bang}[{text}]({url}{title})"),
                Some(redaction) => {
                    redactions.push(redaction);
                    format!("{bang}[{text}]({URL_REDACTION})")
                }
            }
        })
        .into_owned()
}

fn filter_definitions<'t>(
    prose: &'t str,
    allowlist: Option<&DomainAllowlist>,
    redactions: &mut Vec<Redaction>,
) -> Cow<'t, str> {
    if !prose.contains("]:") {
        return Cow::Borrowed(prose);
    }
    DEFINITION_RE.replace_all(prose, |caps: &Captures<'_>| {
        let url = caps
            .name("angled")
            .or_else(|| caps.name("plain"))
            .map_or("", |m| m.as_str());
        match check(url, allowlist) {
            None => caps[0].to_string(),
            Some(redaction) => {
                redactions.push(redaction);
                format!("{}{URL_REDACTION}", &caps["lead"])
            }
        }
    })
}

fn filter_attributes<'t>(
    prose: &'t str,
    allowlist: Option<&DomainAllowlist>,
    redactions: &mut Vec<Redaction>,
) -> Cow<'t, str> {
    if !prose.contains('=') {
        return Cow::Borrowed(prose);
    }
    ATTRIBUTE_RE.replace_all(prose, |caps: &Captures<'_>| {
        let value = caps
            .name("dq")
            .or_else(|| caps.name("sq"))
            .or_else(|| caps.name("uq"))
            .map_or("", |m| m.as_str());
        // srcset holds `url descriptor` pairs separated by commas.
        let denied = value
            .split(',')
            .filter_map(|candidate| candidate.split_whitespace().next())
            .find_map(|url| check(url, allowlist));
        match denied {
            None => caps[0].to_string(),
            Some(redaction) => {
                redactions.push(redaction);
                format!("{}\"{URL_REDACTION}\"", &caps["lead"])
            }
        }
    })
}

fn filter_bare_in(
    text: &str,
    allowlist: Option<&DomainAllowlist>,
    redactions: &mut Vec<Redaction>,
) -> String {
    LINK_RE
        .replace_all(text, |caps: &Captures<'_>| match caps.name("bare") {
            Some(bare) => filter_bare(bare.as_str(), allowlist, redactions),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn filter_bare(
    matched: &str,
    allowlist: Option<&DomainAllowlist>,
    redactions: &mut Vec<Redaction>,
) -> String {
    let url = matched.trim_end_matches(TRAILING_PUNCTUATION);
    let trailing = &matched[url.len()..];
    // Bare text is only linkified for web schemes; without an allowlist
    // there is nothing to filter.
    if allowlist.is_none() {
        return matched.to_string();
    }
    let candidate = if url.len() >= 4 && url[..4].eq_ignore_ascii_case("www.") {
        format!("https://{url}")
    } else {
        url.to_string()
    };
    match check(&candidate, allowlist) {
        None => matched.to_string(),
        Some(mut redaction) => {
            redaction.span_len = url.chars().count();
            redactions.push(redaction);
            format!("({URL_REDACTION}){trailing}")
        }
    }
}

fn check(url: &str, allowlist: Option<&DomainAllowlist>) -> Option<Redaction> {
    let span_len = url.chars().count();
    match classify_url(url, allowlist) {
        LinkVerdict::Allowed => None,
        LinkVerdict::DangerousScheme(scheme) => Some(Redaction::new(
            RedactionKind::DangerousScheme,
            span_len,
            format!("'{}:' links are never allowed", echo_value(&scheme)),
        )),
        LinkVerdict::DisallowedHost(host) => Some(Redaction::new(
            RedactionKind::DisallowedUrl,
            span_len,
            format!("domain '{}' is not allowlisted", echo_value(&host)),
        )),
        LinkVerdict::Unverifiable => Some(Redaction::new(
            RedactionKind::DisallowedUrl,
            span_len,
            "link target could not be verified against the domain allowlist",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(domains: &[&str]) -> DomainAllowlist {
        let owned: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
        DomainAllowlist::new(&owned)
    }

    #[test]
    fn no_allowlist_keeps_web_links() {
        let mut log = Vec::new();
        let text = "[docs](https://anything.example/x) and https://other.example";
        assert_eq!(filter_links(text, None, &mut log), text);
        assert!(log.is_empty());
    }

    #[test]
    fn dangerous_schemes_are_always_redacted() {
        let mut log = Vec::new();
        let out = filter_links("[click](JavaScript:alert(1))", None, &mut log);
        assert_eq!(out, "[click](redacted)");
        assert_eq!(log[0].kind, RedactionKind::DangerousScheme);
    }

    #[test]
    fn allowlist_filters_markdown_links_and_images() {
        let list = allow(&["github.com"]);
        let mut log = Vec::new();
        let out = filter_links(
            "[ok](https://docs.github.com/a) ![img](https://evil.test/p.png \"t\")",
            Some(&list),
            &mut log,
        );
        assert_eq!(out, "[ok](https://docs.github.com/a) ![img](redacted)");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, RedactionKind::DisallowedUrl);
    }

    #[test]
    fn allowlist_filters_bare_urls_and_keeps_punctuation() {
        let list = allow(&["github.com"]);
        let mut log = Vec::new();
        let out = filter_links(
            "see https://evil.test/leak?d=1. or www.evil.test, or https://github.com/x.",
            Some(&list),
            &mut log,
        );
        assert_eq!(out, "see (redacted). or (redacted), or https://github.com/x.");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn relative_links_are_kept() {
        let list = allow(&["github.com"]);
        let mut log = Vec::new();
        let text = "[readme](./README.md) [anchor](#usage)";
        assert_eq!(filter_links(text, Some(&list), &mut log), text);
    }

    #[test]
    fn urls_in_link_text_are_filtered() {
        let list = allow(&["github.com"]);
        let mut log = Vec::new();
        let out = filter_links("[https://evil.test](https://github.com)", Some(&list), &mut log);
        assert_eq!(out, "[(redacted)](https://github.com)");
    }

    #[test]
    fn reference_definitions_are_filtered() {
        let list = allow(&["github.com"]);
        let mut log = Vec::new();
        let out = filter_links(
            "![a][1] [b][2]\n\n[1]: //evil.test/p.png?d=secret\n[2]: <https://github.com/x> \"ok\"",
            Some(&list),
            &mut log,
        );
        assert_eq!(
            out,
            "![a][1] [b][2]\n\n[1]: redacted\n[2]: <https://github.com/x> \"ok\""
        );
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, RedactionKind::DisallowedUrl);
    }

    #[test]
    fn html_attributes_are_filtered() {
        let list = allow(&["github.com"]);
        let mut log = Vec::new();
        let out = filter_links(
            "<img src=//evil.test/p.png?d=secret> <a href='https://github.com/x'>ok</a>",
            Some(&list),
            &mut log,
        );
        assert_eq!(
            out,
            "<img src=\"redacted\"> <a href='https://github.com/x'>ok</a>"
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn srcset_and_script_hrefs_are_filtered() {
        let list = allow(&["github.com"]);
        let mut log = Vec::new();
        let out = filter_links(
            r#"<img srcset="https://github.com/a.png 1x, //evil.test/b.png 2x">"#,
            Some(&list),
            &mut log,
        );
        assert_eq!(out, r#"<img srcset="redacted">"#);

        let mut log = Vec::new();
        let out = filter_links(r#"<a href="javascript:alert(1)">x</a>"#, None, &mut log);
        assert_eq!(out, r#"<a href="redacted">x</a>"#);
        assert_eq!(log[0].kind, RedactionKind::DangerousScheme);
    }

    #[test]
    fn filtering_is_stable() {
        let list = allow(&["github.com"]);
        let mut log = Vec::new();
        let once = filter_links("[x](https://evil.test) https://evil.test", Some(&list), &mut log);
        assert_eq!(filter_links(&once, Some(&list), &mut Vec::new()), once);
    }
}

use super::{Redaction, RedactionKind};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

/// `@user` or `@org/team`, not preceded by a character that would make it
/// part of an email address or path.
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^A-Za-z0-9_/@.])@([A-Za-z0-9](?:[A-Za-z0-9-]{0,38})(?:/[A-Za-z0-9][A-Za-z0-9_.-]*)?)")
        .unwrap()
});

/// Closing keywords that make the platform close the referenced issue.
static BOT_TRIGGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?)\s*:?\s+(?:[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+)?#(?:\d+|aw_[A-Za-z0-9]{3,12})\b",
    )
    .unwrap()
});

/// Wrap mentions in code spans so no notification is delivered.
///
/// A mention at the start of `prose` is always wrapped, even right after a
/// code span, since the platform still links it there.
pub(super) fn neutralize_mentions(
    prose: &str,
    allowed: &[String],
    redactions: &mut Vec<Redaction>,
) -> String {
    if !MENTION_RE.is_match(prose) {
        return prose.to_string();
    }
    let prose = escape_stray_backticks(prose);
    MENTION_RE
        .replace_all(&prose, |caps: &Captures<'_>| {
            let prefix = &caps[1];
            let name = &caps[2];
            if allowed.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                return caps[0].to_string();
            }
            redactions.push(Redaction::new(
                RedactionKind::Mention,
                name.chars().count() + 1,
                "mention wrapped in code span",
            ));
            format!("{prefix}`@{name}`")
        })
        .into_owned()
}

/// Wrap `fixes #12`-style phrases in code spans so merging or posting the
/// text does not close issues.
pub(super) fn neutralize_bot_triggers(prose: &str, redactions: &mut Vec<Redaction>) -> String {
    if !BOT_TRIGGER_RE.is_match(prose) {
        return prose.to_string();
    }
    let prose = escape_stray_backticks(prose);
    BOT_TRIGGER_RE
        .replace_all(&prose, |caps: &Captures<'_>| {
            let phrase = &caps[0];
            redactions.push(Redaction::new(
                RedactionKind::BotTrigger,
                phrase.chars().count(),
                "issue-closing keyword wrapped in code span",
            ));
            format!("`{phrase}`")
        })
        .into_owned()
}

/// Backticks left in prose are unmatched and render literally, but a code
/// span inserted next to one would pair with it. Escape them first.
fn escape_stray_backticks(prose: &str) -> Cow<'_, str> {
    if !prose.contains('`') {
        return Cow::Borrowed(prose);
    }
    let mut out = String::with_capacity(prose.len() + 4);
    let mut backslashes = 0usize;
    for c in prose.chars() {
        if c == '`' && backslashes % 2 == 0 {
            out.push('\\');
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
        out.push(c);
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentions(text: &str, allowed: &[&str]) -> (String, usize) {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        let mut log = Vec::new();
        let out = neutralize_mentions(text, &allowed, &mut log);
        (out, log.len())
    }

    #[test]
    fn wraps_user_and_team_mentions() {
        let (out, n) = mentions("@alice and @octo/reviewers, ping", &[]);
        assert_eq!(out, "`@alice` and `@octo/reviewers`, ping");
        assert_eq!(n, 2);
    }

    #[test]
    fn ignores_emails_and_paths() {
        let (out, n) = mentions("mail bob@example.com or see /path/@scope/pkg", &[]);
        assert_eq!(out, "mail bob@example.com or see /path/@scope/pkg");
        assert_eq!(n, 0);
    }

    #[test]
    fn allowlisted_mentions_pass_case_insensitively() {
        let (out, n) = mentions("thanks @Maintainer and @other", &["maintainer"]);
        assert_eq!(out, "thanks @Maintainer and `@other`");
        assert_eq!(n, 1);
    }

    #[test]
    fn adjacent_mentions_are_all_wrapped() {
        let (out, _) = mentions("@a @b\n@c", &[]);
        assert_eq!(out, "`@a` `@b`\n`@c`");
    }

    #[test]
    fn stray_backticks_cannot_pair_with_the_wrapper() {
        let (out, n) = mentions("ping `@bob now", &[]);
        assert_eq!(out, "ping \\``@bob` now");
        assert_eq!(n, 1);
        let (out, _) = mentions("a ` b @bob` c", &[]);
        assert_eq!(out, "a \\` b `@bob`\\` c");
    }

    #[test]
    fn escaped_backticks_are_left_alone() {
        let (out, _) = mentions(r"\`@bob\` please", &[]);
        assert_eq!(out, r"\``@bob`\` please");
    }

    #[test]
    fn wraps_closing_keywords() {
        let mut log = Vec::new();
        let out = neutralize_bot_triggers("This fixes #12 and Closes octo/app#3.", &mut log);
        assert_eq!(out, "This `fixes #12` and `Closes octo/app#3`.");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn plain_references_are_not_triggers() {
        let mut log = Vec::new();
        let out = neutralize_bot_triggers("See #12 and prefix#3", &mut log);
        assert_eq!(out, "See #12 and prefix#3");
        assert!(log.is_empty());
    }
}

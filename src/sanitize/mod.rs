//! Content sanitization for agent-authored free text.
//!
//! Stages run strictly in order; each closes a bypass that an earlier
//! ordering would reopen:
//!
//! 1. NFC normalization
//! 2. entity decoding (two levels at most)
//! 3. invisible / bidi control stripping
//! 4. full-width ASCII folding
//! 5. ANSI escape and control character removal
//! 6. hidden comment removal, mention and bot-trigger neutralization
//! 7. template delimiter escaping
//! 8. link domain filtering
//! 9. code regions: 6-8 only touch prose, 1-5 touch everything
//!
//! The result is lossy. Only the sanitized text and the redaction log survive.

mod ansi;
pub mod code_regions;
mod entities;
mod links;
mod markup;
mod mentions;
mod templates;
mod unicode;

use crate::authorize::DomainAllowlist;
use crate::config::SafeOutputsConfig;
use crate::error::SanitizeError;
use serde::{Deserialize, Serialize};

pub const TRUNCATION_MARKER: &str = "\n[Content truncated due to length]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RedactionKind {
    InvisibleCharacter,
    ControlSequence,
    HiddenComment,
    Mention,
    BotTrigger,
    TemplateDelimiter,
    DisallowedUrl,
    DangerousScheme,
    Truncated,
}

/// One neutralized span. The original text is not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redaction {
    pub kind: RedactionKind,
    /// Length of the original span in characters.
    pub span_len: usize,
    pub reason: String,
}

impl Redaction {
    pub fn new(kind: RedactionKind, span_len: usize, reason: impl Into<String>) -> Self {
        Self {
            kind,
            span_len,
            reason: reason.into(),
        }
    }

    /// Whether a URL was removed from the text.
    pub fn is_link(&self) -> bool {
        matches!(
            self.kind,
            RedactionKind::DisallowedUrl | RedactionKind::DangerousScheme
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    pub redactions: Vec<Redaction>,
}

/// Per-run sanitization settings.
#[derive(Debug, Clone)]
pub struct SanitizePolicy {
    /// Lowercased names (`user` or `org/team`) delivered as real mentions.
    pub allowed_mentions: Vec<String>,
    /// `None` disables domain filtering (executable schemes are still removed).
    pub allowed_domains: Option<DomainAllowlist>,
    pub max_length: usize,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self {
            allowed_mentions: Vec::new(),
            allowed_domains: None,
            max_length: 65_536,
        }
    }
}

impl SanitizePolicy {
    pub fn from_config(config: &SafeOutputsConfig) -> Self {
        Self {
            allowed_mentions: config
                .allowed_mentions
                .iter()
                .map(|m| m.trim().trim_start_matches('@').to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            allowed_domains: config.allowed_domains.as_deref().map(DomainAllowlist::new),
            max_length: config.sanitize.max_length,
        }
    }
}

/// Deterministic, side-effect-free text sanitizer.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    policy: SanitizePolicy,
}

impl Sanitizer {
    pub fn new(policy: SanitizePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SanitizePolicy {
        &self.policy
    }

    pub fn sanitize(&self, input: &str) -> Result<Sanitized, SanitizeError> {
        let mut redactions = Vec::new();

        let text = unicode::normalize(input);
        let text = entities::decode(&text)?;
        let text = unicode::normalize(&text);
        let text = unicode::strip_invisible(&text, &mut redactions);
        let text = unicode::fold_fullwidth(&text);
        let text = ansi::strip_control(&text, &mut redactions);
        // Stages 3-5 can splice an entity back together ("&\u{200B}#64;").
        entities::ensure_decoded(&text)?;

        let text = code_regions::map_prose(&text, |prose| {
            let prose = markup::strip_html_comments(prose, &mut redactions);
            let prose = mentions::neutralize_mentions(
                &prose,
                &self.policy.allowed_mentions,
                &mut redactions,
            );
            let prose = mentions::neutralize_bot_triggers(&prose, &mut redactions);
            let prose = templates::escape_delimiters(&prose, &mut redactions);
            links::filter_links(&prose, self.policy.allowed_domains.as_ref(), &mut redactions)
        });

        let text = truncate(text, self.policy.max_length, &mut redactions);
        Ok(Sanitized { text, redactions })
    }
}

fn truncate(text: String, max_length: usize, redactions: &mut Vec<Redaction>) -> String {
    let total = text.chars().count();
    if total <= max_length {
        return text;
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    let keep = if max_length > marker_len {
        max_length - marker_len
    } else {
        max_length
    };
    let mut truncated: String = text.chars().take(keep).collect();
    if keep < max_length {
        truncated.push_str(TRUNCATION_MARKER);
    }
    redactions.push(Redaction::new(
        RedactionKind::Truncated,
        total - keep,
        format!("content exceeded {max_length} characters"),
    ));
    truncated
}

use super::{IssueRef, TemporaryId};
use crate::authorize::RepoSlug;
use crate::resolve::TemporaryIdMap;
use crate::sanitize::code_regions::split_regions;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static TEMP_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#(aw_[a-z0-9]{3,12})\b").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Reference(IssueRef),
}

/// Free text whose in-body temporary references (`#aw_...`) are typed
/// segments rather than substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    segments: Vec<Segment>,
}

impl RichText {
    /// Unparsed text: a single literal segment.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self {
            segments: vec![Segment::Literal(text)],
        }
    }

    /// Split `text` into literals and temporary references, ignoring
    /// anything inside code regions.
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        for region in split_regions(text) {
            let chunk = &text[region.range.clone()];
            if region.is_code {
                literal.push_str(chunk);
                continue;
            }
            let mut last = 0;
            for caps in TEMP_REF_RE.captures_iter(chunk) {
                let Some(whole) = caps.get(0) else { continue };
                let preceded_by_word = chunk[..whole.start()]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric() || c == '/' || c == '&');
                let id = caps.get(1).and_then(|m| TemporaryId::parse(m.as_str()));
                let Some(id) = id.filter(|_| !preceded_by_word) else {
                    continue;
                };
                literal.push_str(&chunk[last..whole.start()]);
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Reference(IssueRef::Unresolved(id)));
                last = whole.end();
            }
            literal.push_str(&chunk[last..]);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Text as the agent wrote it (placeholders shown as `#aw_...`).
    pub fn source_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Reference(r) => r.to_string(),
            })
            .collect()
    }

    /// Final text for the platform, references rendered relative to
    /// `context`.
    pub fn render(&self, context: &RepoSlug) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Reference(IssueRef::Resolved(r)) => r.render_from(context),
                Segment::Reference(other) => other.to_string(),
            })
            .collect()
    }

    pub fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    pub fn referenced_ids(&self) -> BTreeSet<TemporaryId> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Reference(r) => r.temporary_id().cloned(),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    pub fn references_mut(&mut self) -> impl Iterator<Item = &mut IssueRef> {
        self.segments.iter_mut().filter_map(|segment| match segment {
            Segment::Reference(r) => Some(r),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder known to `map`. `false` if any remain.
    pub fn substitute(&mut self, map: &TemporaryIdMap) -> bool {
        let mut complete = true;
        for reference in self.references_mut() {
            complete &= reference.substitute(map);
        }
        complete
    }
}

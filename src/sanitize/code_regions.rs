//! Markdown code region detection.
//!
//! Fenced blocks (``` or ~~~, unclosed fences run to the end) and inline
//! code spans (matching backtick runs of equal length) are "code"; the rest
//! is prose.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Byte range into the source text.
    pub range: Range<usize>,
    pub is_code: bool,
}

/// Partition `text` into alternating prose and code regions covering it
/// entirely, in order.
pub fn split_regions(text: &str) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut prose_start = 0;
    let mut offset = 0;
    let mut open_fence: Option<(u8, usize, usize)> = None;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        match open_fence {
            None => {
                if let Some((marker, len)) = fence_opening(line) {
                    split_inline(text, prose_start..line_start, &mut regions);
                    open_fence = Some((marker, len, line_start));
                }
            }
            Some((marker, len, start)) => {
                if is_fence_closing(line, marker, len) {
                    regions.push(Region {
                        range: start..offset,
                        is_code: true,
                    });
                    open_fence = None;
                    prose_start = offset;
                }
            }
        }
    }

    match open_fence {
        Some((_, _, start)) => regions.push(Region {
            range: start..text.len(),
            is_code: true,
        }),
        None => split_inline(text, prose_start..text.len(), &mut regions),
    }
    regions
}

/// Rebuild `text`, passing each prose region through `f` and copying code
/// regions verbatim.
pub fn map_prose(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for region in split_regions(text) {
        let chunk = &text[region.range];
        if region.is_code {
            out.push_str(chunk);
        } else {
            out.push_str(&f(chunk));
        }
    }
    out
}

fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| &line[indent..])
}

fn leading_run(s: &str, marker: u8) -> usize {
    s.bytes().take_while(|b| *b == marker).count()
}

fn fence_opening(line: &str) -> Option<(u8, usize)> {
    let rest = strip_indent(line)?;
    let marker = *rest.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = leading_run(rest, marker);
    if len < 3 {
        return None;
    }
    if marker == b'`' && rest[len..].contains('`') {
        return None;
    }
    Some((marker, len))
}

fn is_fence_closing(line: &str, marker: u8, open_len: usize) -> bool {
    let Some(rest) = strip_indent(line) else {
        return false;
    };
    let len = leading_run(rest, marker);
    len >= open_len && rest[len..].trim().is_empty()
}

fn split_inline(text: &str, range: Range<usize>, regions: &mut Vec<Region>) {
    if range.is_empty() {
        return;
    }
    let base = range.start;
    let bytes = &text.as_bytes()[range.clone()];
    let mut prose_from = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        // An escaped backtick is literal; the rest of its run may still open.
        if is_escaped(bytes, i) {
            i += 1;
            continue;
        }
        let open_start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let open_len = i - open_start;
        if let Some(close_end) = find_closing_run(bytes, i, open_len) {
            if open_start > prose_from {
                regions.push(Region {
                    range: base + prose_from..base + open_start,
                    is_code: false,
                });
            }
            regions.push(Region {
                range: base + open_start..base + close_end,
                is_code: true,
            });
            prose_from = close_end;
            i = close_end;
        }
    }

    if prose_from < bytes.len() {
        regions.push(Region {
            range: base + prose_from..range.end,
            is_code: false,
        });
    }
}

/// Whether the byte at `pos` follows an odd number of backslashes.
fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    bytes[..pos].iter().rev().take_while(|b| **b == b'\\').count() % 2 == 1
}

/// End offset of the first backtick run of exactly `len` at or after `from`.
fn find_closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] != b'`' {
            j += 1;
            continue;
        }
        let run_start = j;
        while j < bytes.len() && bytes[j] == b'`' {
            j += 1;
        }
        if j - run_start == len {
            return Some(j);
        }
    }
    None
}

//! Line-level view of a note that hides everything wiki-links and tags are
//! not read from: the front-matter block, fenced code blocks and inline code
//! spans.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::iter::Enumerate;
use std::str::Lines;
use std::sync::OnceLock;

use regex::Regex;

use crate::frontmatter::block_len;

pub(crate) struct ProseLine<'a> {
    /// 1-based line number in the note.
    pub number: usize,
    pub original: &'a str,
    /// `original` with inline code spans blanked out. Byte offsets match.
    pub masked: Cow<'a, str>,
}

impl ProseLine<'_> {
    /// 1-based character column of a byte offset into `masked`.
    pub fn column(&self, offset: usize) -> usize {
        self.original
            .get(..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset)
            + 1
    }
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: u8,
    len: usize,
}

impl Fence {
    fn opens(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = *trimmed.as_bytes().first()?;
        if marker != b'`' && marker != b'~' {
            return None;
        }
        let len = trimmed.bytes().take_while(|b| *b == marker).count();
        if len < 3 {
            return None;
        }
        if marker == b'`' && trimmed[len..].contains('`') {
            return None;
        }
        Some(Self { marker, len })
    }

    fn closes(self, line: &str) -> bool {
        let trimmed = line.trim();
        let len = trimmed.bytes().take_while(|b| *b == self.marker).count();
        len >= self.len && len == trimmed.len()
    }
}

pub(crate) struct ProseLines<'a> {
    lines: Enumerate<Lines<'a>>,
    skip: usize,
    fence: Option<Fence>,
}

impl<'a> ProseLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            skip: block_len(text),
            fence: None,
        }
    }
}

impl<'a> Iterator for ProseLines<'a> {
    type Item = ProseLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for (idx, line) in self.lines.by_ref() {
            if idx < self.skip {
                continue;
            }
            if let Some(fence) = self.fence {
                if fence.closes(line) {
                    self.fence = None;
                }
                continue;
            }
            if let Some(fence) = Fence::opens(line) {
                self.fence = Some(fence);
                continue;
            }
            return Some(ProseLine {
                number: idx + 1,
                original: line,
                masked: mask_inline_code(line),
            });
        }
        None
    }
}

/// Replace every backtick code span with spaces, keeping byte offsets.
/// A backtick run with no closing run of the same length is literal text.
pub(crate) fn mask_inline_code(line: &str) -> Cow<'_, str> {
    if !line.contains('`') {
        return Cow::Borrowed(line);
    }

    let bytes = line.as_bytes();
    let mut masked = bytes.to_vec();
    let mut changed = false;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let run = backtick_run(bytes, i);
        let mut j = i + run;
        let mut close = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let other = backtick_run(bytes, j);
                if other == run {
                    close = Some(j);
                    break;
                }
                j += other;
            } else {
                j += 1;
            }
        }
        match close {
            Some(j) => {
                masked[i..j + run].fill(b' ');
                changed = true;
                i = j + run;
            }
            None => i += run,
        }
    }

    if !changed {
        return Cow::Borrowed(line);
    }
    String::from_utf8(masked)
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed(line))
}

fn backtick_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|b| **b == b'`').count()
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"(?:^|[\s(,])#([\p{L}\p{N}_/\-]+)").expect("tag pattern is valid")
    })
}

/// `#tag` tokens in prose. Purely numeric tokens (`#123`) are not tags.
pub(crate) fn inline_tags(text: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    for line in ProseLines::new(text) {
        for capture in tag_pattern().captures_iter(&line.masked) {
            let tag = &capture[1];
            if tag.chars().any(|ch| !ch.is_ascii_digit()) {
                tags.insert(tag.to_string());
            }
        }
    }
    tags
}

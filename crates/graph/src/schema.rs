use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::frontmatter::FrontMatter;
use crate::links::{LinkToken, scan_links};
use crate::markdown::inline_tags;

/// Position of a note inside a loaded vault (and inside its [`crate::Graph`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NoteId(pub usize);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One `[[...]]` occurrence, reduced to the title it resolves by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTarget {
    /// Final path segment of the target, without `.md`, anchor or alias.
    pub title: String,
    /// Everything between the brackets, as written.
    pub raw: String,
    /// Display text after `|`. Never used for resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Heading (`#Heading`) or block (`#^id`) reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    /// `![[...]]` transclusion rather than a plain link.
    pub embed: bool,
    /// 1-based line of the opening brackets.
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// `[[` with no closing `]]` on the same line.
    UnterminatedLink,
    /// `[[]]`, `[[|alias]]` or a target that is only a folder prefix.
    EmptyTarget,
}

impl WarningKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::UnterminatedLink => "unterminated wiki-link",
            Self::EmptyTarget => "empty wiki-link target",
        }
    }
}

/// A malformed link token. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub kind: WarningKind,
    pub line: usize,
    pub column: usize,
    /// Short excerpt of the offending text.
    pub snippet: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} near `{}`",
            self.line,
            self.column,
            self.kind.label(),
            self.snippet
        )
    }
}

/// A single Markdown file of the vault.
///
/// Built once from the file's text and never mutated afterwards; the link
/// list is the one parse of `text` every graph edge is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: NoteId,
    /// Path relative to the vault root.
    pub path: PathBuf,
    /// File name without extension. Not unique across folders.
    pub title: String,
    #[serde(skip)]
    pub text: String,
    pub front_matter: FrontMatter,
    pub tags: BTreeSet<String>,
    pub links: Vec<LinkTarget>,
    pub warnings: Vec<ParseWarning>,
}

impl Note {
    pub fn from_text(id: NoteId, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let text = text.into();
        let title = title_from_path(&path);
        let front_matter = FrontMatter::parse(&text);

        let mut links = Vec::new();
        let mut warnings = Vec::new();
        for token in scan_links(&text) {
            match token {
                LinkToken::Link(target) => links.push(target),
                LinkToken::Warning(warning) => warnings.push(warning),
            }
        }

        let mut tags = front_matter
            .tags()
            .into_iter()
            .map(normalize_tag)
            .filter(|tag| !tag.is_empty())
            .collect::<BTreeSet<_>>();
        tags.extend(inline_tags(&text));

        Self {
            id,
            path,
            title,
            text,
            front_matter,
            tags,
            links,
            warnings,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = normalize_tag(tag);
        self.tags.iter().any(|own| own.eq_ignore_ascii_case(&wanted))
    }

    /// Front matter `aliases`, the alternative names Obsidian shows for the note.
    pub fn aliases(&self) -> Vec<&str> {
        self.front_matter.aliases()
    }
}

/// Title of a note as wiki-links refer to it: the file stem.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub(crate) fn normalize_tag(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_string()
}

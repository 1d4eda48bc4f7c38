use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use vaultlink_config::CheckConfig;

use crate::graph::Graph;
use crate::schema::Note;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingLink {
    pub source: String,
    pub source_path: PathBuf,
    pub target: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateTitle {
    pub title: String,
    /// The note `[[title]]` resolves to.
    pub resolves_to: PathBuf,
    pub shadowed: Vec<PathBuf>,
}

/// Notes exempt from orphan reporting.
///
/// | Source          | Meaning                                               |
/// |-----------------|-------------------------------------------------------|
/// | `titles`        | Named explicitly (home page, top-level MOCs)          |
/// | `tags`          | Any note carrying one of these tags (`moc` by default)|
/// | front matter    | `entry_point: true` in the note itself                |
/// | `implicit_roots`| Notes that link to at least one other loaded note     |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoints {
    pub titles: BTreeSet<String>,
    pub tags: Vec<String>,
    pub implicit_roots: bool,
}

impl Default for EntryPoints {
    fn default() -> Self {
        Self {
            titles: BTreeSet::new(),
            tags: vec!["moc".to_string()],
            implicit_roots: true,
        }
    }
}

impl EntryPoints {
    /// No exemptions at all: every note without inbound links is an orphan.
    pub fn none() -> Self {
        Self {
            titles: BTreeSet::new(),
            tags: Vec::new(),
            implicit_roots: false,
        }
    }

    pub fn from_config(check: &CheckConfig) -> Self {
        Self {
            titles: check.entry_points.iter().cloned().collect(),
            tags: check.entry_tags.clone(),
            implicit_roots: check.implicit_roots,
        }
    }

    pub fn contains(&self, graph: &Graph, note: &Note) -> bool {
        if self.titles.contains(&note.title) || note.front_matter.is_entry_point() {
            return true;
        }
        if self.tags.iter().any(|tag| note.has_tag(tag)) {
            return true;
        }
        self.implicit_roots
            && graph
                .outbound(note.id)
                .any(|edge| edge.resolved.is_some_and(|target| target != note.id))
    }
}

/// Every edge whose target matches no loaded note title, in graph order.
pub fn find_dangling_links(graph: &Graph) -> Vec<DanglingLink> {
    graph
        .edges()
        .iter()
        .filter(|edge| edge.is_dangling())
        .filter_map(|edge| {
            let source = graph.note(edge.source)?;
            Some(DanglingLink {
                source: source.title.clone(),
                source_path: source.path.clone(),
                target: edge.target.title.clone(),
                line: edge.target.line,
            })
        })
        .collect()
}

/// Split dangling links into ones that really are broken and ones whose
/// target names an attachment file present in the vault (`![[diagram.png]]`).
pub fn split_attachment_links(
    dangling: Vec<DanglingLink>,
    attachments: &BTreeSet<String>,
) -> (Vec<DanglingLink>, Vec<DanglingLink>) {
    dangling
        .into_iter()
        .partition(|link| !attachments.contains(&link.target))
}

/// Notes no other note links to, minus the entry points.
pub fn find_orphan_notes<'g>(graph: &'g Graph, entry_points: &EntryPoints) -> Vec<&'g Note> {
    let orphans = graph
        .notes()
        .iter()
        .filter(|note| !graph.inbound(note.id).any(|edge| edge.source != note.id))
        .filter(|note| !entry_points.contains(graph, note))
        .collect::<Vec<_>>();
    debug!(count = orphans.len(), "orphan notes found");
    orphans
}

/// Titles shared by more than one note, sorted by title.
pub fn find_duplicate_titles(graph: &Graph) -> Vec<DuplicateTitle> {
    let mut duplicates = graph
        .titles()
        .filter(|(_, ids)| ids.len() > 1)
        .filter_map(|(title, ids)| {
            let mut paths = ids
                .iter()
                .filter_map(|id| graph.note(*id))
                .map(|note| note.path.clone());
            let resolves_to = paths.next()?;
            Some(DuplicateTitle {
                title: title.clone(),
                resolves_to,
                shadowed: paths.collect(),
            })
        })
        .collect::<Vec<_>>();
    duplicates.sort_by(|left, right| left.title.cmp(&right.title));
    duplicates
}

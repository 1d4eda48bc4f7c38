use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::graph::{Graph, build_graph};
use crate::integrity::{
    EntryPoints, find_dangling_links, find_duplicate_titles, find_orphan_notes,
    split_attachment_links,
};
use crate::report::{GraphDump, IntegrityReport, LinkCount, NoteLinks, NoteWarning, OrphanNote, VaultStats};
use crate::store::{LoadIssue, LoadOptions, LoadedVault, load_notes_with};

const MOST_LINKED_LIMIT: usize = 5;

/// A loaded vault and its link graph: the load → extract → build half of
/// the pipeline, ready for checks and queries.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    graph: Graph,
    attachments: BTreeSet<String>,
    issues: Vec<LoadIssue>,
}

impl Vault {
    pub async fn open(root: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let loaded = load_notes_with(root, options).await?;
        Ok(Self::from_loaded(loaded))
    }

    pub fn from_loaded(loaded: LoadedVault) -> Self {
        Self {
            root: loaded.root,
            graph: build_graph(loaded.notes),
            attachments: loaded.attachments,
            issues: loaded.issues,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    pub fn attachments(&self) -> &BTreeSet<String> {
        &self.attachments
    }

    pub fn check(&self, entry_points: &EntryPoints) -> IntegrityReport {
        let (dangling_links, attachment_links) =
            split_attachment_links(find_dangling_links(&self.graph), &self.attachments);
        let report = IntegrityReport {
            root: self.root.display().to_string(),
            generated_at: Utc::now(),
            note_count: self.graph.len(),
            edge_count: self.graph.edges().len(),
            dangling_links,
            attachment_links: attachment_links.len(),
            orphan_notes: find_orphan_notes(&self.graph, entry_points)
                .into_iter()
                .map(OrphanNote::from)
                .collect(),
            duplicate_titles: find_duplicate_titles(&self.graph),
            parse_warnings: self.parse_warnings(),
            load_issues: self.issues.clone(),
        };
        info!(
            dangling = report.dangling_links.len(),
            orphans = report.orphan_notes.len(),
            warnings = report.parse_warnings.len(),
            "integrity check finished"
        );
        report
    }

    pub fn stats(&self, entry_points: &EntryPoints) -> VaultStats {
        let edges = self.graph.edges();
        let attachment_links = edges
            .iter()
            .filter(|edge| edge.is_dangling() && self.attachments.contains(&edge.target.title))
            .count();
        let dangling_edges =
            edges.iter().filter(|edge| edge.is_dangling()).count() - attachment_links;
        let distinct_tags = self
            .graph
            .notes()
            .iter()
            .flat_map(|note| note.tags.iter())
            .collect::<BTreeSet<_>>()
            .len();

        let mut most_linked = self
            .graph
            .notes()
            .iter()
            .map(|note| LinkCount {
                title: note.title.clone(),
                inbound: self.graph.inbound(note.id).count(),
            })
            .filter(|count| count.inbound > 0)
            .collect::<Vec<_>>();
        most_linked.sort_by(|left, right| {
            right
                .inbound
                .cmp(&left.inbound)
                .then_with(|| left.title.cmp(&right.title))
        });
        most_linked.truncate(MOST_LINKED_LIMIT);

        VaultStats {
            notes: self.graph.len(),
            edges: edges.len(),
            resolved_edges: edges.len() - dangling_edges - attachment_links,
            dangling_edges,
            attachment_links,
            embeds: edges.iter().filter(|edge| edge.target.embed).count(),
            orphan_notes: find_orphan_notes(&self.graph, entry_points).len(),
            duplicate_titles: find_duplicate_titles(&self.graph).len(),
            parse_warnings: self
                .graph
                .notes()
                .iter()
                .map(|note| note.warnings.len())
                .sum(),
            load_issues: self.issues.len(),
            distinct_tags,
            most_linked,
        }
    }

    /// Links of the note `title` resolves to, or `None` if no note has it.
    pub fn note_links(&self, title: &str) -> Option<NoteLinks> {
        let note = self.graph.note_by_title(title)?;
        Some(NoteLinks::from_graph(&self.graph, note))
    }

    pub fn dump(&self) -> GraphDump<'_> {
        GraphDump {
            root: self.root.display().to_string(),
            notes: self.graph.notes(),
            edges: self.graph.edges(),
        }
    }

    fn parse_warnings(&self) -> Vec<NoteWarning> {
        self.graph
            .notes()
            .iter()
            .flat_map(|note| {
                note.warnings.iter().map(|warning| NoteWarning {
                    path: note.path.clone(),
                    warning: warning.clone(),
                })
            })
            .collect()
    }
}

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::{Edge, Graph};
use crate::integrity::{DanglingLink, DuplicateTitle};
use crate::schema::{Note, ParseWarning};
use crate::store::LoadIssue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanNote {
    pub title: String,
    pub path: PathBuf,
}

impl From<&Note> for OrphanNote {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            path: note.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteWarning {
    pub path: PathBuf,
    #[serde(flatten)]
    pub warning: ParseWarning,
}

/// Everything a maintenance run found, in one value.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub root: String,
    pub generated_at: DateTime<Utc>,
    pub note_count: usize,
    pub edge_count: usize,
    pub dangling_links: Vec<DanglingLink>,
    /// Links to attachment files that exist, such as embedded images.
    pub attachment_links: usize,
    pub orphan_notes: Vec<OrphanNote>,
    pub duplicate_titles: Vec<DuplicateTitle>,
    pub parse_warnings: Vec<NoteWarning>,
    pub load_issues: Vec<LoadIssue>,
}

impl IntegrityReport {
    pub fn has_dangling_links(&self) -> bool {
        !self.dangling_links.is_empty()
    }

    pub fn has_orphans(&self) -> bool {
        !self.orphan_notes.is_empty()
    }

    /// Dangling links always fail a check; orphans only when asked to.
    pub fn passes(&self, fail_on_orphans: bool) -> bool {
        !self.has_dangling_links() && !(fail_on_orphans && self.has_orphans())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self, fail_on_orphans: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "vault: {}", self.root);
        let _ = writeln!(
            out,
            "notes: {}  links: {}  attachment links: {}",
            self.note_count, self.edge_count, self.attachment_links
        );

        section(&mut out, "dangling links", &self.dangling_links, |link| {
            format!(
                "{}:{} -> [[{}]]",
                link.source_path.display(),
                link.line,
                link.target
            )
        });
        section(&mut out, "orphan notes", &self.orphan_notes, |orphan| {
            orphan.path.display().to_string()
        });
        section(&mut out, "duplicate titles", &self.duplicate_titles, |dup| {
            let shadowed = dup
                .shadowed
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{} -> {} (shadows {shadowed})",
                dup.title,
                dup.resolves_to.display()
            )
        });
        section(&mut out, "parse warnings", &self.parse_warnings, |item| {
            format!("{}:{}", item.path.display(), item.warning)
        });
        section(&mut out, "unreadable files", &self.load_issues, |issue| {
            format!("{}: {}", issue.path.display(), issue.message)
        });

        out.push('\n');
        if self.passes(fail_on_orphans) {
            out.push_str("result: ok\n");
        } else {
            let _ = writeln!(
                out,
                "result: FAIL ({} dangling links, {} orphan notes)",
                self.dangling_links.len(),
                self.orphan_notes.len()
            );
        }
        out
    }
}

fn section<T>(out: &mut String, label: &str, items: &[T], line: impl Fn(&T) -> String) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n── {label} ({}) ──", items.len());
    for item in items {
        let _ = writeln!(out, "  {}", line(item));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCount {
    pub title: String,
    pub inbound: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultStats {
    pub notes: usize,
    pub edges: usize,
    pub resolved_edges: usize,
    pub dangling_edges: usize,
    pub attachment_links: usize,
    pub embeds: usize,
    pub orphan_notes: usize,
    pub duplicate_titles: usize,
    pub parse_warnings: usize,
    pub load_issues: usize,
    pub distinct_tags: usize,
    pub most_linked: Vec<LinkCount>,
}

impl VaultStats {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("── vault stats ─────────────────────────────────────\n");
        for (label, value) in [
            ("notes", self.notes),
            ("links", self.edges),
            ("resolved", self.resolved_edges),
            ("dangling", self.dangling_edges),
            ("attachments", self.attachment_links),
            ("embeds", self.embeds),
            ("orphans", self.orphan_notes),
            ("duplicate titles", self.duplicate_titles),
            ("parse warnings", self.parse_warnings),
            ("unreadable files", self.load_issues),
            ("distinct tags", self.distinct_tags),
        ] {
            let _ = writeln!(out, "  {label:<17}: {value}");
        }
        if !self.most_linked.is_empty() {
            out.push_str("  most linked:\n");
            for entry in &self.most_linked {
                let _ = writeln!(out, "    {} ({})", entry.title, entry.inbound);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundLink {
    pub target: String,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    pub embed: bool,
    /// Path of the note the link resolves to; `None` when dangling.
    pub resolved: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backlink {
    pub source: String,
    pub path: PathBuf,
    pub line: usize,
}

/// Neighbourhood of a single note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteLinks {
    pub title: String,
    pub path: PathBuf,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    pub outbound: Vec<OutboundLink>,
    pub inbound: Vec<Backlink>,
}

impl NoteLinks {
    pub fn from_graph(graph: &Graph, note: &Note) -> Self {
        let outbound = graph
            .outbound(note.id)
            .map(|edge| OutboundLink {
                target: edge.target.title.clone(),
                line: edge.target.line,
                anchor: edge.target.anchor.clone(),
                embed: edge.target.embed,
                resolved: edge
                    .resolved
                    .and_then(|id| graph.note(id))
                    .map(|target| target.path.clone()),
            })
            .collect();
        let inbound = graph
            .inbound(note.id)
            .filter_map(|edge| {
                let source = graph.note(edge.source)?;
                Some(Backlink {
                    source: source.title.clone(),
                    path: source.path.clone(),
                    line: edge.target.line,
                })
            })
            .collect();

        Self {
            title: note.title.clone(),
            path: note.path.clone(),
            aliases: note.aliases().into_iter().map(str::to_string).collect(),
            tags: note.tags.iter().cloned().collect(),
            outbound,
            inbound,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", self.title, self.path.display());
        if !self.aliases.is_empty() {
            let _ = writeln!(out, "  aliases: {}", self.aliases.join(", "));
        }
        if !self.tags.is_empty() {
            let _ = writeln!(out, "  tags: {}", self.tags.join(", "));
        }

        let _ = writeln!(out, "\n── outbound ({}) ──", self.outbound.len());
        for link in &self.outbound {
            let target = match &link.anchor {
                Some(anchor) => format!("{}#{anchor}", link.target),
                None => link.target.clone(),
            };
            let marker = if link.embed { "!" } else { "" };
            let resolved = link
                .resolved
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "(dangling)".to_string());
            let _ = writeln!(out, "  {}: {marker}[[{target}]] -> {resolved}", link.line);
        }

        let _ = writeln!(out, "\n── inbound ({}) ──", self.inbound.len());
        for backlink in &self.inbound {
            let _ = writeln!(out, "  {}:{}", backlink.path.display(), backlink.line);
        }
        out
    }
}

/// Serializable view of the whole graph.
#[derive(Debug, Serialize)]
pub struct GraphDump<'a> {
    pub root: String,
    pub notes: &'a [Note],
    pub edges: &'a [Edge],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::schema::{NoteId, WarningKind};

    fn report() -> IntegrityReport {
        IntegrityReport {
            root: "vault".to_string(),
            generated_at: Utc::now(),
            note_count: 2,
            edge_count: 2,
            dangling_links: vec![DanglingLink {
                source: "A".to_string(),
                source_path: PathBuf::from("A.md"),
                target: "C".to_string(),
                line: 1,
            }],
            attachment_links: 0,
            orphan_notes: Vec::new(),
            duplicate_titles: Vec::new(),
            parse_warnings: vec![NoteWarning {
                path: PathBuf::from("A.md"),
                warning: ParseWarning {
                    kind: WarningKind::UnterminatedLink,
                    line: 2,
                    column: 1,
                    snippet: "[[oops".to_string(),
                },
            }],
            load_issues: Vec::new(),
        }
    }

    #[test]
    fn text_report_lists_findings() {
        let text = report().render_text(false);
        assert!(text.contains("── dangling links (1) ──"));
        assert!(text.contains("A.md:1 -> [[C]]"));
        assert!(text.contains("A.md:2:1: unterminated wiki-link near `[[oops`"));
        assert!(!text.contains("orphan notes ("));
        assert!(text.contains("result: FAIL"));
    }

    #[test]
    fn orphans_fail_only_when_requested() {
        let mut report = report();
        report.dangling_links.clear();
        report.orphan_notes.push(OrphanNote {
            title: "Stray".to_string(),
            path: PathBuf::from("Stray.md"),
        });
        assert!(report.passes(false));
        assert!(!report.passes(true));
        assert!(report.render_text(false).ends_with("result: ok\n"));
    }

    #[test]
    fn json_report_flattens_warnings() {
        let json = report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dangling_links"][0]["target"], "C");
        assert_eq!(value["parse_warnings"][0]["kind"], "unterminated-link");
        assert_eq!(value["parse_warnings"][0]["path"], "A.md");
    }

    #[test]
    fn note_links_view() {
        let graph = build_graph(vec![
            Note::from_text(NoteId(0), "A.md", "[[B#Intro]]\n![[C]]"),
            Note::from_text(NoteId(0), "B.md", "---\naliases: [Bee]\n---\n[[A]]"),
        ]);
        let a = graph.note_by_title("A").unwrap();
        let view = NoteLinks::from_graph(&graph, a);
        assert_eq!(view.outbound.len(), 2);
        assert_eq!(view.outbound[0].resolved, Some(PathBuf::from("B.md")));
        assert_eq!(view.outbound[0].anchor.as_deref(), Some("Intro"));
        assert!(view.outbound[1].embed);
        assert_eq!(view.outbound[1].resolved, None);
        assert_eq!(view.inbound.len(), 1);
        assert_eq!(view.inbound[0].source, "B");
        assert_eq!(view.inbound[0].line, 4);

        let text = view.render_text();
        assert!(text.contains("1: [[B#Intro]] -> B.md"));
        assert!(text.contains("2: ![[C]] -> (dangling)"));

        let b = NoteLinks::from_graph(&graph, graph.note_by_title("B").unwrap());
        assert_eq!(b.aliases, vec!["Bee".to_string()]);
    }
}

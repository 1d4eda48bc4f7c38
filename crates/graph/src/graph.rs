use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::schema::{LinkTarget, Note, NoteId};

/// One extracted link occurrence. Unresolved targets stay in the graph as
/// dangling edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: NoteId,
    pub target: LinkTarget,
    pub resolved: Option<NoteId>,
}

impl Edge {
    pub fn is_dangling(&self) -> bool {
        self.resolved.is_none()
    }
}

/// Bidirectional link graph over a loaded note set.
///
/// Outbound edge lists mirror each note's parsed links one to one, in text
/// order. Inbound lists are derived from resolved edges only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    notes: Vec<Note>,
    edges: Vec<Edge>,
    outbound: Vec<Vec<usize>>,
    inbound: Vec<Vec<usize>>,
    by_title: HashMap<String, Vec<NoteId>>,
}

/// Resolve every note's links against the title index.
///
/// Note ids are reassigned to match their position in `notes`. When several
/// notes share a title, the first one in `notes` is the one links resolve to.
pub fn build_graph(mut notes: Vec<Note>) -> Graph {
    let mut by_title: HashMap<String, Vec<NoteId>> = HashMap::new();
    for (idx, note) in notes.iter_mut().enumerate() {
        note.id = NoteId(idx);
        by_title.entry(note.title.clone()).or_default().push(note.id);
    }

    let mut edges = Vec::new();
    let mut outbound = vec![Vec::new(); notes.len()];
    let mut inbound = vec![Vec::new(); notes.len()];

    for note in &notes {
        for target in &note.links {
            let resolved = by_title
                .get(&target.title)
                .and_then(|ids| ids.first().copied());
            let edge_idx = edges.len();
            outbound[note.id.0].push(edge_idx);
            if let Some(target_id) = resolved {
                inbound[target_id.0].push(edge_idx);
            }
            edges.push(Edge {
                source: note.id,
                target: target.clone(),
                resolved,
            });
        }
    }

    debug!(
        notes = notes.len(),
        edges = edges.len(),
        dangling = edges.iter().filter(|edge| edge.is_dangling()).count(),
        "link graph built"
    );

    Graph {
        notes,
        edges,
        outbound,
        inbound,
        by_title,
    }
}

impl Graph {
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id.0)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// The note a `[[title]]` link resolves to: exact, case-sensitive match,
    /// first registration wins.
    pub fn note_by_title(&self, title: &str) -> Option<&Note> {
        self.by_title
            .get(title)
            .and_then(|ids| ids.first())
            .and_then(|id| self.note(*id))
    }

    /// Every note carrying `title`, in registration order.
    pub fn notes_titled(&self, title: &str) -> &[NoteId] {
        self.by_title.get(title).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_title(&self, title: &str) -> bool {
        self.by_title.contains_key(title)
    }

    pub(crate) fn titles(&self) -> impl Iterator<Item = (&String, &Vec<NoteId>)> {
        self.by_title.iter()
    }

    pub fn outbound(&self, id: NoteId) -> impl Iterator<Item = &Edge> {
        self.edge_list(&self.outbound, id)
    }

    pub fn inbound(&self, id: NoteId) -> impl Iterator<Item = &Edge> {
        self.edge_list(&self.inbound, id)
    }

    /// Targets of a note's outbound edges, as `extract_links` found them.
    pub fn outbound_targets(&self, id: NoteId) -> Vec<&str> {
        self.outbound(id)
            .map(|edge| edge.target.title.as_str())
            .collect()
    }

    fn edge_list<'a>(
        &'a self,
        lists: &'a [Vec<usize>],
        id: NoteId,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        lists
            .get(id.0)
            .into_iter()
            .flatten()
            .map(|idx| &self.edges[*idx])
    }
}

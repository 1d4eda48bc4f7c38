pub mod error;
pub mod frontmatter;
pub mod graph;
pub mod integrity;
pub mod links;
mod markdown;
pub mod report;
pub mod schema;
pub mod store;
pub mod vault;

pub use error::{Result, VaultError};
pub use graph::{Edge, Graph, build_graph};
pub use integrity::{
    DanglingLink, DuplicateTitle, EntryPoints, find_dangling_links, find_duplicate_titles,
    find_orphan_notes, split_attachment_links,
};
pub use links::{LinkToken, extract_links, scan_links};
pub use report::{IntegrityReport, NoteLinks, VaultStats};
pub use schema::{LinkTarget, Note, NoteId, ParseWarning, WarningKind};
pub use store::{LoadIssue, LoadOptions, LoadedVault, load_notes, load_notes_with};
pub use vault::Vault;

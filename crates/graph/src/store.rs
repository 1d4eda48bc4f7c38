use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use vaultlink_config::VaultConfig;

use crate::error::{Result, VaultError};
use crate::schema::{Note, NoteId};

/// Which files under the vault root count as notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// File extensions without the dot, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Descend into dot-directories and read dot-files (`.obsidian/`, `.trash/`).
    pub include_hidden: bool,
    /// Glob patterns matched against the path relative to the root.
    pub exclude: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            include_hidden: false,
            exclude: Vec::new(),
        }
    }
}

impl LoadOptions {
    pub fn from_config(vault: &VaultConfig) -> Self {
        Self {
            extensions: vault.extensions.clone(),
            include_hidden: vault.include_hidden,
            exclude: vault.exclude.clone(),
        }
    }

    fn exclude_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|source| VaultError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| VaultError::InvalidPattern {
            pattern: self.exclude.join(", "),
            source,
        })
    }

    fn wants_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
            })
    }
}

/// A file that was found but could not be turned into a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadIssue {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedVault {
    pub root: PathBuf,
    /// Sorted by relative path; `notes[i].id == NoteId(i)`.
    pub notes: Vec<Note>,
    /// File names of the non-note files under the root (images, PDFs),
    /// the targets `![[diagram.png]]` embeds point at.
    pub attachments: BTreeSet<String>,
    pub issues: Vec<LoadIssue>,
}

pub async fn load_notes(root: impl AsRef<Path>) -> Result<LoadedVault> {
    load_notes_with(root, &LoadOptions::default()).await
}

/// Read every note under `root`.
///
/// Only a missing or unlistable root is an error. Files that cannot be read
/// or are not UTF-8 are skipped and reported in [`LoadedVault::issues`].
pub async fn load_notes_with(root: impl AsRef<Path>, options: &LoadOptions) -> Result<LoadedVault> {
    let root = root.as_ref().to_path_buf();
    let metadata = tokio::fs::metadata(&root).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            VaultError::RootNotFound(root.clone())
        } else {
            VaultError::Io {
                path: root.clone(),
                source,
            }
        }
    })?;
    if !metadata.is_dir() {
        return Err(VaultError::NotADirectory(root));
    }

    let VaultListing {
        paths,
        attachments,
        mut issues,
    } = list_vault(&root, options)?;
    debug!(
        root = %root.display(),
        files = paths.len(),
        attachments = attachments.len(),
        "reading vault notes"
    );

    let mut reads = JoinSet::new();
    let mut pending = HashMap::new();
    for relative in paths {
        let absolute = root.join(&relative);
        let handle = reads.spawn(async move { read_note_text(&absolute).await });
        pending.insert(handle.id(), relative);
    }

    let (mut texts, read_issues) = join_reads(reads, pending).await;
    issues.extend(read_issues);

    texts.sort_by(|left, right| left.0.cmp(&right.0));
    issues.sort_by(|left, right| left.path.cmp(&right.path));

    let notes = texts
        .into_iter()
        .enumerate()
        .map(|(idx, (relative, text))| Note::from_text(NoteId(idx), relative, text))
        .collect::<Vec<_>>();

    info!(
        root = %root.display(),
        notes = notes.len(),
        issues = issues.len(),
        "vault loaded"
    );

    Ok(LoadedVault {
        root,
        notes,
        attachments,
        issues,
    })
}

type NoteRead = std::result::Result<String, String>;

/// Drain the read tasks, pairing each outcome with its relative path.
/// A task that panicked or was cancelled becomes a [`LoadIssue`] like any
/// other unreadable file.
async fn join_reads(
    mut reads: JoinSet<NoteRead>,
    mut pending: HashMap<task::Id, PathBuf>,
) -> (Vec<(PathBuf, String)>, Vec<LoadIssue>) {
    let mut texts = Vec::new();
    let mut issues = Vec::new();
    while let Some(joined) = reads.join_next_with_id().await {
        let (id, read) = match joined {
            Ok((id, read)) => (id, read),
            Err(err) => (err.id(), Err(format!("read task failed: {err}"))),
        };
        let Some(relative) = pending.remove(&id) else {
            warn!(task = %id, "read finished for an unknown task");
            continue;
        };
        match read {
            Ok(text) => texts.push((relative, text)),
            Err(message) => {
                warn!(path = %relative.display(), %message, "skipping unreadable note");
                issues.push(LoadIssue {
                    path: relative,
                    message,
                });
            }
        }
    }
    (texts, issues)
}

async fn read_note_text(path: &Path) -> NoteRead {
    let bytes = tokio::fs::read(path).await.map_err(|err| err.to_string())?;
    let text = String::from_utf8(bytes).map_err(|_| "not valid UTF-8".to_string())?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

struct VaultListing {
    /// Relative paths of every candidate note, sorted.
    paths: Vec<PathBuf>,
    attachments: BTreeSet<String>,
    /// Walk failures below the root.
    issues: Vec<LoadIssue>,
}

fn list_vault(root: &Path, options: &LoadOptions) -> Result<VaultListing> {
    let excluded = options.exclude_set()?;
    let mut paths = Vec::new();
    let mut attachments = BTreeSet::new();
    let mut issues = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || options.include_hidden || !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(VaultError::Io {
                    path: root.to_path_buf(),
                    source: err.into(),
                });
            }
            Err(err) => {
                let path = err
                    .path()
                    .and_then(|path| path.strip_prefix(root).ok())
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                warn!(path = %path.display(), error = %err, "skipping unreadable vault entry");
                issues.push(LoadIssue {
                    path,
                    message: err.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if excluded.is_match(relative) {
            debug!(path = %relative.display(), "excluded by pattern");
            continue;
        }
        if options.wants_extension(entry.path()) {
            paths.push(relative.to_path_buf());
        } else {
            attachments.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }

    paths.sort();
    Ok(VaultListing {
        paths,
        attachments,
        issues,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use vaultlink_config::AppConfig;

    use super::*;

    fn write(root: &Path, relative: &str, text: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    fn titles(vault: &LoadedVault) -> Vec<&str> {
        vault.notes.iter().map(|note| note.title.as_str()).collect()
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = load_notes(dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, VaultError::RootNotFound(_)));
    }

    #[tokio::test]
    async fn file_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "note.md", "x");
        let err = load_notes(dir.path().join("note.md")).await.unwrap_err();
        assert!(matches!(err, VaultError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn loads_markdown_recursively_in_path_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Zeta.md", "[[Alpha]]");
        write(dir.path(), "dev/node/Express.md", "# Express");
        write(dir.path(), "Alpha.MD", "");
        write(dir.path(), "image.png", "not a note");
        write(dir.path(), "README.txt", "");

        let vault = load_notes(dir.path()).await.unwrap();
        assert_eq!(titles(&vault), vec!["Alpha", "Zeta", "Express"]);
        assert_eq!(vault.notes[2].path, PathBuf::from("dev/node/Express.md"));
        assert_eq!(
            vault.attachments.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["README.txt", "image.png"]
        );
        for (idx, note) in vault.notes.iter().enumerate() {
            assert_eq!(note.id, NoteId(idx));
        }
        assert!(vault.issues.is_empty());
    }

    #[tokio::test]
    async fn hidden_entries_skipped_unless_requested() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".obsidian/workspace.md", "");
        write(dir.path(), ".draft.md", "");
        write(dir.path(), "Visible.md", "");

        let vault = load_notes(dir.path()).await.unwrap();
        assert_eq!(titles(&vault), vec!["Visible"]);

        let options = LoadOptions {
            include_hidden: true,
            ..LoadOptions::default()
        };
        let vault = load_notes_with(dir.path(), &options).await.unwrap();
        assert_eq!(vault.notes.len(), 3);
    }

    #[tokio::test]
    async fn exclude_patterns_apply_to_relative_paths() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "templates/Daily.md", "[[{{date}}]]");
        write(dir.path(), "notes/Vue.md", "");

        let options = LoadOptions {
            exclude: vec!["templates/**".to_string()],
            ..LoadOptions::default()
        };
        let vault = load_notes_with(dir.path(), &options).await.unwrap();
        assert_eq!(titles(&vault), vec!["Vue"]);
    }

    #[tokio::test]
    async fn default_config_loads_template_notes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "templates/Express.md", "# Express");
        write(dir.path(), "Home.md", "[[Express]]");

        let options = LoadOptions::from_config(&AppConfig::default().vault);
        assert_eq!(options, LoadOptions::default());
        let vault = load_notes_with(dir.path(), &options).await.unwrap();
        assert_eq!(titles(&vault), vec!["Home", "Express"]);
        assert!(vault.issues.is_empty());
    }

    async fn fail_read() -> NoteRead {
        panic!("disk went away")
    }

    #[tokio::test]
    async fn failed_read_task_becomes_issue() {
        let mut reads = JoinSet::new();
        let mut pending = HashMap::new();
        let handle = reads.spawn(async { Ok("[[B]]".to_string()) });
        pending.insert(handle.id(), PathBuf::from("A.md"));
        let handle = reads.spawn(fail_read());
        pending.insert(handle.id(), PathBuf::from("Lost.md"));

        let (texts, issues) = join_reads(reads, pending).await;
        assert_eq!(texts, vec![(PathBuf::from("A.md"), "[[B]]".to_string())]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, PathBuf::from("Lost.md"));
        assert!(issues[0].message.contains("read task failed"));
    }

    #[tokio::test]
    async fn invalid_pattern_is_reported() {
        let dir = TempDir::new().unwrap();
        let options = LoadOptions {
            exclude: vec!["[unclosed".to_string()],
            ..LoadOptions::default()
        };
        let err = load_notes_with(dir.path(), &options).await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn non_utf8_file_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Binary.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        write(dir.path(), "Good.md", "[[Binary]]");

        let vault = load_notes(dir.path()).await.unwrap();
        assert_eq!(titles(&vault), vec!["Good"]);
        assert_eq!(vault.issues.len(), 1);
        assert_eq!(vault.issues[0].path, PathBuf::from("Binary.md"));
        assert!(vault.issues[0].message.contains("UTF-8"));
    }

    #[tokio::test]
    async fn byte_order_mark_is_stripped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Bom.md", "\u{feff}---\ntags: [moc]\n---\n[[X]]");
        let vault = load_notes(dir.path()).await.unwrap();
        assert!(vault.notes[0].has_tag("moc"));
        assert_eq!(vault.notes[0].links[0].line, 4);
    }
}

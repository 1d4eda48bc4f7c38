use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `vault.root`.
pub const ROOT_ENV: &str = "VAULTLINK_ROOT";
/// Environment variable overriding `telemetry.log_level`.
pub const LOG_ENV: &str = "VAULTLINK_LOG";

// ── Report format ─────────────────────────────────────────────────────────────

/// How command output is printed.
///
/// | Format | Use                                         |
/// |--------|---------------------------------------------|
/// | `text` | Human-readable sections on stdout           |
/// | `json` | One pretty-printed JSON document, for CI    |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

// ── Vault ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Vault directory.  Relative paths resolve against the working directory.
    pub root: String,
    /// Extensions (without the dot) of files treated as notes.
    pub extensions: Vec<String>,
    /// Read dot-files and dot-directories such as `.obsidian/`.
    pub include_hidden: bool,
    /// Glob patterns, relative to the root, of files that are never loaded.
    pub exclude: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            extensions: vec!["md".to_string()],
            include_hidden: false,
            exclude: Vec::new(),
        }
    }
}

// ── Check ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Note titles never reported as orphans (home page, top-level MOCs).
    pub entry_points: Vec<String>,
    /// Notes carrying any of these tags are entry points too.
    pub entry_tags: Vec<String>,
    /// Treat a note that links to another loaded note as a navigation root
    /// even when nothing links back to it.
    pub implicit_roots: bool,
    /// Make `check` fail when orphan notes exist, not only on dangling links.
    pub fail_on_orphans: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            entry_points: Vec::new(),
            entry_tags: vec!["moc".to_string()],
            implicit_roots: true,
            fail_on_orphans: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub vault: VaultConfig,
    pub check: CheckConfig,
    pub report: ReportConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load from a TOML file; a missing file yields the defaults.  Environment
    /// overrides are applied on top.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?;
        }

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply `VAULTLINK_*` overrides; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup(ROOT_ENV).filter(|value| !value.is_empty()) {
            self.vault.root = root;
        }
        if let Some(level) = lookup(LOG_ENV).filter(|value| !value.is_empty()) {
            self.telemetry.log_level = level;
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.vault.root, ".");
        assert_eq!(cfg.vault.extensions, vec!["md".to_string()]);
        assert!(!cfg.vault.include_hidden);
        assert!(cfg.vault.exclude.is_empty());
        assert!(cfg.check.entry_points.is_empty());
        assert_eq!(cfg.check.entry_tags, vec!["moc".to_string()]);
        assert!(cfg.check.implicit_roots);
        assert!(!cfg.check.fail_on_orphans);
        assert_eq!(cfg.report.format, ReportFormat::Text);
        assert_eq!(cfg.telemetry.log_level, "warn");
    }

    // ── load_from ──────────────────────────────────────────────────────────

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(cfg.check.entry_tags, vec!["moc".to_string()]);
        assert_eq!(cfg.report.format, ReportFormat::Text);
    }

    #[test]
    fn load_from_valid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vaultlink.toml");
        fs::write(
            &path,
            r#"
[vault]
extensions = ["md", "markdown"]
include_hidden = true
exclude = [".trash/**"]

[check]
entry_points = ["Home", "Dev MOC"]
implicit_roots = false
fail_on_orphans = true

[report]
format = "json"
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.vault.extensions, vec!["md", "markdown"]);
        assert!(cfg.vault.include_hidden);
        assert_eq!(cfg.vault.exclude, vec![".trash/**"]);
        assert_eq!(cfg.check.entry_points, vec!["Home", "Dev MOC"]);
        assert!(!cfg.check.implicit_roots);
        assert!(cfg.check.fail_on_orphans);
        assert_eq!(cfg.report.format, ReportFormat::Json);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.check.entry_tags, vec!["moc".to_string()]);
    }

    #[test]
    fn load_from_invalid_toml_returns_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid config file"));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("format.toml");
        fs::write(&path, "[report]\nformat = \"yaml\"\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    // ── save_to + roundtrip ────────────────────────────────────────────────

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/vaultlink.toml");

        let mut cfg = AppConfig::default();
        cfg.check.entry_points = vec!["Index".to_string()];
        cfg.check.fail_on_orphans = true;
        cfg.report.format = ReportFormat::Json;

        cfg.save_to(&path).unwrap();
        assert!(path.exists());

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.check.entry_points, vec!["Index".to_string()]);
        assert!(loaded.check.fail_on_orphans);
        assert_eq!(loaded.report.format, ReportFormat::Json);
    }

    // ── Env overrides ──────────────────────────────────────────────────────

    #[test]
    fn env_overrides_root_and_log_level() {
        let vars = HashMap::from([
            (ROOT_ENV, "/vaults/dev".to_string()),
            (LOG_ENV, "debug".to_string()),
        ]);
        let mut cfg = AppConfig::default();
        cfg.apply_env(|key| vars.get(key).cloned());
        assert_eq!(cfg.vault.root, "/vaults/dev");
        assert_eq!(cfg.telemetry.log_level, "debug");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(|_| Some(String::new()));
        assert_eq!(cfg.vault.root, ".");
        assert_eq!(cfg.telemetry.log_level, "warn");
    }

    #[test]
    fn report_format_serde_roundtrip() {
        for (format, label) in [(ReportFormat::Text, "\"text\""), (ReportFormat::Json, "\"json\"")] {
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, label);
            let back: ReportFormat = serde_json::from_str(&json).unwrap();
            assert_eq!(back, format);
        }
    }
}

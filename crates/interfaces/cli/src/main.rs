mod check_cmds;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use vaultlink_config::{AppConfig, ReportFormat};
use vaultlink_graph::{EntryPoints, LoadOptions, Vault};

const EXIT_OK: u8 = 0;
/// Exit code when the check found problems.
const EXIT_FINDINGS: u8 = 1;
/// Exit code when the vault could not be checked at all.
const EXIT_FATAL: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "vaultlink",
    version,
    about = "Wiki-link graph checker for Obsidian vaults"
)]
struct Cli {
    /// TOML config file.  A missing file means built-in defaults.
    #[arg(long, global = true, default_value = "vaultlink.toml")]
    config: PathBuf,
    /// Vault root directory (overrides `vault.root` and VAULTLINK_ROOT).
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report dangling links, orphan notes and malformed links.
    Check {
        #[arg(long, value_enum)]
        format: Option<CliFormat>,
        /// Fail on orphan notes as well as dangling links.
        #[arg(long)]
        strict: bool,
    },
    /// Show the outbound links and backlinks of one note.
    Links {
        #[arg(value_name = "TITLE")]
        title: String,
        #[arg(long, value_enum)]
        format: Option<CliFormat>,
    },
    /// Summary counts for the vault.
    Stats {
        #[arg(long, value_enum)]
        format: Option<CliFormat>,
    },
    /// Dump every note and edge as JSON.
    Graph {
        #[arg(long, value_enum, default_value_t = GraphFormat::Json)]
        format: GraphFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliFormat {
    Text,
    Json,
}

/// The graph dump has a JSON rendering only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GraphFormat {
    Json,
}

impl From<CliFormat> for ReportFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Text => ReportFormat::Text,
            CliFormat::Json => ReportFormat::Json,
        }
    }
}

fn resolve_format(flag: Option<CliFormat>, config: &AppConfig) -> ReportFormat {
    flag.map(ReportFormat::from).unwrap_or(config.report.format)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    ExitCode::from(exit_code(run(cli).await))
}

fn exit_code(result: Result<u8>) -> u8 {
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("vaultlink: {err:#}");
            EXIT_FATAL
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let mut config = AppConfig::load_from(&cli.config)?;
    if let Some(root) = &cli.root {
        config.vault.root = root.display().to_string();
    }
    init_tracing(&config.telemetry.log_level);
    debug!(config = %cli.config.display(), root = %config.vault.root, "configuration loaded");

    let options = LoadOptions::from_config(&config.vault);
    let vault = Vault::open(&config.vault.root, &options)
        .await
        .with_context(|| format!("cannot load vault at {}", config.vault.root))?;
    let entry_points = EntryPoints::from_config(&config.check);

    let command = cli.command.unwrap_or(Commands::Check {
        format: None,
        strict: false,
    });
    match command {
        Commands::Check { format, strict } => check_cmds::run_check(
            &vault,
            &entry_points,
            resolve_format(format, &config),
            strict || config.check.fail_on_orphans,
        ),
        Commands::Links { title, format } => {
            check_cmds::run_links(&vault, &title, resolve_format(format, &config))
        }
        Commands::Stats { format } => {
            check_cmds::run_stats(&vault, &entry_points, resolve_format(format, &config))
        }
        Commands::Graph { format: GraphFormat::Json } => check_cmds::run_graph(&vault),
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

use anyhow::Result;

use vaultlink_config::ReportFormat;
use vaultlink_graph::{EntryPoints, IntegrityReport, Vault};

use crate::{EXIT_FINDINGS, EXIT_OK};

pub(crate) fn run_check(
    vault: &Vault,
    entry_points: &EntryPoints,
    format: ReportFormat,
    fail_on_orphans: bool,
) -> Result<u8> {
    let report = vault.check(entry_points);
    print!("{}", render_report(&report, format, fail_on_orphans)?);
    Ok(check_exit_code(&report, fail_on_orphans))
}

fn render_report(report: &IntegrityReport, format: ReportFormat, fail_on_orphans: bool) -> Result<String> {
    Ok(match format {
        ReportFormat::Text => report.render_text(fail_on_orphans),
        ReportFormat::Json => format!("{}\n", report.to_json()?),
    })
}

fn check_exit_code(report: &IntegrityReport, fail_on_orphans: bool) -> u8 {
    if report.passes(fail_on_orphans) {
        EXIT_OK
    } else {
        EXIT_FINDINGS
    }
}

pub(crate) fn run_links(vault: &Vault, title: &str, format: ReportFormat) -> Result<u8> {
    let Some(links) = vault.note_links(title) else {
        eprintln!("no note titled '{title}'");
        return Ok(EXIT_FINDINGS);
    };

    let shadowed = vault.graph().notes_titled(title).len().saturating_sub(1);
    match format {
        ReportFormat::Text => {
            print!("{}", links.render_text());
            if shadowed > 0 {
                println!("\nnote: {shadowed} other note(s) share this title; links resolve to the one above");
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&links)?),
    }
    Ok(EXIT_OK)
}

pub(crate) fn run_stats(vault: &Vault, entry_points: &EntryPoints, format: ReportFormat) -> Result<u8> {
    let stats = vault.stats(entry_points);
    match format {
        ReportFormat::Text => print!("{}", stats.render_text()),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
    }
    Ok(EXIT_OK)
}

pub(crate) fn run_graph(vault: &Vault) -> Result<u8> {
    println!("{}", serde_json::to_string_pretty(&vault.dump())?);
    Ok(EXIT_OK)
}

//! Output formatting for different formats.

use clap::ValueEnum;
use colored::Colorize;
use mailguard_core::{CheckResult, DomainReport, HealthSummary, ReconcileOutcome, RunReport};
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed tables with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Managed")]
    managed: &'static str,
    #[tabled(rename = "SPF")]
    spf: String,
    #[tabled(rename = "DMARC")]
    dmarc: String,
    #[tabled(rename = "DKIM")]
    dkim: String,
    #[tabled(rename = "Health")]
    health: String,
}

impl From<&DomainReport> for DomainRow {
    fn from(d: &DomainReport) -> Self {
        Self {
            domain: if d.is_healthy() {
                d.domain.green().to_string()
            } else {
                d.domain.yellow().to_string()
            },
            managed: if d.managed { "yes" } else { "no" },
            spf: paint(&d.spf_status),
            dmarc: paint(&d.dmarc_status),
            dkim: paint(&d.dkim_status.outcome),
            health: d.health_summary.compact(),
        }
    }
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Check")]
    check: &'static str,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Evidence")]
    evidence: String,
}

fn paint(outcome: &ReconcileOutcome) -> String {
    let text = outcome.to_string();
    match outcome {
        ReconcileOutcome::InSync => text.green().to_string(),
        ReconcileOutcome::Updated { .. } => text.cyan().to_string(),
        ReconcileOutcome::NeedsUpdate { .. } => text.yellow().to_string(),
        ReconcileOutcome::Error { .. } => text.red().to_string(),
        ReconcileOutcome::Skipped | ReconcileOutcome::Unconfigured => text.dimmed().to_string(),
    }
}

fn check_status(check: &CheckResult) -> String {
    match (&check.error, check.ok) {
        (_, true) => "ok".green().to_string(),
        (Some(err), false) => format!("{} ({err})", "fail".red()),
        (None, false) => "fail".red().to_string(),
    }
}

/// Print the per-domain summary of a run
pub fn print_run_pretty(report: &RunReport) {
    println!("{} {}", "Original SPF:".bold(), report.original_spf);
    println!(
        "{} {} {}",
        "Flattened SPF:".bold(),
        report.flattened_spf.cyan(),
        format!("({} lookups)", report.spf_lookup_count).dimmed()
    );
    if report.dry_run {
        println!("{}", "Dry run: no zone was written".yellow());
    }
    println!();

    if report.domains.is_empty() {
        println!("{}", "No domains processed".dimmed());
        return;
    }

    let rows: Vec<DomainRow> = report.domains.iter().map(DomainRow::from).collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    let healthy = report.domains.iter().filter(|d| d.is_healthy()).count();
    println!(
        "{} domains, {} healthy, {} updated, {} with errors",
        report.domains.len().to_string().bold(),
        healthy.to_string().green(),
        report.updated_count().to_string().cyan(),
        report.error_count().to_string().red()
    );
}

/// Print one domain's health checks
pub fn print_health_pretty(domain: &str, managed: bool, summary: &HealthSummary) {
    println!("{} {}", "Domain:".bold(), domain.cyan());
    println!(
        "{} {}",
        "Managed:".bold(),
        if managed { "yes".green() } else { "no".yellow() }
    );
    println!();

    let rows: Vec<CheckRow> = HealthSummary::LABELS
        .iter()
        .zip(summary.checks())
        .map(|(label, check)| CheckRow {
            check: *label,
            status: check_status(check),
            evidence: check.evidence.chars().take(60).collect(),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
}

//! `gqlet status`: what the next `gen` would do.

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gqlet_cache::{plan, PlanStatus, PlannedDocument};

use super::Project;
use crate::GlobalArgs;

/// Arguments for `gqlet status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let project = Project::open(global)?;
        let planned = plan(&project.root, &project.config).context("status check failed")?;
        if self.json {
            print_json(&planned)?;
        } else {
            print_table(&planned);
        }
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    summary: SummaryJson,
    documents: Vec<DocumentJson<'a>>,
}

#[derive(Serialize)]
struct SummaryJson {
    documents: usize,
    fresh: usize,
    stale: usize,
    unavailable: usize,
}

#[derive(Serialize)]
struct DocumentJson<'a> {
    document: &'a str,
    schema: &'a str,
    status: &'static str,
    detail: String,
    fingerprint: Option<&'a str>,
    generated_at: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "document")]
    document: String,
    #[tabled(rename = "schema")]
    schema: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "generated")]
    generated: String,
}

fn summary(planned: &[PlannedDocument]) -> SummaryJson {
    let count = |key: &str| planned.iter().filter(|p| status_key(&p.status) == key).count();
    SummaryJson {
        documents: planned.len(),
        fresh: count("fresh"),
        stale: count("stale"),
        unavailable: count("unavailable"),
    }
}

fn print_json(planned: &[PlannedDocument]) -> Result<()> {
    let payload = StatusJson {
        summary: summary(planned),
        documents: planned
            .iter()
            .map(|p| DocumentJson {
                document: p.document.as_str(),
                schema: &p.schema.0,
                status: status_key(&p.status),
                detail: status_detail(&p.status),
                fingerprint: p.entry.as_ref().map(|e| e.fingerprint.as_str()),
                generated_at: p.entry.as_ref().map(|e| e.generated_at.to_rfc3339()),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(planned: &[PlannedDocument]) {
    let summary = summary(planned);
    println!(
        "gqlet v{} | {} documents | {} fresh | {} stale | {} unavailable",
        env!("CARGO_PKG_VERSION"),
        summary.documents,
        summary.fresh,
        summary.stale,
        summary.unavailable,
    );
    if planned.is_empty() {
        println!("No documents matched.");
        return;
    }

    let rows: Vec<StatusTableRow> = planned
        .iter()
        .map(|p| StatusTableRow {
            document: p.document.to_string(),
            schema: p.schema.to_string(),
            status: status_label(&p.status),
            detail: status_detail(&p.status),
            generated: p
                .entry
                .as_ref()
                .map_or_else(|| "never".to_string(), |e| format_age(e.generated_at)),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if summary.stale > 0 {
        println!("Run 'gqlet gen' to regenerate stale documents.");
    }
}

fn status_key(status: &PlanStatus) -> &'static str {
    match status {
        PlanStatus::Fresh => "fresh",
        PlanStatus::Stale(_) => "stale",
        PlanStatus::Unavailable(_) => "unavailable",
    }
}

fn status_label(status: &PlanStatus) -> String {
    match status {
        PlanStatus::Fresh => "FRESH".green().bold().to_string(),
        PlanStatus::Stale(_) => "STALE".yellow().bold().to_string(),
        PlanStatus::Unavailable(_) => "UNAVAILABLE".red().bold().to_string(),
    }
}

fn status_detail(status: &PlanStatus) -> String {
    match status {
        PlanStatus::Fresh => "up to date".to_string(),
        PlanStatus::Stale(reason) => reason.to_string(),
        // Only the first line; schema errors run long.
        PlanStatus::Unavailable(message) => message.lines().next().unwrap_or_default().to_string(),
    }
}

fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now().signed_duration_since(timestamp).num_seconds().max(0);
    match seconds {
        s if s < 60 => format!("{s}s ago"),
        s if s < 60 * 60 => format!("{}m ago", s / 60),
        s if s < 60 * 60 * 24 => format!("{}h ago", s / (60 * 60)),
        s => format!("{}d ago", s / (60 * 60 * 24)),
    }
}

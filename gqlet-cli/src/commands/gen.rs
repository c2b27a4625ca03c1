//! `gqlet gen`: batch generation.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gqlet_cache::{generate, DocumentOutcome, GenReport, RunOptions, SchemaOutcome};

use super::Project;
use crate::GlobalArgs;

/// Arguments for `gqlet gen`.
#[derive(Args, Debug)]
pub struct GenArgs {
    /// Worker threads; overrides `jobs` in the config.
    #[arg(long, short = 'j', value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Keep manifest entries and artifacts of documents that no longer exist.
    #[arg(long)]
    pub no_prune: bool,
}

impl GenArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let project = Project::open(global)?;
        let engine = project.engine()?;
        let options = RunOptions {
            jobs: self.jobs.map(usize::from),
            prune: !self.no_prune,
        };

        let report = generate(&project.root, &project.config, &engine, &options)
            .context("generation failed")?;
        print_report(&report);

        Ok(if report.has_failures() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        })
    }
}

fn print_report(report: &GenReport) {
    for error in &report.schema_errors {
        eprintln!("{} {error}", "✗".red());
    }
    for outcome in &report.schemas {
        match outcome {
            SchemaOutcome::Generated(decl) => println!("  {}  {}", "✎".green(), decl.path.display()),
            SchemaOutcome::Skipped(decl) => println!("  {}  {}", "·".bright_black(), decl.path.display()),
            SchemaOutcome::Failed { schema, error } => {
                println!("  {}  schema '{schema}'", "✗".red());
                eprintln!("{error}");
            }
        }
    }

    let (mut generated, mut cached, mut failed) = (0usize, 0usize, 0usize);
    for outcome in &report.outcomes {
        match outcome {
            DocumentOutcome::Generated(ctx) => {
                generated += 1;
                println!("  {}  {}", "✎".green(), ctx.document);
            }
            DocumentOutcome::Skipped(ctx) => {
                cached += 1;
                println!("  {}  {}", "·".bright_black(), ctx.document);
            }
            DocumentOutcome::Failed { document, error } => {
                failed += 1;
                println!("  {}  {document}", "✗".red());
                eprintln!("{error}");
            }
        }
    }
    for document in &report.pruned {
        println!("  {}  {document} (pruned)", "-".yellow());
    }

    let summary = format!("{generated} generated, {cached} cached, {failed} failed");
    if report.has_failures() {
        println!("{} {summary}", "✗".red());
    } else {
        println!("{} {summary}", "✓".green());
    }
}

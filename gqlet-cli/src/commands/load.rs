//! `gqlet load`: single-document mode.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use gqlet_cache::load_document;

use super::Project;
use crate::GlobalArgs;

/// Arguments for `gqlet load`.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Document to process, relative to the project root unless absolute.
    pub file: PathBuf,
}

impl LoadArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let project = Project::open(global)?;
        let engine = project.engine()?;

        let joined = project.root.join(&self.file);
        let full = joined
            .canonicalize()
            .with_context(|| format!("cannot open {}", joined.display()))?;
        let content = std::fs::read_to_string(&full)
            .with_context(|| format!("failed to read {}", full.display()))?;

        let output = load_document(&project.root, &project.config, &engine, &full, &content)?;
        tracing::debug!(
            "{}: {}",
            output.context.document,
            if output.context.skip { "cached" } else { "generated" }
        );
        print!("{}", output.module_text);
        Ok(ExitCode::SUCCESS)
    }
}

pub mod gen;
pub mod load;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};

use gqlet_codegen::TemplateEngine;
use gqlet_core::Config;

use crate::GlobalArgs;

/// A resolved project root and its loaded config.
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
}

impl Project {
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let root = match &global.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("could not determine current directory")?,
        };
        let root = root
            .canonicalize()
            .with_context(|| format!("project root {} is not accessible", root.display()))?;
        let config = Config::load_at(&root, global.config.as_deref())?;
        tracing::debug!("root: {}", root.display());
        Ok(Project { root, config })
    }

    /// The bundled template engine, with overrides from `template_dir`.
    pub fn engine(&self) -> Result<TemplateEngine> {
        let dir = self.config.template_dir_at(&self.root);
        TemplateEngine::new(dir.as_deref()).context("failed to load templates")
    }
}

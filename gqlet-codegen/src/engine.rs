//! The [`CodegenEngine`] seam and its Tera implementation, [`TemplateEngine`].
//!
//! # Templates
//!
//! | Name                     | Artifact                    |
//! |--------------------------|-----------------------------|
//! | `module.tsx.tera`        | runtime module (`.tsx`)     |
//! | `declaration.d.ts.tera`  | type declaration (`.d.ts`)  |
//! | `schema.d.ts.tera`       | schema declaration (`.d.ts`) |
//!
//! A `template_dir` may override either by file name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use gqlet_core::{DocumentPath, Fingerprint, GenerateOptions};

use crate::context::{SchemaTemplateContext, TemplateContext};
use crate::document::analyze;
use crate::error::GenerateError;
use crate::schema::Schema;

pub const MODULE_TEMPLATE: &str = "module.tsx.tera";
pub const DECLARATION_TEMPLATE: &str = "declaration.d.ts.tera";
pub const SCHEMA_TEMPLATE: &str = "schema.d.ts.tera";

const TPLS: &[(&str, &str)] = &[
    (MODULE_TEMPLATE, include_str!("templates/module.tsx.tera")),
    (DECLARATION_TEMPLATE, include_str!("templates/declaration.d.ts.tera")),
    (SCHEMA_TEMPLATE, include_str!("templates/schema.d.ts.tera")),
];

// ---------------------------------------------------------------------------
// Engine seam
// ---------------------------------------------------------------------------

/// Everything an engine needs to generate one document.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub document: &'a DocumentPath,
    pub content: &'a str,
    pub schema: &'a Schema,
    pub options: &'a GenerateOptions,
    pub fingerprint: &'a Fingerprint,
}

/// The two artifacts produced for a document, before stamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub module: String,
    pub declaration: String,
}

/// Everything an engine needs to declare a schema's types.
#[derive(Debug, Clone, Copy)]
pub struct SchemaRequest<'a> {
    pub schema: &'a Schema,
    pub options: &'a GenerateOptions,
    pub fingerprint: &'a Fingerprint,
}

/// Turns a document into its artifacts. Called concurrently from worker
/// threads; must not write to disk.
pub trait CodegenEngine: Send + Sync {
    fn generate(&self, req: &GenerateRequest<'_>) -> Result<GeneratedOutput, GenerateError>;

    /// Type declarations for a whole schema, or `None` when the engine
    /// produces no schema artifact.
    fn generate_schema(&self, req: &SchemaRequest<'_>) -> Result<Option<String>, GenerateError> {
        let _ = req;
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GenerateError {
    GenerateError::Io {
        path: path.into(),
        source,
    }
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, GenerateError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !TPLS.iter().any(|(known, _)| *known == name) {
            continue;
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, GenerateError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Checks each document against its schema and renders both artifacts
/// through Tera.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Embedded templates plus any overrides in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, GenerateError> {
        Ok(TemplateEngine {
            tera: build_tera(user_template_dir)?,
        })
    }
}

impl CodegenEngine for TemplateEngine {
    fn generate(&self, req: &GenerateRequest<'_>) -> Result<GeneratedOutput, GenerateError> {
        let info = analyze(req.content, req.schema).map_err(GenerateError::Document)?;
        let ctx = TemplateContext::build(req, &info)?.to_tera_context()?;
        Ok(GeneratedOutput {
            module: self.tera.render(MODULE_TEMPLATE, &ctx)?,
            declaration: self.tera.render(DECLARATION_TEMPLATE, &ctx)?,
        })
    }

    fn generate_schema(&self, req: &SchemaRequest<'_>) -> Result<Option<String>, GenerateError> {
        let ctx = SchemaTemplateContext::build(req).to_tera_context()?;
        Ok(Some(self.tera.render(SCHEMA_TEMPLATE, &ctx)?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

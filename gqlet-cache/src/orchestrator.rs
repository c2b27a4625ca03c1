//! Generation orchestrator.
//!
//! Per document: fingerprint → classify → (stale only) generate → write →
//! commit. Documents are independent and run on a rayon pool; one failing
//! document never stops the others. Schema declarations follow the same
//! steps, once per loaded schema.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;

use gqlet_codegen::{CodegenEngine, GenerateRequest, Schema, SchemaRequest};
use gqlet_core::{CodegenContext, Config, DocumentPath, Fingerprint, SchemaName};

use crate::error::{io_err, CodegenError};
use crate::fingerprint::{fingerprint, schema_declaration_fingerprint, schema_fingerprint};
use crate::manifest::{ManifestEntry, ManifestStore, SchemaEntry};
use crate::staleness::{classify, classify_schema, Freshness};
use crate::writer::{artifact_paths, schema_declaration_path, ArtifactWriter};

/// A checked schema and its fingerprint.
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    pub schema: Schema,
    pub fingerprint: Fingerprint,
}

impl LoadedSchema {
    pub fn new(schema: Schema) -> Self {
        let fingerprint = schema_fingerprint(&schema);
        LoadedSchema { schema, fingerprint }
    }
}

/// One document to process. `schema` is `None` when its schema failed to load.
#[derive(Debug, Clone)]
pub struct Job<'s> {
    pub document: DocumentPath,
    pub schema_name: SchemaName,
    pub schema: Option<&'s LoadedSchema>,
}

/// Result of one document in a batch run.
#[derive(Debug)]
pub enum DocumentOutcome {
    Generated(CodegenContext),
    Skipped(CodegenContext),
    Failed {
        document: DocumentPath,
        error: CodegenError,
    },
}

impl DocumentOutcome {
    pub fn document(&self) -> &DocumentPath {
        match self {
            DocumentOutcome::Generated(ctx) | DocumentOutcome::Skipped(ctx) => &ctx.document,
            DocumentOutcome::Failed { document, .. } => document,
        }
    }

    pub fn context(&self) -> Option<&CodegenContext> {
        match self {
            DocumentOutcome::Generated(ctx) | DocumentOutcome::Skipped(ctx) => Some(ctx),
            DocumentOutcome::Failed { .. } => None,
        }
    }
}

/// A schema's declaration artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDeclaration {
    pub schema: SchemaName,
    /// Schema file the declaration sits next to.
    pub anchor: DocumentPath,
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    pub skip: bool,
}

/// Result of one schema declaration in a batch run.
#[derive(Debug)]
pub enum SchemaOutcome {
    Generated(SchemaDeclaration),
    Skipped(SchemaDeclaration),
    Failed {
        schema: SchemaName,
        error: CodegenError,
    },
}

impl SchemaOutcome {
    pub fn schema(&self) -> &SchemaName {
        match self {
            SchemaOutcome::Generated(decl) | SchemaOutcome::Skipped(decl) => &decl.schema,
            SchemaOutcome::Failed { schema, .. } => schema,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    root: &'a Path,
    config: &'a Config,
    engine: &'a dyn CodegenEngine,
    store: &'a ManifestStore,
    writer: ArtifactWriter,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        root: &'a Path,
        config: &'a Config,
        engine: &'a dyn CodegenEngine,
        store: &'a ManifestStore,
    ) -> Self {
        Orchestrator {
            root,
            config,
            engine,
            store,
            writer: ArtifactWriter::new(root, config),
        }
    }

    /// Bring one document up to date. Returns its context; `skip` tells
    /// whether prior output was reused.
    ///
    /// On any error the previous artifacts and manifest entry are left as
    /// they were.
    pub fn process(
        &self,
        document: &DocumentPath,
        content: &str,
        loaded: &LoadedSchema,
    ) -> Result<CodegenContext, CodegenError> {
        let fp = fingerprint(content, &loaded.fingerprint, &self.config.config);
        let paths = artifact_paths(self.config, document)?;
        let entry = self.store.entry(document);

        match classify(entry.as_ref(), &fp, &loaded.fingerprint, &paths, self.root)? {
            Freshness::Fresh => {
                tracing::debug!("cached: {document}");
                if let Some(entry) = entry {
                    return Ok(entry.context(document, true));
                }
            }
            Freshness::Stale(reason) => tracing::debug!("stale: {document} ({reason})"),
        }

        let output = self
            .engine
            .generate(&GenerateRequest {
                document,
                content,
                schema: &loaded.schema,
                options: &self.config.config,
                fingerprint: &fp,
            })
            .map_err(|e| CodegenError::Generation {
                document: document.clone(),
                message: e.to_string(),
            })?;

        self.writer.write(document, &fp, &output, &paths)?;

        let entry = ManifestEntry {
            fingerprint: fp,
            schema: loaded.schema.name().clone(),
            schema_fingerprint: loaded.fingerprint.clone(),
            module_path: paths.module,
            declaration_path: paths.declaration,
            generated_at: Utc::now(),
        };
        self.store.commit(document, entry.clone())?;
        tracing::info!("generated: {document}");
        Ok(entry.context(document, false))
    }

    /// Bring the declaration of `loaded` up to date. `Ok(None)` when the
    /// engine declares no schema types.
    pub fn process_schema(&self, loaded: &LoadedSchema) -> Result<Option<SchemaDeclaration>, CodegenError> {
        let Some((anchor, path)) = schema_declaration_path(&loaded.schema) else {
            return Ok(None);
        };
        let name = loaded.schema.name();
        let fp = schema_declaration_fingerprint(&loaded.fingerprint, &self.config.config);
        let declared = |skip| SchemaDeclaration {
            schema: name.clone(),
            anchor: anchor.clone(),
            path: path.clone(),
            fingerprint: fp.clone(),
            skip,
        };

        let entry = self.store.schema_entry(&anchor);
        match classify_schema(entry.as_ref(), &fp, &path, self.root)? {
            Freshness::Fresh => {
                tracing::debug!("cached: {}", path.display());
                return Ok(Some(declared(true)));
            }
            Freshness::Stale(reason) => tracing::debug!("stale: {} ({reason})", path.display()),
        }

        let request = SchemaRequest {
            schema: &loaded.schema,
            options: &self.config.config,
            fingerprint: &fp,
        };
        let declaration = self
            .engine
            .generate_schema(&request)
            .map_err(|e| CodegenError::SchemaGeneration {
                schema: name.clone(),
                message: e.to_string(),
            })?;
        let Some(declaration) = declaration else {
            return Ok(None);
        };

        self.writer.write_schema(&anchor, &fp, &declaration, &path)?;
        let entry = SchemaEntry {
            schema: name.clone(),
            fingerprint: fp.clone(),
            declaration_path: path.clone(),
            generated_at: Utc::now(),
        };
        self.store.commit_schema(&anchor, entry)?;
        tracing::info!("generated: {}", path.display());
        Ok(Some(declared(false)))
    }

    /// Declare every schema in `schemas`, one at a time.
    pub fn run_schemas<'s>(&self, schemas: impl IntoIterator<Item = &'s LoadedSchema>) -> Vec<SchemaOutcome> {
        schemas
            .into_iter()
            .filter_map(|loaded| match self.process_schema(loaded) {
                Ok(Some(decl)) if decl.skip => Some(SchemaOutcome::Skipped(decl)),
                Ok(Some(decl)) => Some(SchemaOutcome::Generated(decl)),
                Ok(None) => None,
                Err(error) => {
                    tracing::error!("failed: schema '{}': {error}", loaded.schema.name());
                    Some(SchemaOutcome::Failed {
                        schema: loaded.schema.name().clone(),
                        error,
                    })
                }
            })
            .collect()
    }

    fn run_job(&self, job: &Job<'_>) -> DocumentOutcome {
        let result = match job.schema {
            None => Err(CodegenError::SchemaUnavailable {
                document: job.document.clone(),
                schema: job.schema_name.clone(),
            }),
            Some(loaded) => {
                let full = job.document.resolve(self.root);
                std::fs::read_to_string(&full)
                    .map_err(|e| io_err(full, e))
                    .and_then(|content| self.process(&job.document, &content, loaded))
            }
        };
        match result {
            Ok(ctx) if ctx.skip => DocumentOutcome::Skipped(ctx),
            Ok(ctx) => DocumentOutcome::Generated(ctx),
            Err(error) => {
                tracing::error!("failed: {}: {error}", job.document);
                DocumentOutcome::Failed {
                    document: job.document.clone(),
                    error,
                }
            }
        }
    }

    /// Process every job, `jobs` at a time when given. Outcomes are sorted
    /// by document path.
    pub fn run(&self, jobs: &[Job<'_>], threads: Option<usize>) -> Vec<DocumentOutcome> {
        let work = || -> Vec<DocumentOutcome> { jobs.par_iter().map(|job| self.run_job(job)).collect() };
        let mut outcomes = match threads {
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(work),
                Err(err) => {
                    tracing::warn!("could not build a {n}-thread pool ({err}); using the global pool");
                    work()
                }
            },
            None => work(),
        };
        outcomes.sort_by(|a, b| a.document().cmp(b.document()));
        outcomes
    }
}

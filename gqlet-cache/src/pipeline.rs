//! Pipeline entrypoints: batch generation, dry planning and single-document
//! loading. All three share discovery, schema loading and the orchestrator.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use gqlet_codegen::{CodegenEngine, Schema};
use gqlet_core::discover::{binding_for, Discovery};
use gqlet_core::{CodegenContext, Config, DocumentPath, Fingerprint, SchemaName};

use crate::error::{io_err, CodegenError};
use crate::fingerprint::fingerprint;
use crate::manifest::{self, ManifestEntry, ManifestStore};
use crate::orchestrator::{
    DocumentOutcome, Job, LoadedSchema, Orchestrator, SchemaDeclaration, SchemaOutcome,
};
use crate::staleness::{classify, Freshness, StaleReason};
use crate::writer::{artifact_paths, remove_if_stamped};

/// Knobs for a batch run that are not part of the project config.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker count; overrides `jobs` from the config.
    pub jobs: Option<usize>,
    /// Drop manifest entries (and their artifacts) for documents and schema
    /// files removed from disk.
    pub prune: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions { jobs: None, prune: true }
    }
}

/// Everything a batch run did.
#[derive(Debug, Default)]
pub struct GenReport {
    /// One outcome per discovered document, sorted by path.
    pub outcomes: Vec<DocumentOutcome>,
    /// Schemas that failed to load.
    pub schema_errors: Vec<CodegenError>,
    /// One outcome per loaded schema whose types the engine declares.
    pub schemas: Vec<SchemaOutcome>,
    /// Documents and schema files whose manifest entries were removed.
    pub pruned: Vec<DocumentPath>,
}

impl GenReport {
    pub fn contexts(&self) -> impl Iterator<Item = &CodegenContext> {
        self.outcomes.iter().filter_map(DocumentOutcome::context)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&DocumentPath, &CodegenError)> {
        self.outcomes.iter().filter_map(|o| match o {
            DocumentOutcome::Failed { document, error } => Some((document, error)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        !self.schema_errors.is_empty()
            || self.failures().next().is_some()
            || self
                .schemas
                .iter()
                .any(|o| matches!(o, SchemaOutcome::Failed { .. }))
    }
}

fn load_schemas(
    root: &Path,
    config: &Config,
    discovery: &Discovery,
) -> (BTreeMap<SchemaName, LoadedSchema>, Vec<CodegenError>) {
    let mut loaded = BTreeMap::new();
    let mut errors = Vec::new();
    for binding in config.bindings() {
        let name = binding.schema_name();
        match Schema::load(root, name.clone(), binding.schema, discovery) {
            Ok(schema) => {
                loaded.insert(name, LoadedSchema::new(schema));
            }
            Err(err) => {
                let error = CodegenError::SchemaLoad {
                    schema: name,
                    globs: binding.schema.to_string(),
                    message: err.to_string(),
                };
                tracing::error!("{error}");
                errors.push(error);
            }
        }
    }
    (loaded, errors)
}

/// Drop entries whose source file is gone from disk, with their artifacts.
///
/// Entries for files this run did not discover but that still exist are
/// kept: another config may share the manifest.
fn prune_orphans(
    root: &Path,
    store: &ManifestStore,
    discovered: &BTreeSet<DocumentPath>,
) -> Result<Vec<DocumentPath>, CodegenError> {
    let removed = store.prune(|path| discovered.contains(path) || path.resolve(root).is_file())?;
    let mut pruned = Vec::with_capacity(removed.documents.len() + removed.schemas.len());
    for (document, entry) in removed.documents {
        for artifact in [&entry.module_path, &entry.declaration_path] {
            remove_if_stamped(&root.join(artifact), &entry.fingerprint)?;
        }
        tracing::warn!("pruned: {document} no longer exists");
        pruned.push(document);
    }
    for (source, entry) in removed.schemas {
        remove_if_stamped(&root.join(&entry.declaration_path), &entry.fingerprint)?;
        tracing::warn!("pruned: {source} no longer exists");
        pruned.push(source);
    }
    Ok(pruned)
}

// ---------------------------------------------------------------------------
// Batch mode
// ---------------------------------------------------------------------------

/// Bring every discovered document up to date.
///
/// Document- and schema-scoped failures are collected in the report; only
/// discovery and manifest-level failures abort the run.
pub fn generate(
    root: &Path,
    config: &Config,
    engine: &dyn CodegenEngine,
    options: &RunOptions,
) -> Result<GenReport, CodegenError> {
    let discovery = Discovery::scan(root, config)?;
    let documents = discovery.documents(config)?;
    let (schemas, schema_errors) = load_schemas(root, config, &discovery);

    let store = ManifestStore::open(config.manifest_path(root))?;
    let orchestrator = Orchestrator::new(root, config, engine, &store);
    let schema_outcomes = orchestrator.run_schemas(schemas.values());
    let jobs: Vec<Job<'_>> = documents
        .iter()
        .map(|(document, schema_name)| Job {
            document: document.clone(),
            schema_name: schema_name.clone(),
            schema: schemas.get(schema_name),
        })
        .collect();
    let outcomes = orchestrator.run(&jobs, options.jobs.or(config.jobs));

    let pruned = if options.prune {
        let keep: BTreeSet<DocumentPath> = documents.into_iter().map(|(d, _)| d).collect();
        prune_orphans(root, &store, &keep)?
    } else {
        Vec::new()
    };

    Ok(GenReport {
        outcomes,
        schema_errors,
        schemas: schema_outcomes,
        pruned,
    })
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Dry classification of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStatus {
    Fresh,
    Stale(StaleReason),
    /// The document cannot be classified: its schema or file is unreadable.
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct PlannedDocument {
    pub document: DocumentPath,
    pub schema: SchemaName,
    pub status: PlanStatus,
    /// Recorded entry, if any.
    pub entry: Option<ManifestEntry>,
}

/// Classify every discovered document without calling the engine or writing.
pub fn plan(root: &Path, config: &Config) -> Result<Vec<PlannedDocument>, CodegenError> {
    let discovery = Discovery::scan(root, config)?;
    let documents = discovery.documents(config)?;
    let (schemas, schema_errors) = load_schemas(root, config, &discovery);
    let manifest = manifest::load_at(&config.manifest_path(root))?;

    let mut planned = Vec::with_capacity(documents.len());
    for (document, schema_name) in documents {
        let entry = manifest.entries.get(&document).cloned();
        let status = match schemas.get(&schema_name) {
            None => PlanStatus::Unavailable(
                schema_errors
                    .iter()
                    .find(|e| matches!(e, CodegenError::SchemaLoad { schema, .. } if *schema == schema_name))
                    .map_or_else(|| format!("schema '{schema_name}' is unavailable"), |e| e.to_string()),
            ),
            Some(loaded) => match classify_document(root, config, &document, loaded, entry.as_ref()) {
                Ok(Freshness::Fresh) => PlanStatus::Fresh,
                Ok(Freshness::Stale(reason)) => PlanStatus::Stale(reason),
                Err(err) => PlanStatus::Unavailable(err.to_string()),
            },
        };
        planned.push(PlannedDocument {
            document,
            schema: schema_name,
            status,
            entry,
        });
    }
    Ok(planned)
}

fn classify_document(
    root: &Path,
    config: &Config,
    document: &DocumentPath,
    loaded: &LoadedSchema,
    entry: Option<&ManifestEntry>,
) -> Result<Freshness, CodegenError> {
    let full = document.resolve(root);
    let content = std::fs::read_to_string(&full).map_err(|e| io_err(&full, e))?;
    let fp: Fingerprint = fingerprint(&content, &loaded.fingerprint, &config.config);
    let paths = artifact_paths(config, document)?;
    classify(entry, &fp, &loaded.fingerprint, &paths, root)
}

// ---------------------------------------------------------------------------
// Single-document mode
// ---------------------------------------------------------------------------

/// Result of loading one document.
#[derive(Debug, Clone)]
pub struct LoadOutput {
    /// Module artifact text as it is on disk, stamp included.
    pub module_text: String,
    pub context: CodegenContext,
    /// Declaration of the document's schema, when the engine produces one.
    pub schema_declaration: Option<SchemaDeclaration>,
}

/// Bring one document up to date and return its module.
///
/// `full_path` must lie under `root`; `content` is the document text the
/// caller already holds. Errors are returned rather than collected. Only the
/// directories the schema globs reach are scanned.
pub fn load_document(
    root: &Path,
    config: &Config,
    engine: &dyn CodegenEngine,
    full_path: &Path,
    content: &str,
) -> Result<LoadOutput, CodegenError> {
    let document = DocumentPath::from_full(root, full_path).ok_or_else(|| CodegenError::OutsideRoot {
        path: PathBuf::from(full_path),
    })?;
    let schema_name = binding_for(config, &document)?;
    let binding = config
        .bindings()
        .into_iter()
        .find(|b| b.name == schema_name.0)
        .ok_or_else(|| CodegenError::SchemaUnavailable {
            document: document.clone(),
            schema: schema_name.clone(),
        })?;

    let discovery = Discovery::scan_globs(root, config, binding.schema)?;
    let schema = Schema::load(root, schema_name.clone(), binding.schema, &discovery).map_err(|err| {
        CodegenError::SchemaLoad {
            schema: schema_name.clone(),
            globs: binding.schema.to_string(),
            message: err.to_string(),
        }
    })?;
    let loaded = LoadedSchema::new(schema);

    let store = ManifestStore::open(config.manifest_path(root))?;
    let orchestrator = Orchestrator::new(root, config, engine, &store);
    let schema_declaration = orchestrator.process_schema(&loaded)?;
    let context = orchestrator.process(&document, content, &loaded)?;
    let module = root.join(&context.module_path);
    let module_text = std::fs::read_to_string(&module).map_err(|e| io_err(&module, e))?;
    Ok(LoadOutput {
        module_text,
        context,
        schema_declaration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_run_options_prune() {
        let options = RunOptions::default();
        assert!(options.prune);
        assert_eq!(options.jobs, None);
    }

    #[test]
    fn empty_report_has_no_failures() {
        let report = GenReport::default();
        assert!(!report.has_failures());
        assert_eq!(report.contexts().count(), 0);
    }
}

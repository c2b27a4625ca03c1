#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use gqlet_cache::{generate, DocumentOutcome, GenReport, RunOptions};
use gqlet_codegen::{
    CodegenEngine, GenerateError, GenerateRequest, GeneratedOutput, SchemaRequest, TemplateEngine,
};
use gqlet_core::Config;
use tempfile::TempDir;

pub const SCHEMA: &str = "type Query { viewer: User }\ntype User { id: ID! name: String }\n";
pub const VIEWER: &str = "query Viewer { viewer { id } }\n";
pub const NAME: &str = "query Name { viewer { name } }\n";

/// The bundled engine plus call counters for documents and schemas.
pub struct CountingEngine {
    inner: TemplateEngine,
    calls: AtomicUsize,
    schema_calls: AtomicUsize,
}

impl CountingEngine {
    pub fn new() -> Self {
        CountingEngine {
            inner: TemplateEngine::new(None).expect("embedded templates"),
            calls: AtomicUsize::new(0),
            schema_calls: AtomicUsize::new(0),
        }
    }

    /// Document calls since the last `take`.
    pub fn take(&self) -> usize {
        self.calls.swap(0, Ordering::SeqCst)
    }

    /// Schema declaration calls since the last `take_schema`.
    pub fn take_schema(&self) -> usize {
        self.schema_calls.swap(0, Ordering::SeqCst)
    }
}

impl CodegenEngine for CountingEngine {
    fn generate(&self, req: &GenerateRequest<'_>) -> Result<GeneratedOutput, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate(req)
    }

    fn generate_schema(&self, req: &SchemaRequest<'_>) -> Result<Option<String>, GenerateError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_schema(req)
    }
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

pub fn read(root: &Path, rel: impl AsRef<Path>) -> String {
    fs::read_to_string(root.join(rel)).expect("read")
}

/// Schema plus two documents under `src/`.
pub fn project() -> (TempDir, Config) {
    let tmp = TempDir::new().expect("tempdir");
    write(tmp.path(), "schema.graphqls", SCHEMA);
    write(tmp.path(), "src/viewer.graphql", VIEWER);
    write(tmp.path(), "src/name.graphql", NAME);
    (tmp, Config::new("schema.graphqls", "src/**/*.graphql"))
}

pub fn run(root: &Path, config: &Config, engine: &CountingEngine) -> GenReport {
    generate(root, config, engine, &RunOptions::default()).expect("generate")
}

/// Document paths of outcomes matching `pick`.
pub fn docs(report: &GenReport, pick: fn(&DocumentOutcome) -> bool) -> Vec<String> {
    report
        .outcomes
        .iter()
        .filter(|o| pick(o))
        .map(|o| o.document().to_string())
        .collect()
}

pub fn generated(o: &DocumentOutcome) -> bool {
    matches!(o, DocumentOutcome::Generated(_))
}

pub fn skipped(o: &DocumentOutcome) -> bool {
    matches!(o, DocumentOutcome::Skipped(_))
}

pub fn failed(o: &DocumentOutcome) -> bool {
    matches!(o, DocumentOutcome::Failed { .. })
}

pub fn module_path(doc: &str) -> PathBuf {
    PathBuf::from("__generated__").join(format!("{doc}.tsx"))
}

//! Project configuration (`.gqlet.yml`).
//!
//! # Layout
//!
//! ```yaml
//! schema: schema/**/*.graphqls
//! documents:
//!   - "**/*.graphql"
//!   - "!broken/**"
//! generated_dir: __generated__
//! config:
//!   use_index_signature: true
//! projects:
//!   - name: admin
//!     schema: admin/schema.graphqls
//!     documents: "admin/**/*.graphql"
//! ```
//!
//! The configuration is loaded once per run and threaded explicitly into
//! every pipeline call; nothing reads it from ambient state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::types::SchemaName;

/// Config file looked up in the project root when no explicit path is given.
pub const DEFAULT_CONFIG_FILENAME: &str = ".gqlet.yml";

const DEFAULT_GENERATED_DIR: &str = "__generated__";
const DEFAULT_CACHE_DIR: &str = ".gqlet";
const MANIFEST_FILENAME: &str = "manifest.json";

// ---------------------------------------------------------------------------
// Globs
// ---------------------------------------------------------------------------

/// One glob or a list of globs. Entries prefixed with `!` are excludes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "GlobsRepr", into = "Vec<String>")]
pub struct Globs(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum GlobsRepr {
    One(String),
    Many(Vec<String>),
}

impl From<GlobsRepr> for Globs {
    fn from(repr: GlobsRepr) -> Self {
        match repr {
            GlobsRepr::One(s) => Globs(vec![s]),
            GlobsRepr::Many(v) => Globs(v),
        }
    }
}

impl From<Globs> for Vec<String> {
    fn from(globs: Globs) -> Self {
        globs.0
    }
}

impl Globs {
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty() && !g.starts_with('!'))
    }

    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .map(|g| g.trim())
            .filter_map(|g| g.strip_prefix('!'))
            .filter(|g| !g.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.includes().next().is_none()
    }
}

impl std::fmt::Display for Globs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Generation options
// ---------------------------------------------------------------------------

/// Options handed to the generation engine. Part of every fingerprint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Add a `WithIndex<T>` index-signature form to generated object types.
    #[serde(default, alias = "useIndexSignature")]
    pub use_index_signature: bool,

    /// Engine-specific keys, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GenerateOptions {
    /// Serialise with every object's keys sorted, independent of the input
    /// key order and of serde_json's map implementation.
    pub fn canonical_json(&self) -> String {
        let mut root = serde_json::Map::new();
        root.insert(
            "use_index_signature".to_string(),
            Value::Bool(self.use_index_signature),
        );
        for (key, value) in &self.extra {
            root.insert(key.clone(), value.clone());
        }
        canonicalize(&Value::Object(root)).to_string()
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// An additional schema binding for a subset of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub schema: Globs,
    pub documents: Globs,
}

/// Root of `.gqlet.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub schema: Globs,
    pub documents: Globs,
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub config: GenerateOptions,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from(DEFAULT_GENERATED_DIR)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_true() -> bool {
    true
}

/// `path` without `.` components. `None` when it is empty, absolute or
/// climbs out with `..`.
pub fn plain_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

/// A schema and the documents bound to it, borrowed from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct SchemaBinding<'a> {
    pub name: &'a str,
    pub schema: &'a Globs,
    pub documents: &'a Globs,
}

impl SchemaBinding<'_> {
    pub fn schema_name(&self) -> SchemaName {
        SchemaName::from(self.name)
    }
}

impl Config {
    /// Minimal config with defaults for everything but the globs.
    pub fn new(schema: impl Into<String>, documents: impl Into<String>) -> Self {
        Config {
            schema: Globs(vec![schema.into()]),
            documents: Globs(vec![documents.into()]),
            generated_dir: default_generated_dir(),
            cache_dir: default_cache_dir(),
            respect_gitignore: true,
            template_dir: None,
            jobs: None,
            config: GenerateOptions::default(),
            projects: Vec::new(),
        }
    }

    /// Path of the config file: `config_path` (relative to `root` unless
    /// absolute) or `<root>/.gqlet.yml`.
    pub fn path_at(root: &Path, config_path: Option<&Path>) -> PathBuf {
        match config_path {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => root.join(p),
            None => root.join(DEFAULT_CONFIG_FILENAME),
        }
    }

    /// Load and validate the config for the project at `root`.
    ///
    /// Returns `ConfigError::NotFound` if absent and `ConfigError::Parse`
    /// (with path + line context) if malformed.
    pub fn load_at(root: &Path, config_path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = Self::path_at(root, config_path);
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let mut config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        config
            .validate()
            .map_err(|reason| ConfigError::Invalid { path, reason })?;
        config.normalize_dirs();
        Ok(config)
    }

    /// Drop `.` components from `generated_dir` and `cache_dir`, so
    /// `./__generated__` and `__generated__` name the same directory.
    pub fn normalize_dirs(&mut self) {
        if let Some(dir) = plain_relative(&self.generated_dir) {
            self.generated_dir = dir;
        }
        if let Some(dir) = plain_relative(&self.cache_dir) {
            self.cache_dir = dir;
        }
    }

    /// Project-relative directories discovery never enters.
    pub fn skipped_dirs(&self) -> Vec<PathBuf> {
        [&self.generated_dir, &self.cache_dir]
            .into_iter()
            .filter_map(|dir| plain_relative(dir))
            .collect()
    }

    /// Structural checks serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.schema.is_empty() {
            return Err("`schema` needs at least one glob".to_string());
        }
        if self.documents.is_empty() {
            return Err("`documents` needs at least one glob".to_string());
        }
        if self.jobs == Some(0) {
            return Err("`jobs` must be at least 1".to_string());
        }
        for (key, dir) in [("generated_dir", &self.generated_dir), ("cache_dir", &self.cache_dir)] {
            if plain_relative(dir).is_none() {
                return Err(format!(
                    "`{key}` must be a relative path inside the project, got '{}'",
                    dir.display()
                ));
            }
        }
        let mut seen = BTreeSet::new();
        for project in &self.projects {
            if project.name.trim().is_empty() {
                return Err("project names must not be empty".to_string());
            }
            if project.name == SchemaName::DEFAULT {
                return Err(format!(
                    "project name '{}' is reserved for the top-level schema",
                    SchemaName::DEFAULT
                ));
            }
            if !seen.insert(project.name.as_str()) {
                return Err(format!("duplicate project name '{}'", project.name));
            }
            if project.schema.is_empty() || project.documents.is_empty() {
                return Err(format!(
                    "project '{}' needs `schema` and `documents` globs",
                    project.name
                ));
            }
        }
        Ok(())
    }

    /// Schema bindings in match order: configured projects first, then the
    /// top-level schema.
    pub fn bindings(&self) -> Vec<SchemaBinding<'_>> {
        let mut out: Vec<SchemaBinding<'_>> = self
            .projects
            .iter()
            .map(|p| SchemaBinding {
                name: &p.name,
                schema: &p.schema,
                documents: &p.documents,
            })
            .collect();
        out.push(SchemaBinding {
            name: SchemaName::DEFAULT,
            schema: &self.schema,
            documents: &self.documents,
        });
        out
    }

    /// `<root>/<generated_dir>`
    pub fn output_root(&self, root: &Path) -> PathBuf {
        root.join(&self.generated_dir)
    }

    /// `<root>/<cache_dir>/manifest.json`
    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_dir).join(MANIFEST_FILENAME)
    }

    /// `template_dir` resolved against `root`.
    pub fn template_dir_at(&self, root: &Path) -> Option<PathBuf> {
        self.template_dir.as_ref().map(|dir| root.join(dir))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

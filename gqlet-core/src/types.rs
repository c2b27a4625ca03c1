//! Domain types shared by every gqlet crate.
//!
//! Document identities are project-relative, forward-slash separated strings
//! so manifests stay portable across machines and platforms.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Project-relative path of a document; the stable identity key of the cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentPath(pub String);

impl DocumentPath {
    /// Build from a path relative to the project root.
    ///
    /// Returns `None` for absolute paths and paths that climb out of the
    /// root with `..`.
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts.join("/")))
    }

    /// Relativise `full_path` against `root`.
    pub fn from_full(root: &Path, full_path: &Path) -> Option<Self> {
        let rel = full_path.strip_prefix(root).ok()?;
        Self::from_relative(rel)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Platform path relative to the project root.
    pub fn to_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }

    /// Absolute location of the document under `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(self.to_path())
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DocumentPath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DocumentPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name of a schema binding: `default` or a configured project name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaName(pub String);

impl SchemaName {
    pub const DEFAULT: &'static str = "default";

    pub fn default_schema() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SchemaName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SchemaName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Length of [`Fingerprint::short`].
    pub const SHORT_LEN: usize = 12;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters, used for display and generated identifiers.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(Self::SHORT_LEN);
        &self.0[..end]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// CodegenContext
// ---------------------------------------------------------------------------

/// Outcome of one document in one run.
///
/// `skip` is `true` when the run reused previously generated artifacts. The
/// artifact paths are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenContext {
    pub document: DocumentPath,
    pub fingerprint: Fingerprint,
    pub schema: SchemaName,
    pub module_path: PathBuf,
    pub declaration_path: PathBuf,
    pub skip: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

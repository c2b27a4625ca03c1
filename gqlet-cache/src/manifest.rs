//! Manifest store: the persisted record of what was generated, and from what.
//!
//! Persists a [`Manifest`] JSON document at `<root>/<cache_dir>/manifest.json`.
//! Every commit re-reads the file, merges one entry and replaces the file with
//! the `.tmp` + rename pattern, so readers only ever see a complete manifest.
//! Commits from threads in one process are serialised by a mutex; separate
//! processes rely on the merge to keep each other's entries.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gqlet_core::{CodegenContext, DocumentPath, Fingerprint, SchemaName};

use crate::error::{manifest_err, CodegenError, ManifestError};

/// Format version written to and expected from disk.
pub const MANIFEST_VERSION: u32 = 1;

/// Persisted record for one document. Artifact paths are relative to the
/// project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub fingerprint: Fingerprint,
    pub schema: SchemaName,
    pub schema_fingerprint: Fingerprint,
    pub module_path: PathBuf,
    pub declaration_path: PathBuf,
    pub generated_at: DateTime<Utc>,
}

impl ManifestEntry {
    pub fn context(&self, document: &DocumentPath, skip: bool) -> CodegenContext {
        CodegenContext {
            document: document.clone(),
            fingerprint: self.fingerprint.clone(),
            schema: self.schema.clone(),
            module_path: self.module_path.clone(),
            declaration_path: self.declaration_path.clone(),
            skip,
        }
    }
}

/// Persisted record for one schema declaration, keyed by the schema file
/// the declaration sits next to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaEntry {
    pub schema: SchemaName,
    pub fingerprint: Fingerprint,
    pub declaration_path: PathBuf,
    pub generated_at: DateTime<Utc>,
}

/// On-disk manifest payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub entries: BTreeMap<DocumentPath, ManifestEntry>,
    #[serde(default)]
    pub schemas: BTreeMap<DocumentPath, SchemaEntry>,
}

impl Manifest {
    pub fn empty() -> Self {
        Manifest {
            version: MANIFEST_VERSION,
            updated_at: Utc::now(),
            entries: BTreeMap::new(),
            schemas: BTreeMap::new(),
        }
    }
}

/// Entries removed by [`ManifestStore::prune`].
#[derive(Debug, Default)]
pub struct Pruned {
    pub documents: Vec<(DocumentPath, ManifestEntry)>,
    pub schemas: Vec<(DocumentPath, SchemaEntry)>,
}

impl Pruned {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.schemas.is_empty()
    }
}

fn drain_unkept<V>(
    map: &mut BTreeMap<DocumentPath, V>,
    keep: &dyn Fn(&DocumentPath) -> bool,
) -> Vec<(DocumentPath, V)> {
    let orphaned: Vec<DocumentPath> = map.keys().filter(|k| !keep(k)).cloned().collect();
    orphaned
        .into_iter()
        .filter_map(|k| map.remove(&k).map(|v| (k, v)))
        .collect()
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

fn parse(contents: &str) -> Result<Manifest, ManifestError> {
    let header: VersionHeader = serde_json::from_str(contents)?;
    if header.version != MANIFEST_VERSION {
        return Err(ManifestError::UnsupportedVersion {
            found: header.version,
            expected: MANIFEST_VERSION,
        });
    }
    Ok(serde_json::from_str(contents)?)
}

/// Load the manifest at `path`.
///
/// A missing file is an empty manifest. A corrupt file or one with another
/// format version is logged and treated as empty; the next commit replaces it.
pub fn load_at(path: &Path) -> Result<Manifest, CodegenError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Manifest::empty()),
        Err(err) => return Err(manifest_err(path, err)),
    };
    match parse(&contents) {
        Ok(manifest) => Ok(manifest),
        Err(err) => {
            tracing::warn!(
                "ignoring unreadable manifest {}: {err}; all documents will be regenerated",
                path.display()
            );
            Ok(Manifest::empty())
        }
    }
}

/// Save the manifest atomically.
///
/// Writes to a process-specific `.tmp` sibling then renames over `path`.
pub fn save_at(path: &Path, manifest: &Manifest) -> Result<(), CodegenError> {
    let Some(dir) = path.parent() else {
        return Err(manifest_err(
            path,
            std::io::Error::other("invalid manifest path"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| manifest_err(dir, e))?;

    let json = serde_json::to_string_pretty(manifest).map_err(|e| manifest_err(path, e))?;
    let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
    std::fs::write(&tmp, json).map_err(|e| manifest_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(manifest_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ManifestStore
// ---------------------------------------------------------------------------

/// Shared handle to the manifest for one run.
///
/// Holds the snapshot taken at open time, refreshed by every commit. Lookups
/// during a run read the snapshot; commits go through the file.
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    state: Mutex<Manifest>,
}

impl ManifestStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CodegenError> {
        let path = path.into();
        let manifest = load_at(&path)?;
        Ok(ManifestStore {
            path,
            state: Mutex::new(manifest),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Manifest> {
        // A panic while holding the lock leaves the snapshot intact.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Recorded entry for `document`, if any.
    pub fn entry(&self, document: &DocumentPath) -> Option<ManifestEntry> {
        self.lock().entries.get(document).cloned()
    }

    /// Record `entry` for `document`. The artifacts it names must already be
    /// on disk.
    pub fn commit(&self, document: &DocumentPath, entry: ManifestEntry) -> Result<(), CodegenError> {
        let mut state = self.lock();
        let mut manifest = load_at(&self.path)?;
        manifest.entries.insert(document.clone(), entry);
        manifest.updated_at = Utc::now();
        save_at(&self.path, &manifest)?;
        *state = manifest;
        Ok(())
    }

    /// Recorded schema declaration anchored at `source`, if any.
    pub fn schema_entry(&self, source: &DocumentPath) -> Option<SchemaEntry> {
        self.lock().schemas.get(source).cloned()
    }

    /// Record a schema declaration. Like [`commit`](Self::commit), the
    /// artifact must already be on disk.
    pub fn commit_schema(&self, source: &DocumentPath, entry: SchemaEntry) -> Result<(), CodegenError> {
        let mut state = self.lock();
        let mut manifest = load_at(&self.path)?;
        manifest.schemas.insert(source.clone(), entry);
        manifest.updated_at = Utc::now();
        save_at(&self.path, &manifest)?;
        *state = manifest;
        Ok(())
    }

    /// Drop every document and schema entry whose key fails `keep`. The file
    /// is only rewritten when something was removed.
    pub fn prune(&self, keep: impl Fn(&DocumentPath) -> bool) -> Result<Pruned, CodegenError> {
        let mut state = self.lock();
        let mut manifest = load_at(&self.path)?;
        let pruned = Pruned {
            documents: drain_unkept(&mut manifest.entries, &keep),
            schemas: drain_unkept(&mut manifest.schemas, &keep),
        };
        if !pruned.is_empty() {
            manifest.updated_at = Utc::now();
            save_at(&self.path, &manifest)?;
        }
        *state = manifest;
        Ok(pruned)
    }
}

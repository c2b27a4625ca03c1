//! Artifact writer.
//!
//! ## Destinations
//!
//! | Artifact    | Path                                           |
//! |-------------|------------------------------------------------|
//! | module      | `<root>/<generated_dir>/<document>.tsx`        |
//! | declaration | `<root>/<document>.d.ts`                       |
//! | schema      | `<root>/<first schema file>.d.ts`              |
//!
//! The document's full file name is kept and the suffix appended, so
//! `a.graphql` and `a.gql` never share an artifact.
//!
//! ## `write` protocol
//!
//! 1. Stamp each artifact with `// gqlet-fingerprint: <hex>` on its first line.
//! 2. Write each to `<path>.gqlet.tmp`.
//! 3. Rename each into place (atomic on POSIX).
//!
//! A failure before step 3 removes the temps and leaves the old artifacts
//! untouched.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use gqlet_codegen::{GeneratedOutput, Schema};
use gqlet_core::{plain_relative, Config, DocumentPath, Fingerprint};

use crate::error::{io_err, CodegenError};

/// First-line prefix of every artifact.
pub const STAMP_PREFIX: &str = "// gqlet-fingerprint: ";

const MODULE_SUFFIX: &str = ".tsx";
const DECLARATION_SUFFIX: &str = ".d.ts";

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Artifact locations for one document, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub module: PathBuf,
    pub declaration: PathBuf,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn is_plain_document(document: &DocumentPath) -> bool {
    let s = document.as_str();
    !s.is_empty() && s.split('/').all(|seg| !seg.is_empty() && seg != "..")
}

/// Where the artifacts of `document` go.
pub fn artifact_paths(config: &Config, document: &DocumentPath) -> Result<ArtifactPaths, CodegenError> {
    let rel = document.to_path();
    if !is_plain_document(document) || !is_plain_relative(&rel) {
        return Err(CodegenError::OutsideRoot {
            path: PathBuf::from(document.as_str()),
        });
    }
    let Some(generated_dir) = plain_relative(&config.generated_dir) else {
        return Err(CodegenError::OutsideRoot {
            path: config.generated_dir.clone(),
        });
    };
    Ok(ArtifactPaths {
        module: with_suffix(&generated_dir.join(&rel), MODULE_SUFFIX),
        declaration: with_suffix(&rel, DECLARATION_SUFFIX),
    })
}

/// Where the declaration of `schema` goes, and the schema file it is
/// anchored to (the first in path order).
pub fn schema_declaration_path(schema: &Schema) -> Option<(DocumentPath, PathBuf)> {
    let anchor = schema.sources().first()?.path.clone();
    let path = with_suffix(&anchor.to_path(), DECLARATION_SUFFIX);
    Some((anchor, path))
}

// ---------------------------------------------------------------------------
// Stamps
// ---------------------------------------------------------------------------

/// Prefix `content` with its stamp and normalise line endings.
pub fn stamp(fingerprint: &Fingerprint, content: &str) -> String {
    format!("{STAMP_PREFIX}{fingerprint}\n{}", content.replace("\r\n", "\n"))
}

/// Fingerprint recorded on the first line of `path`, if it has one.
///
/// `Ok(None)` for a file without a stamp; `Err` with `NotFound` for a
/// missing file.
pub fn read_stamp(path: &Path) -> std::io::Result<Option<Fingerprint>> {
    let mut first = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first)?;
    Ok(first
        .trim_end()
        .strip_prefix(STAMP_PREFIX)
        .map(|hex| Fingerprint(hex.to_string())))
}

/// Delete `path` if it still carries `fingerprint`. Returns whether a file
/// was removed.
pub fn remove_if_stamped(path: &Path, fingerprint: &Fingerprint) -> Result<bool, CodegenError> {
    match read_stamp(path) {
        Ok(Some(found)) if &found == fingerprint => {
            std::fs::remove_file(path).map_err(|e| io_err(path, e))?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err(path, e)),
    }
}

// ---------------------------------------------------------------------------
// ArtifactWriter
// ---------------------------------------------------------------------------

/// Writes artifact pairs under one project root.
#[derive(Debug)]
pub struct ArtifactWriter {
    root: PathBuf,
    output_root: PathBuf,
    prepared: Mutex<bool>,
}

struct Staged {
    tmp: PathBuf,
    path: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: &Path, config: &Config) -> Self {
        ArtifactWriter {
            root: root.to_path_buf(),
            output_root: config.output_root(root),
            prepared: Mutex::new(false),
        }
    }

    /// Create the output root once. Safe to call from many threads and many
    /// times; never clears existing output.
    pub fn prepare(&self) -> Result<(), CodegenError> {
        let mut prepared = self.prepared.lock().unwrap_or_else(|p| p.into_inner());
        if !*prepared {
            std::fs::create_dir_all(&self.output_root).map_err(|e| io_err(&self.output_root, e))?;
            *prepared = true;
        }
        Ok(())
    }

    /// Write both artifacts of `document`, all or nothing.
    pub fn write(
        &self,
        document: &DocumentPath,
        fingerprint: &Fingerprint,
        output: &GeneratedOutput,
        paths: &ArtifactPaths,
    ) -> Result<(), CodegenError> {
        self.prepare()?;
        self.replace(
            document,
            &[
                (paths.module.as_path(), stamp(fingerprint, &output.module)),
                (paths.declaration.as_path(), stamp(fingerprint, &output.declaration)),
            ],
        )
    }

    /// Write a schema declaration next to its anchor schema file.
    pub fn write_schema(
        &self,
        anchor: &DocumentPath,
        fingerprint: &Fingerprint,
        declaration: &str,
        path: &Path,
    ) -> Result<(), CodegenError> {
        self.replace(anchor, &[(path, stamp(fingerprint, declaration))])
    }

    fn replace(&self, document: &DocumentPath, pairs: &[(&Path, String)]) -> Result<(), CodegenError> {
        let mut staged: Vec<Staged> = Vec::with_capacity(pairs.len());
        for (rel, content) in pairs {
            let path = self.root.join(rel);
            if std::fs::read_to_string(&path).is_ok_and(|existing| existing == *content) {
                tracing::debug!("unchanged: {}", path.display());
                continue;
            }
            match stage(&path, content) {
                Ok(tmp) => staged.push(Staged { tmp, path }),
                Err(source) => {
                    discard(&staged);
                    return Err(CodegenError::ArtifactWrite {
                        document: document.clone(),
                        artifact: path,
                        source,
                    });
                }
            }
        }

        for (i, item) in staged.iter().enumerate() {
            if let Err(source) = std::fs::rename(&item.tmp, &item.path) {
                discard(&staged[i..]);
                return Err(CodegenError::ArtifactWrite {
                    document: document.clone(),
                    artifact: item.path.clone(),
                    source,
                });
            }
            tracing::info!("wrote: {}", item.path.display());
        }
        Ok(())
    }
}

fn stage(path: &Path, content: &str) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = with_suffix(path, ".gqlet.tmp");
    std::fs::write(&tmp, content)?;
    Ok(tmp)
}

fn discard(staged: &[Staged]) {
    for item in staged {
        let _ = std::fs::remove_file(&item.tmp);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

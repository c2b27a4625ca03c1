//! Staleness resolution.
//!
//! Check precedence:
//! 1. `NotGenerated` (no manifest entry)
//! 2. `SchemaChanged` (bound schema differs from the one recorded)
//! 3. `FingerprintChanged` (document, schema or options changed)
//! 4. `ArtifactMissing` (a recorded artifact is gone or has moved)
//! 5. `ArtifactOutdated` (an artifact's stamp disagrees with the entry)
//! 6. `Fresh`
//!
//! Schema declarations follow the same order with one fingerprint, which
//! covers the schema and the options.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use gqlet_core::Fingerprint;

use crate::error::{io_err, CodegenError};
use crate::manifest::{ManifestEntry, SchemaEntry};
use crate::writer::{read_stamp, ArtifactPaths};

/// Why a document must be regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StaleReason {
    NotGenerated,
    SchemaChanged,
    FingerprintChanged,
    ArtifactMissing { path: PathBuf },
    ArtifactOutdated { path: PathBuf },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::NotGenerated => f.write_str("not generated"),
            StaleReason::SchemaChanged => f.write_str("schema changed"),
            StaleReason::FingerprintChanged => f.write_str("document changed"),
            StaleReason::ArtifactMissing { path } => write!(f, "missing {}", path.display()),
            StaleReason::ArtifactOutdated { path } => write!(f, "outdated {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale(StaleReason),
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh)
    }
}

/// Classify a document from its manifest entry and current fingerprints.
///
/// `expected` are the artifact paths the current configuration would use;
/// an entry recorded under other paths counts as missing its artifacts.
pub fn classify(
    entry: Option<&ManifestEntry>,
    current: &Fingerprint,
    schema_fingerprint: &Fingerprint,
    expected: &ArtifactPaths,
    root: &Path,
) -> Result<Freshness, CodegenError> {
    let Some(entry) = entry else {
        return Ok(Freshness::Stale(StaleReason::NotGenerated));
    };
    if &entry.schema_fingerprint != schema_fingerprint {
        return Ok(Freshness::Stale(StaleReason::SchemaChanged));
    }
    if &entry.fingerprint != current {
        return Ok(Freshness::Stale(StaleReason::FingerprintChanged));
    }

    let artifacts = [
        (&entry.module_path, &expected.module),
        (&entry.declaration_path, &expected.declaration),
    ];
    for (recorded, wanted) in artifacts {
        if recorded != wanted {
            return Ok(Freshness::Stale(StaleReason::ArtifactMissing {
                path: wanted.clone(),
            }));
        }
    }
    for (recorded, _) in artifacts {
        if let Some(reason) = check_stamp(root, recorded, current)? {
            return Ok(Freshness::Stale(reason));
        }
    }
    Ok(Freshness::Fresh)
}

/// Classify a schema declaration from its manifest entry.
pub fn classify_schema(
    entry: Option<&SchemaEntry>,
    current: &Fingerprint,
    expected: &Path,
    root: &Path,
) -> Result<Freshness, CodegenError> {
    let Some(entry) = entry else {
        return Ok(Freshness::Stale(StaleReason::NotGenerated));
    };
    if &entry.fingerprint != current {
        return Ok(Freshness::Stale(StaleReason::SchemaChanged));
    }
    if entry.declaration_path != expected {
        return Ok(Freshness::Stale(StaleReason::ArtifactMissing {
            path: expected.to_path_buf(),
        }));
    }
    Ok(match check_stamp(root, &entry.declaration_path, current)? {
        Some(reason) => Freshness::Stale(reason),
        None => Freshness::Fresh,
    })
}

fn check_stamp(
    root: &Path,
    recorded: &Path,
    current: &Fingerprint,
) -> Result<Option<StaleReason>, CodegenError> {
    let full = root.join(recorded);
    match read_stamp(&full) {
        Ok(Some(stamp)) if &stamp == current => Ok(None),
        Ok(_) => Ok(Some(StaleReason::ArtifactOutdated {
            path: recorded.to_path_buf(),
        })),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Some(StaleReason::ArtifactMissing {
            path: recorded.to_path_buf(),
        })),
        Err(err) => Err(io_err(full, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::stamp;
    use chrono::Utc;
    use gqlet_core::SchemaName;
    use std::fs;
    use tempfile::TempDir;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint(s.to_string())
    }

    fn paths() -> ArtifactPaths {
        ArtifactPaths {
            module: PathBuf::from("__generated__/a.graphql.tsx"),
            declaration: PathBuf::from("a.graphql.d.ts"),
        }
    }

    fn entry(doc_fp: &str, schema_fp: &str) -> ManifestEntry {
        let p = paths();
        ManifestEntry {
            fingerprint: fp(doc_fp),
            schema: SchemaName::default_schema(),
            schema_fingerprint: fp(schema_fp),
            module_path: p.module,
            declaration_path: p.declaration,
            generated_at: Utc::now(),
        }
    }

    /// Root with both artifacts stamped `doc_fp`.
    fn generated(doc_fp: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let p = paths();
        fs::create_dir_all(tmp.path().join("__generated__")).unwrap();
        fs::write(tmp.path().join(&p.module), stamp(&fp(doc_fp), "m")).unwrap();
        fs::write(tmp.path().join(&p.declaration), stamp(&fp(doc_fp), "d")).unwrap();
        tmp
    }

    fn check(entry: Option<&ManifestEntry>, doc_fp: &str, schema_fp: &str, root: &Path) -> Freshness {
        classify(entry, &fp(doc_fp), &fp(schema_fp), &paths(), root).unwrap()
    }

    #[test]
    fn no_entry_is_not_generated() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            check(None, "d", "s", tmp.path()),
            Freshness::Stale(StaleReason::NotGenerated)
        );
    }

    #[test]
    fn matching_entry_and_stamps_are_fresh() {
        let tmp = generated("d");
        assert!(check(Some(&entry("d", "s")), "d", "s", tmp.path()).is_fresh());
    }

    #[test]
    fn schema_change_takes_precedence() {
        let tmp = generated("d");
        assert_eq!(
            check(Some(&entry("d", "s")), "d2", "s2", tmp.path()),
            Freshness::Stale(StaleReason::SchemaChanged)
        );
        assert_eq!(
            check(Some(&entry("d", "s")), "d2", "s", tmp.path()),
            Freshness::Stale(StaleReason::FingerprintChanged)
        );
    }

    #[test]
    fn missing_artifact_is_stale() {
        let tmp = generated("d");
        fs::remove_file(tmp.path().join("a.graphql.d.ts")).unwrap();
        assert_eq!(
            check(Some(&entry("d", "s")), "d", "s", tmp.path()),
            Freshness::Stale(StaleReason::ArtifactMissing {
                path: PathBuf::from("a.graphql.d.ts")
            })
        );
    }

    #[test]
    fn stamp_mismatch_is_outdated() {
        // Artifacts rewritten for another fingerprint without a manifest commit.
        let tmp = generated("newer");
        assert_eq!(
            check(Some(&entry("d", "s")), "d", "s", tmp.path()),
            Freshness::Stale(StaleReason::ArtifactOutdated {
                path: paths().module
            })
        );
    }

    #[test]
    fn moved_output_dir_is_missing() {
        let tmp = generated("d");
        let mut moved = entry("d", "s");
        moved.module_path = PathBuf::from("old/a.graphql.tsx");
        assert_eq!(
            check(Some(&moved), "d", "s", tmp.path()),
            Freshness::Stale(StaleReason::ArtifactMissing { path: paths().module })
        );
    }

    #[test]
    fn schema_declarations_track_fingerprint_and_stamp() {
        let tmp = TempDir::new().unwrap();
        let path = PathBuf::from("schema.graphqls.d.ts");
        let recorded = SchemaEntry {
            schema: SchemaName::default_schema(),
            fingerprint: fp("s"),
            declaration_path: path.clone(),
            generated_at: Utc::now(),
        };
        let check = |entry: Option<&SchemaEntry>, current: &str| {
            classify_schema(entry, &fp(current), &path, tmp.path()).unwrap()
        };

        assert_eq!(check(None, "s"), Freshness::Stale(StaleReason::NotGenerated));
        assert_eq!(
            check(Some(&recorded), "s"),
            Freshness::Stale(StaleReason::ArtifactMissing { path: path.clone() })
        );
        fs::write(tmp.path().join(&path), stamp(&fp("s"), "d")).unwrap();
        assert!(check(Some(&recorded), "s").is_fresh());
        assert_eq!(check(Some(&recorded), "s2"), Freshness::Stale(StaleReason::SchemaChanged));

        fs::write(tmp.path().join(&path), "hand edited\n").unwrap();
        assert_eq!(
            check(Some(&recorded), "s"),
            Freshness::Stale(StaleReason::ArtifactOutdated { path: path.clone() })
        );
    }

    #[test]
    fn reasons_display_compactly() {
        assert_eq!(StaleReason::FingerprintChanged.to_string(), "document changed");
        assert_eq!(
            StaleReason::ArtifactMissing { path: PathBuf::from("a.d.ts") }.to_string(),
            "missing a.d.ts"
        );
    }
}

//! Error types for gqlet-cache.

use std::path::PathBuf;

use thiserror::Error;

use gqlet_core::{ConfigError, DiscoverError, DocumentPath, SchemaName};

/// Errors reported by the pipeline. Document-scoped variants name the
/// document; engine messages are carried verbatim.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A schema failed to load or check. Fatal to every document bound to it.
    #[error("Failed to load schema '{schema}' from {globs}:\n\n{message}")]
    SchemaLoad {
        schema: SchemaName,
        globs: String,
        message: String,
    },

    /// The document's schema failed to load earlier in the run.
    #[error("{document}: schema '{schema}' is unavailable")]
    SchemaUnavailable {
        document: DocumentPath,
        schema: SchemaName,
    },

    /// The engine rejected the document.
    #[error("Failed to generate {document}:\n\n{message}")]
    Generation {
        document: DocumentPath,
        message: String,
    },

    /// The engine failed to declare a schema's types.
    #[error("Failed to generate the declaration of schema '{schema}':\n\n{message}")]
    SchemaGeneration { schema: SchemaName, message: String },

    /// An artifact could not be written.
    #[error("{document}: failed to write {artifact}: {source}")]
    ArtifactWrite {
        document: DocumentPath,
        artifact: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest could not be persisted.
    #[error("manifest error at {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoverError),

    /// A document path lies outside the project root or climbs out of it.
    #[error("{path} is outside the project root")]
    OutsideRoot { path: PathBuf },
}

/// Manifest-level failures. `Corrupt` and `UnsupportedVersion` are recovered
/// by [`crate::manifest::load_at`] and never reach callers.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("corrupt manifest: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("unsupported manifest version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Convenience constructor for [`CodegenError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CodegenError {
    CodegenError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn manifest_err(path: impl Into<PathBuf>, source: impl Into<ManifestError>) -> CodegenError {
    CodegenError::Manifest {
        path: path.into(),
        source: source.into(),
    }
}

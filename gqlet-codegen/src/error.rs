//! Error types for gqlet-codegen.

use std::path::PathBuf;

use thiserror::Error;

use gqlet_core::DiscoverError;

/// Failures loading or checking a schema. Fatal to every document bound to
/// that schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// None of the schema globs matched a file.
    #[error("no schema files matched {globs}")]
    NoFiles { globs: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The SDL check failed. The message is kept exactly as produced.
    #[error("{message}")]
    Invalid { message: String },

    #[error(transparent)]
    Discover(#[from] DiscoverError),
}

/// Failures generating one document. Scoped to that document.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The document does not validate against its schema.
    #[error("{0}")]
    Document(String),

    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

//! gqlet core library: domain types, configuration and document discovery.
//!
//! Public API surface:
//! - [`types`]: newtypes and the per-run [`CodegenContext`]
//! - [`config`]: `.gqlet.yml` model and loading
//! - [`discover`]: glob-driven schema and document discovery
//! - [`error`]: [`ConfigError`], [`DiscoverError`]

pub mod config;
pub mod discover;
pub mod error;
pub mod types;

pub use config::{plain_relative, Config, GenerateOptions, Globs, ProjectConfig, SchemaBinding};
pub use error::{ConfigError, DiscoverError};
pub use types::{CodegenContext, DocumentPath, Fingerprint, SchemaName};

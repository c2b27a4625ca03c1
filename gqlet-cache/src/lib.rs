//! # gqlet-cache
//!
//! Incremental generation: fingerprints, the manifest, staleness checks,
//! all-or-nothing artifact writes and the orchestrator that ties them
//! together.
//!
//! Call [`generate`] to bring a whole project up to date, [`plan`] to see
//! what a run would do, or [`load_document`] to process a single document.

pub mod error;
pub mod fingerprint;
pub mod manifest;
pub mod orchestrator;
pub mod pipeline;
pub mod staleness;
pub mod writer;

pub use error::{CodegenError, ManifestError};
pub use manifest::{Manifest, ManifestEntry, ManifestStore, Pruned, SchemaEntry};
pub use orchestrator::{DocumentOutcome, SchemaDeclaration, SchemaOutcome};
pub use pipeline::{
    generate, load_document, plan, GenReport, LoadOutput, PlanStatus, PlannedDocument, RunOptions,
};
pub use staleness::{Freshness, StaleReason};

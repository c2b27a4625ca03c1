//! # gqlet-codegen
//!
//! The generation engine seam ([`CodegenEngine`]) and the bundled Tera
//! implementation ([`TemplateEngine`]), plus the schema loading and document
//! checks it relies on.
//!
//! ```rust,no_run
//! use gqlet_codegen::{CodegenEngine, GenerateRequest, TemplateEngine};
//!
//! fn render(req: &GenerateRequest<'_>) {
//!     if let Ok(engine) = TemplateEngine::new(None) {
//!         if let Ok(out) = engine.generate(req) {
//!             println!("{} bytes of module", out.module.len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod schema;
pub mod syntax;

pub use context::{SchemaTemplateContext, TemplateContext};
pub use engine::{CodegenEngine, GenerateRequest, GeneratedOutput, SchemaRequest, TemplateEngine};
pub use error::{GenerateError, SchemaError};
pub use schema::{Schema, SchemaSource};

//! appdeploy Engine - Jinja2 templating for manifest folders
//!
//! This crate provides:
//! - A MiniJinja-based renderer with manifest-oriented filters and functions
//! - Conditional elision: templates rendering to nothing produce no manifest
//! - Identification of rendered documents (kind + metadata.name)
//! - An extension hook for caller-supplied template functions

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod identify;

pub use engine::{Engine, EngineBuilder, Extension};
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
pub use identify::identify;

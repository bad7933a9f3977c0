//! appdeploy Core - Core types for templated manifest deployment
//!
//! This crate provides the foundational types used throughout appdeploy:
//! - `Manifest`: Identity (kind + name) of a rendered resource
//! - `RenderedManifest`: Identity plus the raw rendered bytes
//! - `Values`: Variable maps with deep merge support
//! - `ProcessVariables`: Resolved variables for a run
//! - `ManagedKinds`: Whitelist of kinds subject to reconciliation

pub mod error;
pub mod kinds;
pub mod manifest;
pub mod values;
pub mod variables;

pub use error::{CoreError, Result};
pub use kinds::{CRONJOB_KIND, DEFAULT_MANAGED_KINDS, ManagedKinds};
pub use manifest::{Manifest, RenderedManifest};
pub use values::{Values, parse_set_values};
pub use variables::{DEFAULT_NAMESPACE, Overrides, ProcessVariables};

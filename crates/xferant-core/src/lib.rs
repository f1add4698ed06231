//! Core types and constants shared across xferant crates.
//!
//! This crate provides:
//! - The five persisted entities ([`User`], [`VpnConfig`], [`ApiKey`],
//!   [`Payment`], [`Server`]) with their input and patch types
//! - Storage-independent validation via the [`Validate`] trait
//! - The error taxonomy ([`ErrorKind`]) every other crate maps into
//! - Default configuration values

pub mod defaults;
pub mod errors;
pub mod model;
pub mod validate;

pub use errors::ErrorKind;
pub use model::*;
pub use validate::{FieldError, Validate};

/// Project name.
pub const PROJECT_NAME: &str = "xferant-rs";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # xferant-rs
//!
//! Persistence and provisioning core for the Xferant VPN service.
//!
//! ## Crates
//!
//! - [`xferant_core`] - Entity model, validation and error taxonomy
//! - [`xferant_config`] - Configuration loading and validation
//! - [`xferant_store`] - Pooled SQL store, migrations and traffic accounting
//! - [`xferant_auth`] - API key and password verification
//! - [`xferant_fleet`] - Server status tracking and selection

pub mod cli;

pub use xferant_auth as auth;
pub use xferant_config as config;
pub use xferant_core as core;
pub use xferant_fleet as fleet;
pub use xferant_store as store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use xferant_auth::{AuthError, CredentialStore, Verifier};
    pub use xferant_config::{Config, load_config, validate_config};
    pub use xferant_core::{ErrorKind, FieldError, Validate};
    pub use xferant_fleet::{FleetError, FleetTracker};
    pub use xferant_store::{Order, Store, StoreConfig, StoreError, UsageRecorder};
}

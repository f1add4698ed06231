//! The persisted entities.
//!
//! Each entity comes in three shapes:
//! - the stored entity (`User`), including server-assigned fields
//! - an input used by `create` (`NewUser`)
//! - a patch used by `update` (`UserPatch`), where `None` leaves a field alone
//!
//! Immutable fields (user email, API key `key`) have no patch counterpart.

mod api_key;
mod lifecycle;
mod payment;
mod server;
mod user;
mod vpn_config;

pub use api_key::{ApiKey, ApiKeyFilter, ApiKeyPatch, NewApiKey, Scope};
pub use lifecycle::Lifecycle;
pub use payment::{NewPayment, Payment, PaymentFilter, PaymentPatch, PaymentStatus};
pub use server::{NewServer, Server, ServerFilter, ServerPatch, ServerStatus, validate_report};
pub use user::{NewUser, User, UserFilter, UserPatch, UserStatus};
pub use vpn_config::{NewVpnConfig, Protocol, VpnConfig, VpnConfigFilter, VpnConfigPatch};

//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Database Connection Defaults
// ============================================================================

/// Default database host.
pub const DEFAULT_DB_HOST: &str = "postgres";
/// Default database port.
pub const DEFAULT_DB_PORT: u16 = 5432;
/// Default database user.
pub const DEFAULT_DB_USER: &str = "xferant_user";
/// Default database name.
pub const DEFAULT_DB_NAME: &str = "xferant_vpn";
/// Default PostgreSQL SSL mode.
pub const DEFAULT_DB_SSL_MODE: &str = "disable";

// ============================================================================
// Connection Pool Defaults
// ============================================================================

/// Default number of idle connections kept in the pool.
pub const DEFAULT_POOL_MAX_IDLE: u32 = 10;
/// Default maximum number of open connections.
pub const DEFAULT_POOL_MAX_OPEN: u32 = 100;
/// Default maximum connection lifetime in seconds (1 hour).
pub const DEFAULT_POOL_MAX_LIFETIME_SECS: u64 = 3600;
/// Default time to wait for a pooled connection in seconds.
pub const DEFAULT_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 30;
/// Default idle timeout before surplus connections are closed, in seconds.
pub const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Entity Defaults
// ============================================================================

/// Default user traffic limit (1 GiB).
pub const DEFAULT_TRAFFIC_LIMIT_BYTES: i64 = 1024 * 1024 * 1024;
/// Default payment currency.
pub const DEFAULT_CURRENCY: &str = "RUB";
/// Upper bound of a server's reported load.
pub const MAX_LOAD_PERCENT: i64 = 100;

// ============================================================================
// Traffic Accounting Defaults
// ============================================================================

/// Default usage batch flush interval in seconds.
pub const DEFAULT_USAGE_FLUSH_INTERVAL_SECS: u64 = 30;
/// Default number of distinct users buffered before a forced flush.
pub const DEFAULT_USAGE_MAX_PENDING: usize = 1000;

// ============================================================================
// Credential Defaults
// ============================================================================

/// Public prefix of issued API keys.
pub const API_KEY_PREFIX: &str = "xf_";
/// Length of the random part of an API key.
pub const API_KEY_RANDOM_LEN: usize = 32;
/// Length of a generated API secret.
pub const API_SECRET_LEN: usize = 48;
/// Length of a SHA-256 hex digest.
pub const SECRET_HASH_LEN: usize = 64;
/// Maximum accepted key length.
pub const MAX_API_KEY_LEN: usize = 128;

// ============================================================================
// Logging Defaults
// ============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Default log format: "plain", "json" or "compact".
pub const DEFAULT_LOG_FORMAT: &str = "plain";
/// Default log output: "stderr" or "stdout".
pub const DEFAULT_LOG_OUTPUT: &str = "stderr";

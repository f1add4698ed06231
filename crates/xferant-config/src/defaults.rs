//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `xferant_core::defaults`.

use xferant_core::defaults;

/// Generate default value functions that forward to xferant_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_db_port                  => DEFAULT_DB_PORT: u16,
    default_pool_max_idle            => DEFAULT_POOL_MAX_IDLE: u32,
    default_pool_max_open            => DEFAULT_POOL_MAX_OPEN: u32,
    default_pool_max_lifetime_secs   => DEFAULT_POOL_MAX_LIFETIME_SECS: u64,
    default_pool_acquire_timeout_secs => DEFAULT_POOL_ACQUIRE_TIMEOUT_SECS: u64,
    default_pool_idle_timeout_secs   => DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64,
    default_usage_flush_interval_secs => DEFAULT_USAGE_FLUSH_INTERVAL_SECS: u64,
    default_usage_max_pending        => DEFAULT_USAGE_MAX_PENDING: usize,
}

default_string_fns! {
    default_db_host     => DEFAULT_DB_HOST,
    default_db_user     => DEFAULT_DB_USER,
    default_db_name     => DEFAULT_DB_NAME,
    default_db_ssl_mode => DEFAULT_DB_SSL_MODE,
    default_log_level   => DEFAULT_LOG_LEVEL,
    default_log_format  => DEFAULT_LOG_FORMAT,
    default_log_output  => DEFAULT_LOG_OUTPUT,
}

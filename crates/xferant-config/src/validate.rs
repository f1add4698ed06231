//! Configuration validation logic.

use crate::Config;
use crate::loader::ConfigError;

const SSL_MODES: [&str; 6] = [
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];
const LOG_FORMATS: [&str; 3] = ["plain", "json", "compact"];
const LOG_OUTPUTS: [&str; 2] = ["stderr", "stdout"];

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let db = &config.database;
    match &db.url {
        Some(url) => {
            if url.trim().is_empty() {
                return Err(ConfigError::Validation("database.url is empty".into()));
            }
        }
        None => {
            if db.host.trim().is_empty() {
                return Err(ConfigError::Validation("database.host is empty".into()));
            }
            if db.port == 0 {
                return Err(ConfigError::Validation("database.port must be > 0".into()));
            }
            if db.user.trim().is_empty() {
                return Err(ConfigError::Validation("database.user is empty".into()));
            }
            if db.name.trim().is_empty() {
                return Err(ConfigError::Validation("database.name is empty".into()));
            }
            if !SSL_MODES.contains(&db.ssl_mode.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "database.ssl_mode must be one of: {:?}",
                    SSL_MODES
                )));
            }
        }
    }

    let pool = &config.pool;
    if pool.max_open == 0 {
        return Err(ConfigError::Validation("pool.max_open must be > 0".into()));
    }
    if pool.max_idle > pool.max_open {
        return Err(ConfigError::Validation(
            "pool.max_idle must be <= pool.max_open".into(),
        ));
    }
    if pool.max_lifetime_secs == 0 {
        return Err(ConfigError::Validation(
            "pool.max_lifetime_secs must be > 0".into(),
        ));
    }
    if pool.idle_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "pool.idle_timeout_secs must be > 0".into(),
        ));
    }
    if pool.acquire_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "pool.acquire_timeout_secs must be > 0".into(),
        ));
    }

    if let Some(interval) = config.accounting.reset.interval()
        && interval.is_zero()
    {
        return Err(ConfigError::Validation(
            "accounting.reset.interval_secs must be > 0".into(),
        ));
    }
    if let Some(ref batch) = config.accounting.batch {
        if batch.flush_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "accounting.batch.flush_interval_secs must be > 0".into(),
            ));
        }
        if batch.max_pending == 0 {
            return Err(ConfigError::Validation(
                "accounting.batch.max_pending must be > 0".into(),
            ));
        }
    }

    if let Some(ref fleet) = config.fleet
        && fleet.freshness_window_secs == 0
    {
        return Err(ConfigError::Validation(
            "fleet.freshness_window_secs must be > 0".into(),
        ));
    }

    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::Validation("logging.level is empty".into()));
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::Validation(format!(
            "logging.format must be one of: {:?}",
            LOG_FORMATS
        )));
    }
    if !LOG_OUTPUTS.contains(&config.logging.output.as_str()) {
        return Err(ConfigError::Validation(format!(
            "logging.output must be one of: {:?}",
            LOG_OUTPUTS
        )));
    }
    Ok(())
}

//! CLI override definitions and application logic.
//!
//! Database overrides also read the `DB_*` environment variables used by
//! existing deployments.

use clap::Parser;

use crate::Config;
use crate::types::FleetConfig;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override the full database URL (takes precedence over the discrete fields)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
    /// Override database host
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,
    /// Override database port
    #[arg(long, env = "DB_PORT")]
    pub db_port: Option<u16>,
    /// Override database user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,
    /// Override database password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,
    /// Override database name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,
    /// Override PostgreSQL sslmode
    #[arg(long, env = "DB_SSL_MODE")]
    pub db_ssl_mode: Option<String>,
    /// Override idle connections kept in the pool
    #[arg(long)]
    pub pool_max_idle: Option<u32>,
    /// Override maximum open connections
    #[arg(long)]
    pub pool_max_open: Option<u32>,
    /// Override maximum connection lifetime (seconds)
    #[arg(long)]
    pub pool_max_lifetime_secs: Option<u64>,
    /// Override server freshness window (seconds)
    #[arg(long)]
    pub freshness_window_secs: Option<u64>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Override log format (plain/json/compact)
    #[arg(long)]
    pub log_format: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.database_url {
        config.database.url = Some(v.clone());
    }
    if let Some(v) = &overrides.db_host {
        config.database.host = v.clone();
    }
    if let Some(v) = overrides.db_port {
        config.database.port = v;
    }
    if let Some(v) = &overrides.db_user {
        config.database.user = v.clone();
    }
    if let Some(v) = &overrides.db_password {
        config.database.password = v.clone();
    }
    if let Some(v) = &overrides.db_name {
        config.database.name = v.clone();
    }
    if let Some(v) = &overrides.db_ssl_mode {
        config.database.ssl_mode = v.clone();
    }
    if let Some(v) = overrides.pool_max_idle {
        config.pool.max_idle = v;
    }
    if let Some(v) = overrides.pool_max_open {
        config.pool.max_open = v;
    }
    if let Some(v) = overrides.pool_max_lifetime_secs {
        config.pool.max_lifetime_secs = v;
    }
    if let Some(v) = overrides.freshness_window_secs {
        config
            .fleet
            .get_or_insert(FleetConfig {
                freshness_window_secs: v,
            })
            .freshness_window_secs = v;
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = v.clone();
    }
    if let Some(v) = &overrides.log_format {
        config.logging.format = v.clone();
    }
}

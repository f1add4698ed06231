//! Configuration loading and CLI definitions.
//!
//! A [`Config`] is resolved once at startup: parsed from a json/yaml/toml
//! file (or built from defaults), patched by [`CliOverrides`], checked by
//! [`validate_config`], and then passed by reference into every component.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

use serde::{Deserialize, Serialize};

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config};
pub use types::{
    AccountingConfig, DatabaseConfig, FleetConfig, LoggingConfig, PoolConfig, ResetPolicy,
    UsageBatchConfig,
};
pub use validate::validate_config;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub accounting: AccountingConfig,
    /// Required by components that select servers.
    #[serde(default)]
    pub fleet: Option<FleetConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// The fleet section, or a validation error when it was never configured.
    pub fn fleet(&self) -> Result<&FleetConfig, ConfigError> {
        self.fleet.as_ref().ok_or_else(|| {
            ConfigError::Validation("fleet.freshness_window_secs is required".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(ext: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_config_uses_defaults() {
        let file = write_temp("toml", "");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.database.host, "postgres");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.user, "xferant_user");
        assert_eq!(config.database.password, "");
        assert_eq!(config.database.name, "xferant_vpn");
        assert_eq!(config.database.ssl_mode, "disable");
        assert_eq!(config.pool.max_idle, 10);
        assert_eq!(config.pool.max_open, 100);
        assert_eq!(config.pool.max_lifetime_secs, 3600);
        assert_eq!(config.accounting.reset, ResetPolicy::Manual);
        assert!(config.fleet.is_none());
        validate_config(&config).unwrap();
    }

    #[test]
    fn loads_toml() {
        let file = write_temp(
            "toml",
            r#"
[database]
url = "sqlite::memory:"

[pool]
max_open = 4
max_idle = 2

[accounting.reset]
mode = "periodic"
interval_secs = 86400

[fleet]
freshness_window_secs = 90
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.database.url(), "sqlite::memory:");
        assert_eq!(config.pool.max_open, 4);
        assert_eq!(
            config.accounting.reset,
            ResetPolicy::Periodic {
                interval_secs: 86400
            }
        );
        assert_eq!(config.fleet().unwrap().freshness_window_secs, 90);
        validate_config(&config).unwrap();
    }

    #[test]
    fn loads_yaml_and_json() {
        let yaml = write_temp(
            "yaml",
            "database:\n  host: db.internal\n  password: s3cret\nfleet:\n  freshness_window_secs: 30\n",
        );
        let config = load_config(yaml.path()).unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.password, "s3cret");
        assert_eq!(config.fleet().unwrap().freshness_window_secs, 30);

        let json = write_temp(
            "json",
            r#"{"accounting": {"batch": {"max_pending": 50}}, "logging": {"format": "json"}}"#,
        );
        let config = load_config(json.path()).unwrap();
        let batch = config.accounting.batch.as_ref().unwrap();
        assert_eq!(batch.max_pending, 50);
        assert_eq!(batch.flush_interval_secs, 30);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = write_temp("ini", "x=1");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::UnsupportedFormat)
        ));
    }

    #[test]
    fn missing_fleet_section_is_reported() {
        let config = Config::default();
        let err = config.fleet().unwrap_err();
        assert!(err.to_string().contains("freshness_window_secs"));
        assert_eq!(err.kind(), xferant_core::ErrorKind::Validation);
    }

    #[test]
    fn overrides_apply_on_top_of_file_values() {
        let mut config = Config::default();
        let overrides = CliOverrides {
            db_host: Some("10.0.0.5".into()),
            db_port: Some(6432),
            db_password: Some("pw".into()),
            pool_max_open: Some(20),
            freshness_window_secs: Some(45),
            log_level: Some("debug".into()),
            ..Default::default()
        };
        apply_overrides(&mut config, &overrides);
        assert_eq!(
            config.database.url(),
            "postgres://xferant_user:pw@10.0.0.5:6432/xferant_vpn?sslmode=disable"
        );
        assert_eq!(config.pool.max_open, 20);
        assert_eq!(config.fleet().unwrap().freshness_window_secs, 45);
        assert_eq!(config.logging.level, "debug");
        validate_config(&config).unwrap();
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        config.pool.max_idle = 200;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.pool.idle_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.database.ssl_mode = "sometimes".into();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.fleet = Some(FleetConfig {
            freshness_window_secs: 0,
        });
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.accounting.reset = ResetPolicy::Periodic { interval_secs: 0 };
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.logging.output = "syslog".into();
        assert!(validate_config(&config).is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Lifecycle;
use crate::validate::{self, FieldError, Validate, string_enum};

string_enum! {
    /// Tunnelling protocol a configuration is issued for.
    Protocol ("protocol") {
        Vless => "vless",
        Vmess => "vmess",
        Trojan => "trojan",
    }
}

/// An issued VPN connection configuration.
///
/// At most one config per `(user_id, protocol)` is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnConfig {
    pub id: String,
    pub user_id: String,
    pub protocol: Protocol,
    /// Opaque client configuration (link, JSON, ...).
    pub payload: String,
    pub state: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for issuing a configuration. New configs start active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVpnConfig {
    pub user_id: String,
    pub protocol: Protocol,
    pub payload: String,
}

impl NewVpnConfig {
    pub fn new(user_id: impl Into<String>, protocol: Protocol, payload: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            protocol,
            payload: payload.into(),
        }
    }
}

impl Validate for NewVpnConfig {
    fn validate(&self) -> Result<(), FieldError> {
        validate::non_empty("user_id", &self.user_id)?;
        validate::non_empty("payload", &self.payload)?;
        Ok(())
    }
}

/// Changes to a configuration. State moves only through explicit
/// deactivate/revoke operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpnConfigPatch {
    pub payload: Option<String>,
}

impl Validate for VpnConfigPatch {
    fn validate(&self) -> Result<(), FieldError> {
        if let Some(payload) = &self.payload {
            validate::non_empty("payload", payload)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct VpnConfigFilter {
    pub user_id: Option<String>,
    pub protocol: Option<Protocol>,
    pub state: Option<Lifecycle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_round_trips_through_text() {
        for p in Protocol::ALL {
            assert_eq!(p.as_str().parse::<Protocol>(), Ok(*p));
        }
        assert_eq!("wireguard".parse::<Protocol>().unwrap_err().field, "protocol");
    }

    #[test]
    fn new_config_requires_payload_and_owner() {
        NewVpnConfig::new("u1", Protocol::Vless, "vless://...")
            .validate()
            .unwrap();
        assert_eq!(
            NewVpnConfig::new("u1", Protocol::Vless, "")
                .validate()
                .unwrap_err()
                .field,
            "payload"
        );
        assert_eq!(
            NewVpnConfig::new("", Protocol::Trojan, "x")
                .validate()
                .unwrap_err()
                .field,
            "user_id"
        );
    }
}

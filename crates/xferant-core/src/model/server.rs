use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::MAX_LOAD_PERCENT;
use crate::validate::{self, FieldError, Validate, string_enum};

string_enum! {
    /// Reported state of an edge server.
    ServerStatus ("status") {
        Online => "online",
        Offline => "offline",
        Maintenance => "maintenance",
    }
}

/// A VPN edge server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub hostname: String,
    pub ip_address: String,
    pub status: ServerStatus,
    pub location: String,
    /// Load in percent (0..=100), meaningful only while online.
    pub load_percent: i64,
    /// Time of the last status report.
    pub last_update: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Server {
    /// Whether the last report is within `window` of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match chrono::Duration::from_std(window) {
            Ok(window) => now - self.last_update <= window,
            // Windows too large for chrono never go stale.
            Err(_) => true,
        }
    }

    /// Status as readers should see it: stale servers count as offline.
    pub fn effective_status(&self, now: DateTime<Utc>, window: Duration) -> ServerStatus {
        if self.is_fresh(now, window) {
            self.status
        } else {
            ServerStatus::Offline
        }
    }
}

pub(crate) fn load_percent(value: i64) -> Result<(), FieldError> {
    if !(0..=MAX_LOAD_PERCENT).contains(&value) {
        return Err(FieldError::new(
            "load_percent",
            format!("must be within 0..={MAX_LOAD_PERCENT}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServer {
    pub name: String,
    pub hostname: String,
    pub ip_address: String,
    pub status: ServerStatus,
    pub location: String,
    pub load_percent: i64,
}

impl NewServer {
    /// An online server with no load.
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        ip_address: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            ip_address: ip_address.into(),
            status: ServerStatus::Online,
            location: location.into(),
            load_percent: 0,
        }
    }

    pub fn status(mut self, status: ServerStatus) -> Self {
        self.status = status;
        self
    }

    pub fn load_percent(mut self, load: i64) -> Self {
        self.load_percent = load;
        self
    }
}

impl Validate for NewServer {
    fn validate(&self) -> Result<(), FieldError> {
        validate::non_empty("name", &self.name)?;
        validate::non_empty("hostname", &self.hostname)?;
        validate::ip_address("ip_address", &self.ip_address)?;
        validate::non_empty("location", &self.location)?;
        load_percent(self.load_percent)
    }
}

/// Administrative changes to a server. Status and load arrive through
/// status reports instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerPatch {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
}

impl Validate for ServerPatch {
    fn validate(&self) -> Result<(), FieldError> {
        if let Some(name) = &self.name {
            validate::non_empty("name", name)?;
        }
        if let Some(hostname) = &self.hostname {
            validate::non_empty("hostname", hostname)?;
        }
        if let Some(ip) = &self.ip_address {
            validate::ip_address("ip_address", ip)?;
        }
        if let Some(location) = &self.location {
            validate::non_empty("location", location)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerFilter {
    pub status: Option<ServerStatus>,
    pub location: Option<String>,
    /// Only servers reported at or after this instant.
    pub updated_since: Option<DateTime<Utc>>,
}

/// Validate a status report before it is written.
pub fn validate_report(load: i64) -> Result<(), FieldError> {
    load_percent(load)
}

//! Edge server fleet tracking for xferant.
//!
//! Servers push status reports; [`FleetTracker::select_server`] picks the
//! least-loaded online server whose last report is within the freshness
//! window. A server that stopped reporting is treated as offline without
//! anything having to mark it so.
//!
//! The [`FleetTracker`] is cheap to clone and designed to be shared across
//! async tasks.

mod policy;


use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::debug;
use xferant_config::FleetConfig;
use xferant_core::{ErrorKind, Server, ServerFilter, ServerStatus};
use xferant_store::{Order, Store, StoreError};

pub use policy::least_loaded;

// ── Errors ──

#[derive(Error, Debug)]
pub enum FleetError {
    /// Nothing online and fresh matched. Expected under normal operation.
    #[error("no available server (location: {location:?})")]
    NoAvailableServer { location: Option<String> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FleetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAvailableServer { .. } => ErrorKind::NoAvailableServer,
            Self::Store(err) => err.kind(),
        }
    }
}

// ── Tracker ──

/// Status reports and server selection over a [`Store`].
#[derive(Debug, Clone)]
pub struct FleetTracker {
    store: Store,
    freshness: Duration,
}

impl FleetTracker {
    /// Create a tracker treating reports older than `freshness` as stale.
    pub fn new(store: Store, freshness: Duration) -> Self {
        Self { store, freshness }
    }

    pub fn from_config(store: Store, config: &FleetConfig) -> Self {
        Self::new(store, config.freshness_window())
    }

    /// The configured freshness window.
    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Store a status report. Sets the server's last update in the same write.
    pub async fn report_status(
        &self,
        server_id: &str,
        status: ServerStatus,
        load_percent: i64,
    ) -> Result<(), FleetError> {
        self.report_status_at(server_id, status, load_percent, Utc::now())
            .await
    }

    pub async fn report_status_at(
        &self,
        server_id: &str,
        status: ServerStatus,
        load_percent: i64,
        at: DateTime<Utc>,
    ) -> Result<(), FleetError> {
        self.store
            .report_server_status(server_id, status, load_percent, at)
            .await?;
        debug!(server_id, status = %status, load_percent, "server status reported");
        Ok(())
    }

    /// Pick the least-loaded online, fresh server, optionally in `location`.
    ///
    /// Ties on load go to the most recent report, then to the smaller name.
    pub async fn select_server(&self, location: Option<&str>) -> Result<Server, FleetError> {
        self.select_server_at(location, Utc::now()).await
    }

    pub async fn select_server_at(
        &self,
        location: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Server, FleetError> {
        let candidates = self.fresh_servers_at(location, now).await?;
        let selected = least_loaded(&candidates).cloned().ok_or_else(|| {
            FleetError::NoAvailableServer {
                location: location.map(str::to_string),
            }
        })?;
        debug!(
            server = %selected.name,
            load_percent = selected.load_percent,
            candidates = candidates.len(),
            "server selected"
        );
        Ok(selected)
    }

    /// Online servers with a fresh report, least loaded first.
    pub async fn fresh_servers(&self, location: Option<&str>) -> Result<Vec<Server>, FleetError> {
        self.fresh_servers_at(location, Utc::now()).await
    }

    pub async fn fresh_servers_at(
        &self,
        location: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Server>, FleetError> {
        let filter = ServerFilter {
            status: Some(ServerStatus::Online),
            location: location.map(str::to_string),
            updated_since: Some(self.cutoff(now)),
        };
        let servers = self
            .store
            .query::<Server>(&filter, Order::asc("load_percent"))?
            .all()
            .await?;
        Ok(servers
            .into_iter()
            .filter(|s| s.is_fresh(now, self.freshness))
            .collect())
    }

    /// Status of `server` as seen at `now`: stale servers are offline.
    pub fn effective_status(&self, server: &Server, now: DateTime<Utc>) -> ServerStatus {
        server.effective_status(now, self.freshness)
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.freshness)
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

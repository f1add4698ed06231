use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use xferant_core::{NewServer, Server, ServerFilter, ServerPatch, ServerStatus, validate_report};

use crate::error::StoreError;
use crate::record::{Condition, Param, Record, RowReader, to_micros};
use crate::store::Store;

#[async_trait]
impl Record for Server {
    const ENTITY: &'static str = "server";
    const TABLE: &'static str = "servers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "hostname",
        "ip_address",
        "status",
        "location",
        "load_percent",
        "last_update",
        "created_at",
    ];
    const SORTABLE: &'static [&'static str] =
        &["created_at", "last_update", "load_percent", "name", "location"];

    type New = NewServer;
    type Patch = ServerPatch;
    type Filter = ServerFilter;

    fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        let r = RowReader::new(row, Self::TABLE);
        Ok(Self {
            id: r.text("id")?,
            name: r.text("name")?,
            hostname: r.text("hostname")?,
            ip_address: r.text("ip_address")?,
            status: r.parse("status")?,
            location: r.text("location")?,
            load_percent: r.int("load_percent")?,
            last_update: r.time("last_update")?,
            created_at: r.time("created_at")?,
        })
    }

    fn insert_values(new: &NewServer, now: i64) -> Vec<(&'static str, Param)> {
        vec![
            ("name", new.name.as_str().into()),
            ("hostname", new.hostname.as_str().into()),
            ("ip_address", new.ip_address.as_str().into()),
            ("status", new.status.as_str().into()),
            ("location", new.location.as_str().into()),
            ("load_percent", new.load_percent.into()),
            ("last_update", now.into()),
            ("created_at", now.into()),
        ]
    }

    fn assignments(patch: &ServerPatch, _now: i64) -> Vec<(&'static str, Param)> {
        let mut sets: Vec<(&'static str, Param)> = Vec::new();
        if let Some(v) = &patch.name {
            sets.push(("name", v.as_str().into()));
        }
        if let Some(v) = &patch.hostname {
            sets.push(("hostname", v.as_str().into()));
        }
        if let Some(v) = &patch.ip_address {
            sets.push(("ip_address", v.as_str().into()));
        }
        if let Some(v) = &patch.location {
            sets.push(("location", v.as_str().into()));
        }
        sets
    }

    fn conditions(filter: &ServerFilter) -> Vec<Condition> {
        let mut conds = Vec::new();
        if let Some(status) = filter.status {
            conds.push(Condition::Eq("status", status.as_str().into()));
        }
        if let Some(location) = &filter.location {
            conds.push(Condition::Eq("location", location.as_str().into()));
        }
        if let Some(since) = filter.updated_since {
            conds.push(Condition::AtLeast("last_update", since.into()));
        }
        conds
    }
}

impl Store {
    /// Store a status report, stamping `last_update` in the same write.
    pub async fn report_server_status(
        &self,
        id: &str,
        status: ServerStatus,
        load_percent: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        validate_report(load_percent)?;
        let sql = self.sql(
            "UPDATE servers SET status = ?, load_percent = ?, last_update = ? WHERE id = ?",
        );
        let result = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(load_percent)
            .bind(to_micros(at))
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Server::ENTITY, id));
        }
        Ok(())
    }
}

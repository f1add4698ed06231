//! Lazy, restartable query results.

use std::marker::PhantomData;

use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use sqlx::AnyPool;

use crate::error::StoreError;
use crate::record::{Param, Record};

/// A prepared listing that touches the database only when iterated.
///
/// Every call to [`stream`](Self::stream) re-runs the statement, so the
/// same `Query` can be consumed any number of times.
pub struct Query<E> {
    pool: AnyPool,
    sql: String,
    params: Vec<Param>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Record> Query<E> {
    pub(crate) fn new(pool: AnyPool, sql: String, params: Vec<Param>) -> Self {
        Self {
            pool,
            sql,
            params,
            _entity: PhantomData,
        }
    }

    /// Stream rows as they arrive.
    pub fn stream(&self) -> BoxStream<'_, Result<E, StoreError>> {
        let mut query = sqlx::query(&self.sql);
        for param in &self.params {
            query = param.clone().bind(query);
        }
        query
            .fetch(&self.pool)
            .map(|row| row.map_err(StoreError::from).and_then(|row| E::from_row(&row)))
            .boxed()
    }

    /// Collect every row.
    pub async fn all(&self) -> Result<Vec<E>, StoreError> {
        self.stream().try_collect().await
    }

    /// The first row, if any.
    pub async fn first(&self) -> Result<Option<E>, StoreError> {
        self.stream().try_next().await
    }

    /// The statement this query runs.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl<E> std::fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

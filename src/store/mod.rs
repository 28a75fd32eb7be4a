//! Access to the hosted relational store.
//!
//! All persistence and row-level authorization live in the managed backend.
//! [`RemoteStore`] is the table-level seam (select / insert / update / upsert /
//! delete with row filters); [`Store`] wraps it with typed repositories.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod postgrest;
pub mod query;
pub mod repositories;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use query::{Filter, Query};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Row-level security or auth rejection.
    #[error("Permission denied on {table}: {message}")]
    PermissionDenied { table: String, message: String },

    #[error("Conflict on {table}: {message}")]
    Conflict { table: String, message: String },

    #[error("Remote store error on {table} ({status}): {message}")]
    Remote {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed row from {table}: {message}")]
    Decode { table: String, message: String },

    #[error("Refusing unfiltered {operation} on {table}")]
    Unfiltered { table: String, operation: String },
}

impl StoreError {
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Table-level operations of the hosted store.
///
/// Rows cross this boundary as JSON objects; [`Store`] and the repositories
/// turn them into typed records.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Inserts rows and returns them as stored (with generated columns).
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError>;

    /// Merges `patch` into every row matching `query`; returns updated rows.
    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError>;

    /// Insert-or-merge keyed on the `on_conflict` columns.
    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        on_conflict: &[&str],
    ) -> Result<Vec<Value>, StoreError>;

    /// Deletes every row matching `query`; returns how many were removed.
    async fn delete(&self, table: &str, query: &Query) -> Result<usize, StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Writes that would touch every row the caller can see are never intended.
pub(crate) fn require_filters(
    table: &str,
    query: &Query,
    operation: &str,
) -> Result<(), StoreError> {
    if query.has_filters() {
        Ok(())
    } else {
        Err(StoreError::Unfiltered {
            table: table.to_string(),
            operation: operation.to_string(),
        })
    }
}

pub(crate) fn decode_rows<T: DeserializeOwned>(
    table: &str,
    rows: Vec<Value>,
) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| StoreError::Decode {
                table: table.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

pub(crate) fn encode_row<T: Serialize>(table: &str, row: &T) -> Result<Value, StoreError> {
    serde_json::to_value(row).map_err(|e| StoreError::Decode {
        table: table.to_string(),
        message: e.to_string(),
    })
}

#[derive(Clone)]
pub struct Store {
    remote: Arc<dyn RemoteStore>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.remote.backend_name())
            .finish()
    }
}

impl Store {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    #[must_use]
    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    #[must_use]
    pub fn ratings(&self) -> repositories::ratings::RatingRepository {
        repositories::ratings::RatingRepository::new(self.remote.clone())
    }

    #[must_use]
    pub fn lists(&self) -> repositories::lists::ListRepository {
        repositories::lists::ListRepository::new(self.remote.clone())
    }

    #[must_use]
    pub fn diary(&self) -> repositories::diary::DiaryRepository {
        repositories::diary::DiaryRepository::new(self.remote.clone())
    }

    #[must_use]
    pub fn reviews(&self) -> repositories::reviews::ReviewRepository {
        repositories::reviews::ReviewRepository::new(self.remote.clone())
    }

    #[must_use]
    pub fn profiles(&self) -> repositories::profiles::ProfileRepository {
        repositories::profiles::ProfileRepository::new(self.remote.clone())
    }

    /// Removes a user's rows for one title from `table`.
    ///
    /// Used by the fan-out delete, where each table is handled independently.
    pub async fn delete_media_rows(
        &self,
        table: &str,
        user_id: crate::domain::UserId,
        media_column: &str,
        media_id: crate::domain::MediaId,
    ) -> Result<usize, StoreError> {
        let query = Query::new()
            .eq("user_id", user_id.to_string())
            .eq(media_column, media_id.value());
        self.remote.delete(table, &query).await
    }
}

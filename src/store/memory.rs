//! In-process [`RemoteStore`] with the same filter semantics as the hosted
//! backend. Backs the offline CLI mode and the test suites.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{Query, RemoteStore, StoreError, require_filters};
use crate::constants::tables;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    unique: HashMap<String, Vec<String>>,
    denied: RwLock<HashSet<String>>,
    latency: RwLock<Option<Duration>>,
}

impl MemoryStore {
    /// Creates a store with the unique constraints of the hosted schema.
    #[must_use]
    pub fn new() -> Self {
        let key = vec!["user_id".to_string(), "movie_id".to_string()];
        let unique = [
            tables::USER_RATINGS,
            tables::LEGACY_RATINGS,
            tables::FAVORITES,
            tables::WATCHLIST,
        ]
        .into_iter()
        .map(|t| (t.to_string(), key.clone()))
        .collect();

        Self {
            unique,
            ..Self::default()
        }
    }

    /// Rejects every operation on `table` the way row-level security would.
    pub async fn deny(&self, table: &str) {
        self.denied.write().await.insert(table.to_string());
    }

    pub async fn allow(&self, table: &str) {
        self.denied.write().await.remove(table);
    }

    /// Delays every operation, so that requests can overlap in tests.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Snapshot of a table's rows in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Loads rows verbatim, filling `id` and `created_at` when absent.
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();
        for mut row in rows {
            fill_generated(&mut row);
            entries.push(row);
        }
    }

    async fn gate(&self, table: &str) -> Result<(), StoreError> {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.denied.read().await.contains(table) {
            return Err(StoreError::PermissionDenied {
                table: table.to_string(),
                message: "new row violates row-level security policy".to_string(),
            });
        }
        Ok(())
    }

    fn conflict_query(row: &Value, columns: &[String]) -> Query {
        columns.iter().fold(Query::new(), |q, col| {
            q.eq(col, row.get(col).cloned().unwrap_or(Value::Null))
        })
    }
}

fn fill_generated(row: &mut Value) {
    if let Value::Object(map) = row {
        if map.get("id").is_none_or(Value::is_null) {
            map.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        if map.get("created_at").is_none_or(Value::is_null) {
            map.insert(
                "created_at".to_string(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }
    }
}

fn merge_into(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn require_object(table: &str, row: &Value) -> Result<(), StoreError> {
    if row.is_object() {
        Ok(())
    } else {
        Err(StoreError::Remote {
            table: table.to_string(),
            status: 400,
            message: "rows must be JSON objects".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.gate(table).await?;
        let tables = self.tables.read().await;
        let matched: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        Ok(query.shape(matched))
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        self.gate(table).await?;
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();
        let mut inserted = Vec::with_capacity(rows.len());

        for mut row in rows {
            require_object(table, &row)?;
            if let Some(columns) = self.unique.get(table) {
                let key = Self::conflict_query(&row, columns);
                if entries.iter().any(|r| key.matches(r)) {
                    return Err(StoreError::Conflict {
                        table: table.to_string(),
                        message: format!("duplicate key on ({})", columns.join(", ")),
                    });
                }
            }
            fill_generated(&mut row);
            entries.push(row.clone());
            inserted.push(row);
        }

        debug!(table, count = inserted.len(), "memory insert");
        Ok(inserted)
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        require_filters(table, query, "update")?;
        self.gate(table).await?;
        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();

        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                merge_into(row, &patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        on_conflict: &[&str],
    ) -> Result<Vec<Value>, StoreError> {
        self.gate(table).await?;
        let columns: Vec<String> = on_conflict.iter().map(ToString::to_string).collect();
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();
        let mut written = Vec::with_capacity(rows.len());

        for mut row in rows {
            require_object(table, &row)?;
            let key = Self::conflict_query(&row, &columns);
            if let Some(existing) = entries.iter_mut().find(|r| key.matches(r)) {
                merge_into(existing, &row);
                written.push(existing.clone());
            } else {
                fill_generated(&mut row);
                entries.push(row.clone());
                written.push(row);
            }
        }
        Ok(written)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<usize, StoreError> {
        require_filters(table, query, "delete")?;
        self.gate(table).await?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok(before - rows.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SortOrder;
    use serde_json::json;

    #[tokio::test]
    async fn insert_fills_generated_columns() {
        let store = MemoryStore::new();
        let rows = store
            .insert("movie_diary", vec![json!({ "user_id": "u1", "movie_id": 603 })])
            .await
            .unwrap();
        assert!(rows[0]["id"].is_string());
        assert!(rows[0]["created_at"].is_string());
    }

    #[tokio::test]
    async fn unique_constraint_rejects_duplicate_insert() {
        let store = MemoryStore::new();
        let row = json!({ "user_id": "u1", "movie_id": 603, "movie_title": "The Matrix" });
        store.insert("watchlist", vec![row.clone()]).await.unwrap();

        let err = store.insert("watchlist", vec![row]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_target() {
        let store = MemoryStore::new();
        let on_conflict = ["user_id", "movie_id"];
        store
            .upsert(
                "user_ratings",
                vec![json!({ "user_id": "u1", "movie_id": 603, "rating": 7 })],
                &on_conflict,
            )
            .await
            .unwrap();
        store
            .upsert(
                "user_ratings",
                vec![json!({ "user_id": "u1", "movie_id": 603, "rating": 9 })],
                &on_conflict,
            )
            .await
            .unwrap();

        let rows = store.rows("user_ratings").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["rating"], 9);
    }

    #[tokio::test]
    async fn select_applies_filters_order_and_limit() {
        let store = MemoryStore::new();
        store
            .seed(
                "tv_diary",
                vec![
                    json!({ "user_id": "u1", "tv_id": 1, "created_at": "2024-01-01T00:00:00Z" }),
                    json!({ "user_id": "u1", "tv_id": 1, "created_at": "2024-02-01T00:00:00Z" }),
                    json!({ "user_id": "u2", "tv_id": 1, "created_at": "2024-03-01T00:00:00Z" }),
                ],
            )
            .await;

        let rows = store
            .select(
                "tv_diary",
                &Query::new()
                    .eq("user_id", "u1")
                    .order("created_at", SortOrder::Descending)
                    .limit(1),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["created_at"], "2024-02-01T00:00:00Z");
    }

    #[tokio::test]
    async fn denied_table_reports_permission_error() {
        let store = MemoryStore::new();
        store.deny("ratings").await;

        let err = store
            .delete("ratings", &Query::new().eq("user_id", "u1"))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());

        store.allow("ratings").await;
        assert_eq!(
            store
                .delete("ratings", &Query::new().eq("user_id", "u1"))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn unfiltered_delete_is_refused() {
        let store = MemoryStore::new();
        let err = store.delete("watchlist", &Query::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unfiltered { .. }));
    }
}

use std::sync::Arc;

use crate::domain::{MediaId, UserId};
use crate::models::lists::{ListItem, ListKind};
use crate::store::{Query, RemoteStore, StoreError, decode_rows, encode_row};

/// Favorites and watchlist share a row shape and presence semantics.
pub struct ListRepository {
    remote: Arc<dyn RemoteStore>,
}

impl ListRepository {
    #[must_use]
    pub const fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    pub async fn list(&self, kind: ListKind, user_id: UserId) -> Result<Vec<ListItem>, StoreError> {
        let rows = self
            .remote
            .select(
                kind.table(),
                &Query::new().eq("user_id", user_id.to_string()),
            )
            .await?;
        decode_rows(kind.table(), rows)
    }

    pub async fn contains(
        &self,
        kind: ListKind,
        user_id: UserId,
        media_id: MediaId,
    ) -> Result<bool, StoreError> {
        let rows = self
            .remote
            .select(
                kind.table(),
                &Query::new()
                    .columns(&["movie_id"])
                    .eq("user_id", user_id.to_string())
                    .eq("movie_id", media_id.value())
                    .limit(1),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    pub async fn insert(&self, kind: ListKind, item: &ListItem) -> Result<(), StoreError> {
        let row = encode_row(kind.table(), item)?;
        self.remote.insert(kind.table(), vec![row]).await?;
        Ok(())
    }

    pub async fn remove(
        &self,
        kind: ListKind,
        user_id: UserId,
        media_id: MediaId,
    ) -> Result<usize, StoreError> {
        self.remote
            .delete(
                kind.table(),
                &Query::new()
                    .eq("user_id", user_id.to_string())
                    .eq("movie_id", media_id.value()),
            )
            .await
    }

    /// Brings the remote row in line with `present`. Repeating the call is a
    /// no-op, so a superseded request cannot flip the list twice.
    pub async fn ensure_presence(
        &self,
        kind: ListKind,
        item: &ListItem,
        present: bool,
    ) -> Result<(), StoreError> {
        let exists = self.contains(kind, item.user_id, item.movie_id).await?;
        match (exists, present) {
            (false, true) => self.insert(kind, item).await,
            (true, false) => self.remove(kind, item.user_id, item.movie_id).await.map(|_| ()),
            _ => Ok(()),
        }
    }
}

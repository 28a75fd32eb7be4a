use std::sync::Arc;

use crate::constants::tables;
use crate::domain::UserId;
use crate::models::profile::Profile;
use crate::store::{Query, RemoteStore, StoreError, decode_rows};

pub struct ProfileRepository {
    remote: Arc<dyn RemoteStore>,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    pub async fn get(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::PROFILES,
                &Query::new().eq("id", user_id.to_string()).limit(1),
            )
            .await?;
        Ok(decode_rows(tables::PROFILES, rows)?.into_iter().next())
    }
}

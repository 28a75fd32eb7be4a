//! [`WatchStateService`] over a [`Store`], with an in-memory per-user cache.
//!
//! List toggles are optimistic: the cache flips first, the remote write runs
//! on a spawned task, and a failure restores the last confirmed value. A newer
//! toggle on the same `(title, list)` key aborts the one still in flight.

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::constants::{diary as diary_defaults, ratings, tables};
use crate::domain::events::WatchStateEvent;
use crate::domain::{EpisodeKey, MediaId, MediaType, UserId};
use crate::models::diary::{
    DiaryPatch, DiaryTier, MovieDiaryEntry, MovieLog, NewTvDiaryEntry, TvDiaryEntry, most_recent,
};
use crate::models::lists::{ListKind, TitleRef};
use crate::models::rating::RatingRecord;
use crate::models::review::{ReviewDraft, ReviewRecord};
use crate::models::watch_state::{
    DeleteReport, EpisodeToggle, TableFailure, TitleSignals, ToggleOutcome, ToggleStatus,
    UnifiedWatchState, WatchedTitle,
};
use crate::services::aggregation::{self, SeasonReviewSummary};
use crate::services::watch_state_service::{WatchStateError, WatchStateService};
use crate::store::{Store, StoreError};

/// Per-user cache, populated on sign-in and dropped on sign-out.
#[derive(Debug, Default)]
pub struct WatchStateCache {
    titles: HashMap<MediaId, TitleSignals>,
    tv_diary: HashMap<MediaId, Vec<TvDiaryEntry>>,
    loaded: bool,
}

impl WatchStateCache {
    #[must_use]
    pub fn state(&self, media_id: MediaId) -> UnifiedWatchState {
        self.titles
            .get(&media_id)
            .map(TitleSignals::state)
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Cached diary rows of one show, newest first.
    #[must_use]
    pub fn tv_diary(&self, tv_id: MediaId) -> Option<&[TvDiaryEntry]> {
        self.tv_diary.get(&tv_id).map(Vec::as_slice)
    }

    fn title_mut(&mut self, media_id: MediaId) -> &mut TitleSignals {
        self.titles.entry(media_id).or_default()
    }

    fn replace(&mut self, titles: HashMap<MediaId, TitleSignals>) {
        self.titles = titles;
        self.tv_diary.clear();
        self.loaded = true;
    }

    fn clear(&mut self) {
        self.titles.clear();
        self.tv_diary.clear();
        self.loaded = false;
    }
}

struct InFlight {
    generation: u64,
    abort: AbortHandle,
    /// Last confirmed presence; restored if the remote write fails.
    baseline: bool,
    target: bool,
    landed: Arc<AtomicBool>,
}

impl InFlight {
    /// Presence the next toggle on the same key falls back to. A write that
    /// already landed is confirmed, even if its caller has not settled yet.
    fn successor_baseline(&self) -> bool {
        if self.landed.load(Ordering::Acquire) {
            self.target
        } else {
            self.baseline
        }
    }
}

pub struct RemoteWatchStateService {
    user_id: UserId,
    store: Store,
    cache: RwLock<WatchStateCache>,
    in_flight: Mutex<HashMap<(MediaId, ListKind), InFlight>>,
    generation: AtomicU64,
    event_bus: broadcast::Sender<WatchStateEvent>,
}

impl RemoteWatchStateService {
    #[must_use]
    pub fn new(
        user_id: UserId,
        store: Store,
        event_bus: broadcast::Sender<WatchStateEvent>,
    ) -> Self {
        Self {
            user_id,
            store,
            cache: RwLock::new(WatchStateCache::default()),
            in_flight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            event_bus,
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.cache.read().await.is_loaded()
    }

    fn publish(&self, event: WatchStateEvent) {
        let _ = self.event_bus.send(event);
    }

    fn publish_state(&self, media_id: MediaId, state: UnifiedWatchState) {
        self.publish(WatchStateEvent::StateChanged {
            user_id: self.user_id,
            media_id,
            state,
        });
    }

    async fn toggle(
        &self,
        kind: ListKind,
        title: TitleRef,
    ) -> Result<ToggleOutcome, WatchStateError> {
        let media_id = title.media_id;
        let key = (media_id, kind);
        let mut in_flight = self.in_flight.lock().await;

        let current = {
            let mut cache = self.cache.write().await;
            let signals = cache.title_mut(media_id);
            let current = signals.in_list(kind);
            signals.set_in_list(kind, !current);
            current
        };
        let requested = !current;

        let baseline = match in_flight.remove(&key) {
            Some(previous) => {
                previous.abort.abort();
                debug!(%media_id, list = kind.as_str(), "Superseding in-flight toggle");
                previous.successor_baseline()
            }
            None => current,
        };

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let lists = self.store.lists();
        let item = title.list_item(self.user_id);
        let landed = Arc::new(AtomicBool::new(false));
        let task = {
            let landed = Arc::clone(&landed);
            tokio::spawn(async move {
                lists.ensure_presence(kind, &item, requested).await?;
                landed.store(true, Ordering::Release);
                Ok::<(), StoreError>(())
            })
        };
        in_flight.insert(
            key,
            InFlight {
                generation,
                abort: task.abort_handle(),
                baseline,
                target: requested,
                landed,
            },
        );
        drop(in_flight);

        debug!(
            %media_id,
            list = kind.as_str(),
            requested,
            status = ToggleStatus::Pending.as_str(),
            "Toggle sent"
        );

        let result = task.await;

        let mut in_flight = self.in_flight.lock().await;
        let is_latest = in_flight
            .get(&key)
            .is_some_and(|f| f.generation == generation);

        if !is_latest {
            if matches!(result, Ok(Ok(())))
                && let Some(latest) = in_flight.get_mut(&key)
            {
                latest.baseline = requested;
            }
            drop(in_flight);
            return Ok(self
                .settle(kind, media_id, requested, ToggleStatus::Superseded)
                .await);
        }
        in_flight.remove(&key);

        let failure = match result {
            Ok(Ok(())) => {
                drop(in_flight);
                let outcome = self
                    .settle(kind, media_id, requested, ToggleStatus::Confirmed)
                    .await;
                self.publish_state(media_id, outcome.state);
                return Ok(outcome);
            }
            Ok(Err(e)) => WatchStateError::from(e),
            Err(e) => WatchStateError::Task(e.to_string()),
        };

        {
            let mut cache = self.cache.write().await;
            cache.title_mut(media_id).set_in_list(kind, baseline);
        }
        drop(in_flight);

        error!(
            user_id = %self.user_id,
            %media_id,
            list = kind.as_str(),
            error = %failure,
            "Toggle failed, cache rolled back"
        );
        record_toggle(kind, ToggleStatus::RolledBack);
        Err(failure)
    }

    async fn settle(
        &self,
        kind: ListKind,
        media_id: MediaId,
        requested: bool,
        status: ToggleStatus,
    ) -> ToggleOutcome {
        record_toggle(kind, status);
        debug!(%media_id, list = kind.as_str(), status = status.as_str(), "Toggle settled");
        ToggleOutcome {
            list: kind,
            media_id,
            requested,
            status,
            state: self.state(media_id).await,
        }
    }

    async fn record_diary_row(&self, media_id: MediaId, id: Uuid, rating: Option<i32>) {
        self.cache
            .write()
            .await
            .title_mut(media_id)
            .diary
            .insert(id, rating);
    }

    async fn forget_diary_rows(&self, media_id: MediaId, ids: &[Uuid]) {
        if let Some(signals) = self.cache.write().await.titles.get_mut(&media_id) {
            for id in ids {
                signals.diary.remove(id);
            }
        }
    }

    async fn update_tv_cache(&self, tv_id: MediaId, update: impl FnOnce(&mut Vec<TvDiaryEntry>)) {
        if let Some(rows) = self.cache.write().await.tv_diary.get_mut(&tv_id) {
            update(rows);
        }
    }
}

fn record_toggle(kind: ListKind, status: ToggleStatus) {
    metrics::counter!(
        "watch_state_toggles_total",
        "list" => kind.as_str(),
        "status" => status.as_str()
    )
    .increment(1);
}

fn validate_rating(rating: i32) -> Result<(), WatchStateError> {
    if (ratings::MIN..=ratings::MAX).contains(&rating) {
        Ok(())
    } else {
        Err(WatchStateError::Validation(format!(
            "rating must be between {} and {}, got {rating}",
            ratings::MIN,
            ratings::MAX
        )))
    }
}

fn validate_season(season_number: i32) -> Result<(), WatchStateError> {
    if season_number < 0 {
        return Err(WatchStateError::Validation(format!(
            "season number must not be negative, got {season_number}"
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl WatchStateService for RemoteWatchStateService {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    async fn load(&self) -> Result<(), WatchStateError> {
        let lists = self.store.lists();
        let rating_repo = self.store.ratings();
        let diary_repo = self.store.diary();
        let review_repo = self.store.reviews();

        let (favorites, watchlist, ratings, movie_diary, tv_diary, reviews) = tokio::try_join!(
            lists.list(ListKind::Favorites, self.user_id),
            lists.list(ListKind::Watchlist, self.user_id),
            rating_repo.list_for_user(self.user_id),
            diary_repo.movie_entries(self.user_id),
            diary_repo.all_tv_entries(self.user_id),
            review_repo.list_for_user(self.user_id),
        )?;

        let titles = aggregation::collect_signals(
            &favorites,
            &watchlist,
            &ratings,
            &movie_diary,
            &tv_diary,
            &reviews,
        );
        info!(
            user_id = %self.user_id,
            titles = titles.len(),
            favorites = favorites.len(),
            watchlist = watchlist.len(),
            ratings = ratings.len(),
            movie_diary = movie_diary.len(),
            tv_diary = tv_diary.len(),
            "Watch state loaded"
        );
        self.cache.write().await.replace(titles);
        Ok(())
    }

    async fn clear(&self) {
        let mut in_flight = self.in_flight.lock().await;
        for (_, pending) in in_flight.drain() {
            pending.abort.abort();
        }
        self.cache.write().await.clear();
        debug!(user_id = %self.user_id, "Watch state cleared");
    }

    async fn state(&self, media_id: MediaId) -> UnifiedWatchState {
        self.cache.read().await.state(media_id)
    }

    async fn toggle_like(&self, title: TitleRef) -> Result<ToggleOutcome, WatchStateError> {
        self.toggle(ListKind::Favorites, title).await
    }

    async fn toggle_watchlist(&self, title: TitleRef) -> Result<ToggleOutcome, WatchStateError> {
        self.toggle(ListKind::Watchlist, title).await
    }

    async fn set_rating(
        &self,
        title: TitleRef,
        rating: i32,
    ) -> Result<UnifiedWatchState, WatchStateError> {
        validate_rating(rating)?;

        let media_id = title.media_id;
        let record = RatingRecord {
            id: None,
            user_id: self.user_id,
            movie_id: media_id,
            movie_title: title.title,
            movie_poster: title.poster,
            rating,
            media_type: title.media_type,
        };

        self.store.ratings().upsert(&record).await.inspect_err(|e| {
            error!(user_id = %self.user_id, %media_id, rating, error = %e, "Failed to save rating");
        })?;

        let state = {
            let mut cache = self.cache.write().await;
            cache.title_mut(media_id).stored_rating = Some(rating);
            cache.state(media_id)
        };
        info!(%media_id, rating, "Rating saved");
        self.publish_state(media_id, state);
        Ok(state)
    }

    async fn load_tv_diary(&self, tv_id: MediaId) -> Result<Vec<TvDiaryEntry>, WatchStateError> {
        let entries = self.store.diary().tv_entries(self.user_id, tv_id).await?;
        self.cache
            .write()
            .await
            .tv_diary
            .insert(tv_id, entries.clone());
        Ok(entries)
    }

    async fn get_season_rollup(&self, tv_id: MediaId, season_number: i32) -> Option<i32> {
        self.cache
            .read()
            .await
            .tv_diary(tv_id)
            .and_then(|rows| aggregation::season_rollup(rows, season_number).average_rating)
    }

    async fn mark_episode_watched(
        &self,
        key: EpisodeKey,
        tv_name: Option<String>,
        runtime: Option<i32>,
    ) -> Result<EpisodeToggle, WatchStateError> {
        validate_season(key.season_number)?;
        if key.episode_number < 1 {
            return Err(WatchStateError::Validation(format!(
                "episode number must be positive, got {}",
                key.episode_number
            )));
        }

        let diary = self.store.diary();
        let existing = diary.episode_entries(self.user_id, &key).await?;
        let latest = most_recent(&existing, |e: &TvDiaryEntry| e.created_at).map(|e| e.id);

        let toggle = if let Some(id) = latest {
            diary.delete_tv(self.user_id, id).await.inspect_err(|e| {
                error!(episode = %key, error = %e, "Failed to unmark episode");
            })?;
            self.update_tv_cache(key.tv_id, |rows| rows.retain(|r| r.id != id))
                .await;
            self.forget_diary_rows(key.tv_id, &[id]).await;
            EpisodeToggle::Unmarked
        } else {
            let entry = NewTvDiaryEntry {
                user_id: self.user_id,
                tv_id: key.tv_id,
                tv_name,
                season_number: Some(key.season_number),
                episode_number: Some(key.episode_number),
                rating: None,
                notes: None,
                runtime: Some(runtime.unwrap_or(diary_defaults::DEFAULT_EPISODE_RUNTIME_MINUTES)),
                watched_date: Utc::now().date_naive(),
            };
            let inserted = diary.insert_tv(&entry).await.inspect_err(|e| {
                error!(episode = %key, error = %e, "Failed to mark episode");
            })?;
            self.record_diary_row(key.tv_id, inserted.id, inserted.rating)
                .await;
            self.update_tv_cache(key.tv_id, |rows| rows.insert(0, inserted))
                .await;
            EpisodeToggle::Marked
        };

        info!(episode = %key, watched = toggle.is_watched(), "Episode toggled");
        self.publish_state(key.tv_id, self.state(key.tv_id).await);
        self.publish(WatchStateEvent::EpisodeToggled {
            user_id: self.user_id,
            tv_id: key.tv_id,
            season_number: key.season_number,
            episode_number: key.episode_number,
            watched: toggle.is_watched(),
        });
        Ok(toggle)
    }

    async fn set_season_rating(
        &self,
        tv_id: MediaId,
        tv_name: Option<String>,
        season_number: i32,
        rating: i32,
    ) -> Result<Option<i32>, WatchStateError> {
        validate_rating(rating)?;
        validate_season(season_number)?;

        let diary = self.store.diary();
        let result = if rating == 0 {
            let cleared: Vec<Uuid> = diary
                .season_entries(self.user_id, tv_id, season_number)
                .await?
                .iter()
                .map(|e| e.id)
                .collect();
            let removed = diary
                .delete_season_tier(self.user_id, tv_id, season_number)
                .await?;
            debug!(%tv_id, season_number, removed, "Season rating cleared");
            self.forget_diary_rows(tv_id, &cleared).await;
            self.update_tv_cache(tv_id, |rows| {
                rows.retain(|r| r.tier() != DiaryTier::Season(season_number));
            })
            .await;
            None
        } else {
            let existing = diary
                .season_entries(self.user_id, tv_id, season_number)
                .await?;
            let current = most_recent(&existing, |e: &TvDiaryEntry| e.created_at).map(|e| e.id);

            let row = match current {
                Some(id) => diary
                    .update_tv_rating(self.user_id, id, rating)
                    .await?
                    .ok_or_else(|| WatchStateError::NotFound(format!("season diary entry {id}")))?,
                None => {
                    diary
                        .insert_tv(&NewTvDiaryEntry {
                            user_id: self.user_id,
                            tv_id,
                            tv_name,
                            season_number: Some(season_number),
                            episode_number: None,
                            rating: Some(rating),
                            notes: None,
                            runtime: None,
                            watched_date: Utc::now().date_naive(),
                        })
                        .await?
                }
            };
            self.record_diary_row(tv_id, row.id, row.rating).await;
            self.update_tv_cache(tv_id, |rows| {
                rows.retain(|r| r.id != row.id);
                rows.insert(0, row);
            })
            .await;
            Some(rating)
        };

        info!(%tv_id, season_number, rating = ?result, "Season rating saved");
        self.publish_state(tv_id, self.state(tv_id).await);
        self.publish(WatchStateEvent::SeasonRatingChanged {
            user_id: self.user_id,
            tv_id,
            season_number,
            rating: result,
        });
        Ok(result)
    }

    async fn log_movie(&self, log: MovieLog) -> Result<MovieDiaryEntry, WatchStateError> {
        if log.movie_title.trim().is_empty() {
            return Err(WatchStateError::Validation(
                "movie title is required".to_string(),
            ));
        }
        if let Some(rating) = log.rating {
            validate_rating(rating)?;
        }

        let entry = log.into_entry(self.user_id, Utc::now().date_naive());
        let inserted = self.store.diary().insert_movie(&entry).await?;

        let state = {
            let mut cache = self.cache.write().await;
            cache
                .title_mut(inserted.movie_id)
                .diary
                .insert(inserted.id, inserted.rating);
            cache.state(inserted.movie_id)
        };
        info!(media_id = %inserted.movie_id, date = %inserted.watched_date, "Movie logged");
        self.publish_state(inserted.movie_id, state);
        Ok(inserted)
    }

    async fn update_movie_diary_entry(
        &self,
        id: Uuid,
        patch: DiaryPatch,
    ) -> Result<MovieDiaryEntry, WatchStateError> {
        if patch.is_empty() {
            return Err(WatchStateError::Validation(
                "diary update has no fields".to_string(),
            ));
        }
        if let Some(rating) = patch.rating {
            validate_rating(rating)?;
        }

        let updated = self
            .store
            .diary()
            .update_movie(self.user_id, id, &patch)
            .await?
            .ok_or_else(|| WatchStateError::NotFound(format!("diary entry {id}")))?;

        let state = {
            let mut cache = self.cache.write().await;
            cache
                .title_mut(updated.movie_id)
                .diary
                .insert(updated.id, updated.rating);
            cache.state(updated.movie_id)
        };
        self.publish_state(updated.movie_id, state);
        Ok(updated)
    }

    async fn delete_movie_diary_entry(&self, id: Uuid) -> Result<(), WatchStateError> {
        let removed = self.store.diary().delete_movie(self.user_id, id).await?;
        if removed == 0 {
            return Err(WatchStateError::NotFound(format!("diary entry {id}")));
        }

        let changed = {
            let mut cache = self.cache.write().await;
            let media_id = cache
                .titles
                .iter_mut()
                .find_map(|(media_id, signals)| signals.diary.remove(&id).map(|_| *media_id));
            media_id.map(|m| (m, cache.state(m)))
        };
        if let Some((media_id, state)) = changed {
            self.publish_state(media_id, state);
        }
        Ok(())
    }

    async fn write_review(&self, draft: ReviewDraft) -> Result<ReviewRecord, WatchStateError> {
        draft.validate().map_err(WatchStateError::Validation)?;

        let title_level = draft.season_number.is_none() && draft.episode_number.is_none();
        let rated = draft.rating.is_some_and(|r| r > 0);
        let record = draft.into_record(self.user_id);
        let saved = self.store.reviews().insert(&record).await?;

        if title_level && rated {
            let state = {
                let mut cache = self.cache.write().await;
                cache.title_mut(saved.movie_id).rated_review = true;
                cache.state(saved.movie_id)
            };
            self.publish_state(saved.movie_id, state);
        }
        Ok(saved)
    }

    async fn watched_titles(&self) -> Result<Vec<WatchedTitle>, WatchStateError> {
        let rating_repo = self.store.ratings();
        let diary_repo = self.store.diary();
        let (ratings, entries) = tokio::try_join!(
            rating_repo.list_for_user(self.user_id),
            diary_repo.movie_entries(self.user_id),
        )?;
        Ok(aggregation::watched_titles(&ratings, &entries))
    }

    async fn season_review_summary(
        &self,
        tv_id: MediaId,
    ) -> Result<Vec<SeasonReviewSummary>, WatchStateError> {
        let rows = self.store.reviews().community_episode_ratings(tv_id).await?;
        Ok(aggregation::aggregate_season_reviews(&rows))
    }

    async fn delete_all_media_data(
        &self,
        media_id: MediaId,
        media_type: MediaType,
    ) -> DeleteReport {
        let diary_column = match media_type {
            MediaType::Movie => "movie_id",
            MediaType::Tv => "tv_id",
        };
        let targets = [
            (tables::USER_RATINGS, "movie_id"),
            (tables::LEGACY_RATINGS, "movie_id"),
            (tables::USER_REVIEWS, "movie_id"),
            (tables::WATCHLIST, "movie_id"),
            (tables::ENHANCED_WATCHLIST_ITEMS, "movie_id"),
            (tables::ACTIVITY_FEED, "movie_id"),
            (media_type.diary_table(), diary_column),
        ];

        let user_id = self.user_id;
        let store = &self.store;
        let results = join_all(targets.iter().map(|&(table, column)| async move {
            (
                table,
                store
                    .delete_media_rows(table, user_id, column, media_id)
                    .await,
            )
        }))
        .await;

        let mut report = DeleteReport {
            media_id,
            media_type,
            ..DeleteReport::default()
        };
        for (table, result) in results {
            match result {
                Ok(count) => {
                    debug!(table, count, %media_id, "Deleted media rows");
                    report.deleted.push(table.to_string());
                }
                Err(e) => {
                    warn!(table, %media_id, error = %e, "Failed to delete media rows");
                    report.failed.push(TableFailure {
                        table: table.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let cleared = |table: &str| report.deleted.iter().any(|t| t == table);
        let state = {
            let mut cache = self.cache.write().await;
            if let Some(signals) = cache.titles.get_mut(&media_id) {
                if cleared(tables::WATCHLIST) {
                    signals.watchlisted = false;
                }
                if cleared(tables::USER_RATINGS) {
                    signals.stored_rating = None;
                }
                if cleared(tables::USER_REVIEWS) {
                    signals.rated_review = false;
                }
                if cleared(media_type.diary_table()) {
                    signals.diary.clear();
                }
            }
            if media_type == MediaType::Tv && cleared(tables::TV_DIARY) {
                cache.tv_diary.remove(&media_id);
            }
            cache.state(media_id)
        };

        if report.is_complete() {
            info!(%media_id, %media_type, tables = report.deleted.len(), "Media data deleted");
        } else {
            warn!(
                %media_id,
                %media_type,
                failed = ?report.failed_tables(),
                "Media data partially deleted"
            );
        }

        self.publish(WatchStateEvent::MediaDataDeleted {
            user_id,
            media_id,
            failed_tables: report.failed_tables(),
        });
        self.publish_state(media_id, state);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn in_flight(baseline: bool, target: bool, landed: bool) -> InFlight {
        let task = tokio::spawn(async {});
        let abort = task.abort_handle();
        task.await.unwrap();
        InFlight {
            generation: 0,
            abort,
            baseline,
            target,
            landed: Arc::new(AtomicBool::new(landed)),
        }
    }

    #[tokio::test]
    async fn pending_write_passes_its_baseline_on() {
        let previous = in_flight(false, true, false).await;
        assert!(!previous.successor_baseline());
    }

    #[tokio::test]
    async fn landed_write_becomes_the_baseline() {
        let previous = in_flight(false, true, true).await;
        assert!(previous.successor_baseline());

        let previous = in_flight(true, false, true).await;
        assert!(!previous.successor_baseline());
    }
}

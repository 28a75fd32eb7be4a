//! Catalog pages: TMDB data joined with the signed-in user's watch state.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::clients::tmdb::{
    DiscoverParams, MovieDetails, MovieSummary, Paged, PersonDetails, SearchResult,
    SeasonDetails, TmdbClient, TmdbError, TvShowDetails,
};
use crate::constants::limits;
use crate::domain::{EpisodeKey, MediaId, MediaType};
use crate::models::diary::{DiaryTier, TvDiaryEntry, most_recent};
use crate::models::lists::TitleRef;
use crate::models::watch_state::UnifiedWatchState;
use crate::services::aggregation;
use crate::services::image::{ImageService, ImageSize};
use crate::services::watch_state_service::{WatchStateError, WatchStateService};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Tmdb(#[from] TmdbError),

    #[error(transparent)]
    WatchState(#[from] WatchStateError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "media_type", rename_all = "lowercase")]
pub enum TitleDetails {
    Movie(MovieDetails),
    Tv(TvShowDetails),
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleView {
    pub media_id: MediaId,
    pub media_type: MediaType,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub trailer_key: Option<String>,
    pub state: UnifiedWatchState,
    pub details: TitleDetails,
}

impl TitleView {
    #[must_use]
    pub fn title_ref(&self) -> TitleRef {
        TitleRef::new(
            self.media_id,
            self.title.clone(),
            self.poster_path.clone(),
            self.media_type,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeView {
    pub episode_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub still_url: Option<String>,
    pub watched: bool,
    pub rating: Option<i32>,
}

/// One season of a show with the user's progress.
///
/// `manual_rating` (the season-tier diary row) and `episode_rollup` (mean of
/// the episode ratings) are independent and never reconciled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonView {
    pub tv_id: MediaId,
    pub season_number: i32,
    pub name: Option<String>,
    pub poster_url: Option<String>,
    pub episodes: Vec<EpisodeView>,
    pub watched_count: usize,
    pub manual_rating: Option<i32>,
    pub episode_rollup: Option<i32>,
}

pub struct CatalogService {
    tmdb: Arc<TmdbClient>,
    images: ImageService,
}

impl CatalogService {
    #[must_use]
    pub const fn new(tmdb: Arc<TmdbClient>, images: ImageService) -> Self {
        Self { tmdb, images }
    }

    #[must_use]
    pub const fn images(&self) -> &ImageService {
        &self.images
    }

    /// Catalog facts for list and rating rows, without watch state.
    pub async fn title_ref(
        &self,
        media_type: MediaType,
        id: MediaId,
    ) -> Result<TitleRef, CatalogError> {
        let view = self.fetch_title(media_type, id).await?;
        Ok(view.title_ref())
    }

    pub async fn title_view(
        &self,
        media_type: MediaType,
        id: MediaId,
        watch: &dyn WatchStateService,
    ) -> Result<TitleView, CatalogError> {
        let mut view = self.fetch_title(media_type, id).await?;
        view.state = watch.state(id).await;
        Ok(view)
    }

    async fn fetch_title(
        &self,
        media_type: MediaType,
        id: MediaId,
    ) -> Result<TitleView, CatalogError> {
        let not_found = || CatalogError::NotFound(format!("{media_type} {id}"));

        let view = match media_type {
            MediaType::Movie => {
                let movie = self.tmdb.get_movie_details(id).await?.ok_or_else(not_found)?;
                TitleView {
                    media_id: id,
                    media_type,
                    title: movie.title.clone(),
                    overview: movie.overview.clone(),
                    poster_path: movie.poster_path.clone(),
                    poster_url: self.images.url(movie.poster_path.as_deref(), ImageSize::W500),
                    backdrop_url: self
                        .images
                        .url(movie.backdrop_path.as_deref(), ImageSize::W780),
                    trailer_key: movie
                        .videos
                        .as_ref()
                        .and_then(|v| v.trailer())
                        .map(|v| v.key.clone()),
                    state: UnifiedWatchState::default(),
                    details: TitleDetails::Movie(movie),
                }
            }
            MediaType::Tv => {
                let show = self
                    .tmdb
                    .get_tv_show_details(id)
                    .await?
                    .ok_or_else(not_found)?;
                TitleView {
                    media_id: id,
                    media_type,
                    title: show.name.clone(),
                    overview: show.overview.clone(),
                    poster_path: show.poster_path.clone(),
                    poster_url: self.images.url(show.poster_path.as_deref(), ImageSize::W500),
                    backdrop_url: self
                        .images
                        .url(show.backdrop_path.as_deref(), ImageSize::W780),
                    trailer_key: show
                        .videos
                        .as_ref()
                        .and_then(|v| v.trailer())
                        .map(|v| v.key.clone()),
                    state: UnifiedWatchState::default(),
                    details: TitleDetails::Tv(show),
                }
            }
        };
        Ok(view)
    }

    pub async fn season_view(
        &self,
        tv_id: MediaId,
        season_number: i32,
        watch: &dyn WatchStateService,
    ) -> Result<SeasonView, CatalogError> {
        let (details, entries) = tokio::join!(
            self.tmdb.get_season_details(tv_id, season_number),
            watch.load_tv_diary(tv_id),
        );
        let details = details?.ok_or_else(|| {
            CatalogError::NotFound(format!("season {season_number} of tv {tv_id}"))
        })?;
        let entries = entries?;

        Ok(build_season_view(tv_id, &details, &entries, &self.images))
    }

    /// Runtime to record when marking an episode watched.
    pub async fn episode_runtime(&self, key: &EpisodeKey) -> Result<Option<i32>, CatalogError> {
        let season = self
            .tmdb
            .get_season_details(key.tv_id, key.season_number)
            .await?;
        Ok(season
            .as_ref()
            .and_then(|s| s.episode(key.episode_number))
            .and_then(|e| e.runtime))
    }

    pub async fn person(&self, id: i64) -> Result<PersonDetails, CatalogError> {
        self.tmdb
            .get_person_details(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("person {id}")))
    }

    pub async fn discover(
        &self,
        params: &DiscoverParams,
    ) -> Result<Paged<MovieSummary>, CatalogError> {
        Ok(self.tmdb.discover_movies(params).await?)
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::Validation(
                "search query cannot be empty".to_string(),
            ));
        }

        let mut results = self.tmdb.search_multi(query, page).await?.results;
        results.truncate(limits::MAX_SEARCH_RESULTS);
        Ok(results)
    }
}

/// Joins catalog episodes with the user's diary rows of one show.
#[must_use]
pub fn build_season_view(
    tv_id: MediaId,
    details: &SeasonDetails,
    entries: &[TvDiaryEntry],
    images: &ImageService,
) -> SeasonView {
    let season_number = details.season_number;

    let mut by_episode: HashMap<i32, Vec<&TvDiaryEntry>> = HashMap::new();
    for entry in entries {
        if let DiaryTier::Episode { season, episode } = entry.tier()
            && season == season_number
        {
            by_episode.entry(episode).or_default().push(entry);
        }
    }

    let episodes: Vec<EpisodeView> = details
        .episodes
        .iter()
        .map(|episode| {
            let rows = by_episode.get(&episode.episode_number);
            let latest = rows.and_then(|rows| {
                most_recent(rows.iter().copied(), |e: &TvDiaryEntry| e.created_at)
            });
            EpisodeView {
                episode_number: episode.episode_number,
                name: episode.name.clone(),
                overview: episode.overview.clone(),
                air_date: episode.air_date.clone(),
                runtime: episode.runtime,
                still_url: images.url(episode.still_path.as_deref(), ImageSize::W185),
                watched: latest.is_some(),
                rating: latest.and_then(|e| e.rating).filter(|r| *r > 0),
            }
        })
        .collect();

    SeasonView {
        tv_id,
        season_number,
        name: details.name.clone(),
        poster_url: images.url(details.poster_path.as_deref(), ImageSize::W342),
        watched_count: episodes.iter().filter(|e| e.watched).count(),
        episodes,
        manual_rating: aggregation::manual_season_rating(entries, season_number),
        episode_rollup: aggregation::season_rollup(entries, season_number).average_rating,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::tmdb::Episode;
    use crate::config::TmdbConfig;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn episode(number: i32) -> Episode {
        Episode {
            id: i64::from(number),
            episode_number: number,
            season_number: 1,
            name: Some(format!("Episode {number}")),
            overview: None,
            air_date: None,
            runtime: Some(50),
            still_path: Some(format!("/still{number}.jpg")),
            vote_average: None,
        }
    }

    fn row(
        season: Option<i32>,
        episode: Option<i32>,
        rating: Option<i32>,
        minute: u32,
    ) -> TvDiaryEntry {
        TvDiaryEntry {
            id: Uuid::new_v4(),
            user_id: "6f1c1f0e-8d3b-4c41-9d8e-1c2b3a4d5e6f".parse().unwrap(),
            tv_id: MediaId::new(1399),
            tv_name: None,
            season_number: season,
            episode_number: episode,
            rating,
            notes: None,
            runtime: None,
            watched_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 10, minute, 0).unwrap(),
        }
    }

    #[test]
    fn season_view_reports_manual_rating_and_rollup_side_by_side() {
        let details = SeasonDetails {
            id: 1,
            season_number: 1,
            name: Some("Season 1".to_string()),
            overview: None,
            air_date: None,
            poster_path: None,
            episodes: vec![episode(1), episode(2), episode(3)],
        };
        let entries = vec![
            row(Some(1), Some(1), Some(8), 0),
            row(Some(1), Some(1), Some(6), 5),
            row(Some(1), Some(2), None, 1),
            row(Some(1), None, Some(3), 2),
            row(Some(2), Some(3), Some(10), 3),
        ];
        let images = ImageService::new(&TmdbConfig::default());

        let view = build_season_view(MediaId::new(1399), &details, &entries, &images);

        assert_eq!(view.watched_count, 2);
        assert!(view.episodes[0].watched);
        assert_eq!(view.episodes[0].rating, Some(6));
        assert!(view.episodes[1].watched);
        assert_eq!(view.episodes[1].rating, None);
        assert!(!view.episodes[2].watched);
        assert_eq!(view.manual_rating, Some(3));
        // (8 + 6) / 2
        assert_eq!(view.episode_rollup, Some(7));
        assert_eq!(
            view.episodes[0].still_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w185/still1.jpg")
        );
    }
}

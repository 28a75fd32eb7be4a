//! Pure functions that merge remote rows into derived views.
//!
//! Nothing here touches the network; the watch-state service fetches rows and
//! hands them over.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::MediaId;
use crate::models::diary::{DiaryTier, MovieDiaryEntry, TvDiaryEntry, most_recent};
use crate::models::lists::ListItem;
use crate::models::rating::RatingRecord;
use crate::models::review::{EpisodeRating, ReviewRecord};
use crate::models::watch_state::{TitleSignals, WatchedTitle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonRollup {
    pub season_number: i32,
    pub average_rating: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeReviewSummary {
    pub season_number: i32,
    pub episode_number: i32,
    pub average_rating: f64,
    pub rating_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonReviewSummary {
    pub season_number: i32,
    /// Mean of the raw ratings, not of the per-episode means.
    pub average_rating: f64,
    pub rating_count: usize,
    pub episodes: Vec<EpisodeReviewSummary>,
}

/// Rounded mean of the rated episode-tier rows of one season.
///
/// Season-tier rows (the manual season rating) never contribute.
#[must_use]
pub fn season_rollup(entries: &[TvDiaryEntry], season_number: i32) -> SeasonRollup {
    let ratings: Vec<i32> = entries
        .iter()
        .filter(|e| {
            matches!(e.tier(), DiaryTier::Episode { season, .. } if season == season_number)
        })
        .filter_map(|e| e.rating)
        .collect();

    let average_rating = if ratings.is_empty() {
        None
    } else {
        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let rounded = (sum as f64 / ratings.len() as f64).round() as i32;
        Some(rounded)
    };

    SeasonRollup {
        season_number,
        average_rating,
    }
}

/// Rating of the current season-tier row, if it carries a non-zero one.
#[must_use]
pub fn manual_season_rating(entries: &[TvDiaryEntry], season_number: i32) -> Option<i32> {
    let season_rows = entries
        .iter()
        .filter(|e| e.tier() == DiaryTier::Season(season_number));
    most_recent(season_rows, |e| e.created_at)
        .and_then(|e| e.rating)
        .filter(|r| *r > 0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[allow(clippy::cast_precision_loss)]
fn mean(sum: i64, count: usize) -> f64 {
    sum as f64 / count as f64
}

/// Community ratings grouped per season and episode, sorted by season then
/// episode.
#[must_use]
pub fn aggregate_season_reviews(rows: &[EpisodeRating]) -> Vec<SeasonReviewSummary> {
    let mut seasons: BTreeMap<i32, BTreeMap<i32, (i64, usize)>> = BTreeMap::new();
    for row in rows {
        let slot = seasons
            .entry(row.season_number)
            .or_default()
            .entry(row.episode_number)
            .or_default();
        slot.0 += i64::from(row.rating);
        slot.1 += 1;
    }

    seasons
        .into_iter()
        .map(|(season_number, episodes)| {
            let (sum, count) = episodes
                .values()
                .fold((0_i64, 0_usize), |(s, c), (es, ec)| (s + es, c + ec));

            let episodes = episodes
                .into_iter()
                .map(|(episode_number, (sum, count))| EpisodeReviewSummary {
                    season_number,
                    episode_number,
                    average_rating: round_one_decimal(mean(sum, count)),
                    rating_count: count,
                })
                .collect();

            SeasonReviewSummary {
                season_number,
                average_rating: round_one_decimal(mean(sum, count)),
                rating_count: count,
                episodes,
            }
        })
        .collect()
}

/// Builds the per-title signal map from a user's rows.
///
/// Every TV diary row, whatever its tier, counts as a diary entry of its
/// show. Only title-level reviews (no season/episode coordinates) mark a
/// title as watched.
#[must_use]
pub fn collect_signals(
    favorites: &[ListItem],
    watchlist: &[ListItem],
    ratings: &[RatingRecord],
    movie_diary: &[MovieDiaryEntry],
    tv_diary: &[TvDiaryEntry],
    reviews: &[ReviewRecord],
) -> HashMap<MediaId, TitleSignals> {
    let mut signals: HashMap<MediaId, TitleSignals> = HashMap::new();

    for item in favorites {
        signals.entry(item.movie_id).or_default().liked = true;
    }
    for item in watchlist {
        signals.entry(item.movie_id).or_default().watchlisted = true;
    }
    for record in ratings {
        signals.entry(record.movie_id).or_default().stored_rating = Some(record.rating);
    }
    for entry in movie_diary {
        signals
            .entry(entry.movie_id)
            .or_default()
            .diary
            .insert(entry.id, entry.rating);
    }
    for entry in tv_diary {
        signals
            .entry(entry.tv_id)
            .or_default()
            .diary
            .insert(entry.id, entry.rating);
    }
    for review in reviews {
        let title_level = review.season_number.is_none() && review.episode_number.is_none();
        if title_level && review.rating.is_some_and(|r| r > 0) {
            signals.entry(review.movie_id).or_default().rated_review = true;
        }
    }

    signals
}

/// Watched collection: one row per title, keeping the higher rating and the
/// latest diary date. Newest first, undated titles last.
#[must_use]
pub fn watched_titles(ratings: &[RatingRecord], diary: &[MovieDiaryEntry]) -> Vec<WatchedTitle> {
    let mut titles: HashMap<MediaId, WatchedTitle> = HashMap::new();

    for record in ratings {
        let title = titles.entry(record.movie_id).or_insert_with(|| WatchedTitle {
            media_id: record.movie_id,
            media_type: record.media_type,
            title: record.movie_title.clone(),
            poster: record.movie_poster.clone(),
            rating: None,
            last_watched: None,
        });
        title.rating = best(title.rating, record.effective_rating());
    }

    for entry in diary {
        let title = titles.entry(entry.movie_id).or_insert_with(|| WatchedTitle {
            media_id: entry.movie_id,
            media_type: crate::domain::MediaType::Movie,
            title: entry.movie_title.clone(),
            poster: entry.movie_poster.clone(),
            rating: None,
            last_watched: None,
        });
        title.rating = best(title.rating, entry.rating.filter(|r| *r > 0));
        title.last_watched = title.last_watched.max(Some(entry.watched_date));
        if title.poster.is_none() {
            title.poster.clone_from(&entry.movie_poster);
        }
    }

    let mut titles: Vec<WatchedTitle> = titles.into_values().collect();
    titles.sort_by(|a, b| {
        b.last_watched
            .cmp(&a.last_watched)
            .then_with(|| a.title.cmp(&b.title))
    });
    titles
}

fn best(current: Option<i32>, offered: Option<i32>) -> Option<i32> {
    match (current, offered) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MediaType, UserId};
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn user() -> UserId {
        "6f1c1f0e-8d3b-4c41-9d8e-1c2b3a4d5e6f".parse().unwrap()
    }

    fn tv_row(
        season: Option<i32>,
        episode: Option<i32>,
        rating: Option<i32>,
        minute: u32,
    ) -> TvDiaryEntry {
        TvDiaryEntry {
            id: Uuid::new_v4(),
            user_id: user(),
            tv_id: MediaId::new(1399),
            tv_name: Some("Game of Thrones".to_string()),
            season_number: season,
            episode_number: episode,
            rating,
            notes: None,
            runtime: Some(55),
            watched_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 20, minute, 0).unwrap(),
        }
    }

    fn rating(movie_id: i64, title: &str, value: i32) -> RatingRecord {
        RatingRecord {
            id: None,
            user_id: user(),
            movie_id: MediaId::new(movie_id),
            movie_title: title.to_string(),
            movie_poster: None,
            rating: value,
            media_type: MediaType::Movie,
        }
    }

    fn diary(movie_id: i64, title: &str, value: Option<i32>, day: u32) -> MovieDiaryEntry {
        MovieDiaryEntry {
            id: Uuid::new_v4(),
            user_id: user(),
            movie_id: MediaId::new(movie_id),
            movie_title: title.to_string(),
            movie_poster: Some("/poster.jpg".to_string()),
            rating: value,
            notes: None,
            watched_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn rollup_is_rounded_mean_of_rated_episodes() {
        let rows = vec![
            tv_row(Some(1), Some(1), Some(8), 0),
            tv_row(Some(1), Some(2), Some(6), 1),
            tv_row(Some(1), Some(3), Some(10), 2),
            tv_row(Some(1), Some(4), None, 3),
        ];
        assert_eq!(season_rollup(&rows, 1).average_rating, Some(8));
    }

    #[test]
    fn rollup_without_rated_episodes_is_none() {
        let rows = vec![tv_row(Some(1), Some(1), None, 0), tv_row(Some(2), Some(1), Some(9), 1)];
        assert_eq!(season_rollup(&rows, 1).average_rating, None);
    }

    #[test]
    fn rollup_ignores_season_and_series_rows() {
        let rows = vec![
            tv_row(Some(1), None, Some(2), 0),
            tv_row(None, None, Some(3), 1),
            tv_row(Some(1), Some(1), Some(9), 2),
            tv_row(Some(1), Some(2), Some(8), 3),
        ];
        // 8.5 rounds up
        assert_eq!(season_rollup(&rows, 1).average_rating, Some(9));
    }

    #[test]
    fn manual_season_rating_uses_latest_season_row() {
        let rows = vec![
            tv_row(Some(1), None, Some(4), 0),
            tv_row(Some(1), None, Some(7), 5),
            tv_row(Some(1), Some(1), Some(10), 9),
        ];
        assert_eq!(manual_season_rating(&rows, 1), Some(7));
        assert_eq!(manual_season_rating(&rows, 2), None);
    }

    #[test]
    fn review_aggregation_rounds_and_sorts() {
        let row = |season, episode, rating| EpisodeRating {
            user_id: user(),
            season_number: season,
            episode_number: episode,
            rating,
        };
        let rows = vec![
            row(2, 1, 5),
            row(1, 2, 7),
            row(1, 1, 8),
            row(1, 1, 9),
            row(1, 1, 9),
        ];

        let seasons = aggregate_season_reviews(&rows);
        assert_eq!(seasons.len(), 2);

        let first = &seasons[0];
        assert_eq!(first.season_number, 1);
        assert_eq!(first.rating_count, 4);
        // (8 + 9 + 9 + 7) / 4 = 8.25
        assert!((first.average_rating - 8.3).abs() < f64::EPSILON);
        assert_eq!(first.episodes[0].episode_number, 1);
        assert!((first.episodes[0].average_rating - 8.7).abs() < f64::EPSILON);
        assert_eq!(first.episodes[1].episode_number, 2);

        assert_eq!(seasons[1].season_number, 2);
        assert!((seasons[1].average_rating - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn season_average_is_not_mean_of_episode_means() {
        let row = |episode, rating| EpisodeRating {
            user_id: user(),
            season_number: 1,
            episode_number: episode,
            rating,
        };
        let rows = vec![row(1, 10), row(2, 4), row(2, 4), row(2, 4)];
        let season = &aggregate_season_reviews(&rows)[0];
        // raw mean 5.5, mean of episode means would be 7.0
        assert!((season.average_rating - 5.5).abs() < f64::EPSILON);
    }

    #[test]
    fn signals_combine_every_source() {
        let item = |id: i64| ListItem {
            id: None,
            user_id: user(),
            movie_id: MediaId::new(id),
            movie_title: "x".to_string(),
            movie_poster: None,
            media_type: MediaType::Movie,
            added_at: None,
        };
        let review = ReviewRecord {
            id: None,
            user_id: user(),
            movie_id: MediaId::new(13),
            media_type: MediaType::Movie,
            rating: Some(6),
            review_text: None,
            is_spoiler: None,
            season_number: None,
            episode_number: None,
            created_at: None,
        };

        let signals = collect_signals(
            &[item(603)],
            &[item(603), item(680)],
            &[rating(603, "The Matrix", 9)],
            &[diary(680, "Pulp Fiction", Some(7), 2)],
            &[tv_row(Some(1), Some(1), Some(9), 0), tv_row(Some(1), Some(2), None, 1)],
            &[review],
        );

        let matrix = signals[&MediaId::new(603)].state();
        assert!(matrix.is_liked && matrix.is_in_watchlist && matrix.is_watched);
        assert_eq!(matrix.rating, Some(9));

        let pulp = signals[&MediaId::new(680)].state();
        assert!(!pulp.is_liked);
        assert!(pulp.is_watched);
        assert_eq!(pulp.rating, Some(7));

        assert!(signals[&MediaId::new(13)].state().is_watched);

        let got = signals[&MediaId::new(1399)].state();
        assert!(got.is_watched);
        assert_eq!(got.rating, Some(9));
    }

    #[test]
    fn watched_titles_dedup_and_keep_higher_rating() {
        let ratings = vec![rating(603, "The Matrix", 7), rating(13, "Forrest Gump", 0)];
        let diary = vec![
            diary(603, "The Matrix", Some(9), 1),
            diary(603, "The Matrix", None, 5),
            diary(680, "Pulp Fiction", None, 3),
        ];

        let titles = watched_titles(&ratings, &diary);
        assert_eq!(titles.len(), 3);

        assert_eq!(titles[0].media_id, MediaId::new(603));
        assert_eq!(titles[0].rating, Some(9));
        assert_eq!(titles[0].last_watched, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(titles[1].media_id, MediaId::new(680));
        assert_eq!(titles[2].media_id, MediaId::new(13));
        assert_eq!(titles[2].rating, None);
    }
}

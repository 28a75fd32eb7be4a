use sceneburn::domain::events::WatchStateEvent;
use sceneburn::domain::{EpisodeKey, MediaId, MediaType, UserId};
use sceneburn::models::diary::{DiaryPatch, MovieLog};
use sceneburn::models::lists::TitleRef;
use sceneburn::models::review::ReviewDraft;
use sceneburn::models::watch_state::{EpisodeToggle, ToggleStatus};
use sceneburn::services::{RemoteWatchStateService, WatchStateError, WatchStateService};
use sceneburn::store::{MemoryStore, Store};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

const MATRIX: MediaId = MediaId::new(603);
const GAME_OF_THRONES: MediaId = MediaId::new(1399);

struct Harness {
    memory: Arc<MemoryStore>,
    service: RemoteWatchStateService,
    user_id: UserId,
    events: broadcast::Receiver<WatchStateEvent>,
}

async fn harness() -> Harness {
    let memory = Arc::new(MemoryStore::new());
    harness_with(memory).await
}

async fn harness_with(memory: Arc<MemoryStore>) -> Harness {
    let user_id = UserId::new(Uuid::new_v4());
    let (tx, events) = broadcast::channel(64);
    let service = RemoteWatchStateService::new(user_id, Store::new(memory.clone()), tx);
    service.load().await.expect("load");
    Harness {
        memory,
        service,
        user_id,
        events,
    }
}

fn matrix() -> TitleRef {
    TitleRef::new(
        MATRIX,
        "The Matrix",
        Some("/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg".to_string()),
        MediaType::Movie,
    )
}

fn episode_row(
    user_id: UserId,
    season: i32,
    episode: Option<i32>,
    rating: Option<i32>,
) -> serde_json::Value {
    json!({
        "user_id": user_id,
        "tv_id": GAME_OF_THRONES,
        "tv_name": "Game of Thrones",
        "season_number": season,
        "episode_number": episode,
        "rating": rating,
        "watched_date": "2024-06-01",
    })
}

#[tokio::test]
async fn two_watchlist_toggles_restore_presence() {
    let h = harness().await;

    let first = h.service.toggle_watchlist(matrix()).await.unwrap();
    assert_eq!(first.status, ToggleStatus::Confirmed);
    assert!(first.requested);
    assert!(h.service.is_in_watchlist(MATRIX).await);
    assert_eq!(h.memory.rows("watchlist").await.len(), 1);

    let second = h.service.toggle_watchlist(matrix()).await.unwrap();
    assert_eq!(second.status, ToggleStatus::Confirmed);
    assert!(!second.requested);
    assert!(!h.service.is_in_watchlist(MATRIX).await);
    assert!(h.memory.rows("watchlist").await.is_empty());
}

#[tokio::test]
async fn season_rollup_averages_rated_episodes() {
    let memory = Arc::new(MemoryStore::new());
    let h = harness_with(memory.clone()).await;
    memory
        .seed(
            "tv_diary",
            vec![
                episode_row(h.user_id, 1, Some(1), Some(8)),
                episode_row(h.user_id, 1, Some(2), Some(6)),
                episode_row(h.user_id, 1, Some(3), Some(10)),
                episode_row(h.user_id, 1, Some(4), None),
                // Season-tier rating stays out of the rollup.
                episode_row(h.user_id, 1, None, Some(2)),
            ],
        )
        .await;

    assert_eq!(h.service.get_season_rollup(GAME_OF_THRONES, 1).await, None);

    h.service.load_tv_diary(GAME_OF_THRONES).await.unwrap();
    assert_eq!(h.service.get_season_rollup(GAME_OF_THRONES, 1).await, Some(8));
    assert_eq!(h.service.get_season_rollup(GAME_OF_THRONES, 2).await, None);
}

#[tokio::test]
async fn season_without_rated_episodes_has_no_rollup() {
    let memory = Arc::new(MemoryStore::new());
    let h = harness_with(memory.clone()).await;
    memory
        .seed(
            "tv_diary",
            vec![
                episode_row(h.user_id, 2, Some(1), None),
                episode_row(h.user_id, 2, Some(2), None),
            ],
        )
        .await;

    h.service.load_tv_diary(GAME_OF_THRONES).await.unwrap();
    assert_eq!(h.service.get_season_rollup(GAME_OF_THRONES, 2).await, None);
}

#[tokio::test]
async fn season_rating_zero_deletes_but_title_rating_zero_is_stored() {
    let h = harness().await;

    let stored = h
        .service
        .set_season_rating(GAME_OF_THRONES, Some("Game of Thrones".to_string()), 1, 7)
        .await
        .unwrap();
    assert_eq!(stored, Some(7));
    assert_eq!(h.memory.rows("tv_diary").await.len(), 1);

    // Updating keeps a single season-tier row.
    h.service
        .set_season_rating(GAME_OF_THRONES, None, 1, 9)
        .await
        .unwrap();
    let rows = h.memory.rows("tv_diary").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["rating"], 9);

    let cleared = h
        .service
        .set_season_rating(GAME_OF_THRONES, None, 1, 0)
        .await
        .unwrap();
    assert_eq!(cleared, None);
    assert!(h.memory.rows("tv_diary").await.is_empty());

    h.service.set_rating(matrix(), 0).await.unwrap();
    let ratings = h.memory.rows("user_ratings").await;
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0]["rating"], 0);
    assert_eq!(h.service.get_rating(MATRIX).await, None);
    assert!(!h.service.state(MATRIX).await.is_watched);
}

#[tokio::test]
async fn liked_watchlisted_and_rated_hold_together() {
    let h = harness().await;

    h.service.toggle_like(matrix()).await.unwrap();
    h.service.toggle_watchlist(matrix()).await.unwrap();
    h.service.set_rating(matrix(), 8).await.unwrap();

    let state = h.service.state(MATRIX).await;
    assert!(state.is_liked);
    assert!(state.is_in_watchlist);
    assert!(state.is_watched);
    assert_eq!(state.rating, Some(8));
}

#[tokio::test]
async fn delete_all_media_data_survives_a_denied_table() {
    let h = harness().await;
    h.service.toggle_like(matrix()).await.unwrap();
    h.service.toggle_watchlist(matrix()).await.unwrap();
    h.service.set_rating(matrix(), 9).await.unwrap();
    h.memory
        .seed(
            "ratings",
            vec![json!({
                "user_id": h.user_id,
                "movie_id": 603,
                "movie_title": "The Matrix",
                "rating": 9,
            })],
        )
        .await;
    h.memory.deny("ratings").await;

    let report = h
        .service
        .delete_all_media_data(MATRIX, MediaType::Movie)
        .await;

    assert!(!report.is_complete());
    assert_eq!(report.failed_tables(), vec!["ratings".to_string()]);
    assert!(report.deleted.contains(&"user_ratings".to_string()));
    assert!(report.deleted.contains(&"watchlist".to_string()));
    assert!(report.deleted.contains(&"movie_diary".to_string()));
    assert_eq!(report.deleted.len(), 6);

    assert!(h.memory.rows("user_ratings").await.is_empty());
    assert!(h.memory.rows("watchlist").await.is_empty());
    h.memory.allow("ratings").await;
    assert_eq!(h.memory.rows("ratings").await.len(), 1);

    let state = h.service.state(MATRIX).await;
    assert!(!state.is_in_watchlist);
    assert_eq!(state.rating, None);
    // Favorites are outside the fan-out.
    assert!(state.is_liked);
    assert_eq!(h.memory.rows("favorites").await.len(), 1);
}

#[tokio::test]
async fn rate_then_watchlist_end_to_end() {
    let h = harness().await;

    h.service.set_rating(matrix(), 9).await.unwrap();
    assert_eq!(h.service.get_rating(MATRIX).await, Some(9));

    h.service.toggle_watchlist(matrix()).await.unwrap();
    assert!(h.service.is_in_watchlist(MATRIX).await);
    assert!(!h.service.is_liked(MATRIX).await);

    // A fresh session sees the same state.
    let reloaded = harness_with(h.memory.clone()).await;
    assert_eq!(reloaded.service.get_rating(MATRIX).await, None);
    let same_user = RemoteWatchStateService::new(
        h.user_id,
        Store::new(h.memory.clone()),
        broadcast::channel(4).0,
    );
    same_user.load().await.unwrap();
    assert_eq!(same_user.get_rating(MATRIX).await, Some(9));
    assert!(same_user.is_in_watchlist(MATRIX).await);
}

#[tokio::test]
async fn tv_diary_rows_feed_the_show_state() {
    let memory = Arc::new(MemoryStore::new());
    let user_id = UserId::new(Uuid::new_v4());
    memory
        .seed("tv_diary", vec![episode_row(user_id, 1, Some(1), Some(9))])
        .await;
    let service =
        RemoteWatchStateService::new(user_id, Store::new(memory), broadcast::channel(4).0);
    service.load().await.unwrap();

    let state = service.state(GAME_OF_THRONES).await;
    assert!(state.is_watched);
    assert_eq!(state.rating, Some(9));

    let breaking_bad = MediaId::new(1396);
    let key = EpisodeKey::new(breaking_bad, 1, 2);
    assert!(!service.state(breaking_bad).await.is_watched);

    service.mark_episode_watched(key, None, Some(47)).await.unwrap();
    assert!(service.state(breaking_bad).await.is_watched);

    service.mark_episode_watched(key, None, None).await.unwrap();
    assert!(!service.state(breaking_bad).await.is_watched);

    service
        .set_season_rating(breaking_bad, None, 1, 7)
        .await
        .unwrap();
    assert_eq!(service.get_rating(breaking_bad).await, Some(7));

    service
        .set_season_rating(breaking_bad, None, 1, 0)
        .await
        .unwrap();
    let state = service.state(breaking_bad).await;
    assert_eq!(state.rating, None);
    assert!(!state.is_watched);
}

#[tokio::test]
async fn newer_toggle_supersedes_the_one_in_flight() {
    let h = harness().await;
    h.memory.set_latency(Some(Duration::from_millis(50))).await;

    let (first, second) = tokio::join!(h.service.toggle_watchlist(matrix()), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.service.toggle_watchlist(matrix()).await
    });

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.status, ToggleStatus::Superseded);
    assert_eq!(second.status, ToggleStatus::Confirmed);
    assert!(!second.requested);

    h.memory.set_latency(None).await;
    assert!(!h.service.is_in_watchlist(MATRIX).await);
    assert!(h.memory.rows("watchlist").await.is_empty());
}

#[tokio::test]
async fn failed_toggle_rolls_back_the_cache() {
    let h = harness().await;
    h.memory.deny("favorites").await;

    let err = h.service.toggle_like(matrix()).await.unwrap_err();
    assert!(err.is_permission_denied());
    assert!(!h.service.is_liked(MATRIX).await);
}

#[tokio::test]
async fn invalid_rating_is_rejected_before_any_write() {
    let h = harness().await;

    let err = h.service.set_rating(matrix(), 11).await.unwrap_err();
    assert!(matches!(err, WatchStateError::Validation(_)));
    assert!(h.memory.rows("user_ratings").await.is_empty());

    let err = h
        .service
        .write_review(ReviewDraft {
            media_id: MATRIX,
            ..ReviewDraft::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WatchStateError::Validation(_)));
    assert!(h.memory.rows("user_reviews").await.is_empty());
}

#[tokio::test]
async fn marking_an_episode_twice_unmarks_it() {
    let h = harness().await;
    let key = EpisodeKey::new(GAME_OF_THRONES, 1, 1);

    let marked = h
        .service
        .mark_episode_watched(key, Some("Game of Thrones".to_string()), None)
        .await
        .unwrap();
    assert_eq!(marked, EpisodeToggle::Marked);
    let rows = h.memory.rows("tv_diary").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["runtime"], 45);

    let unmarked = h
        .service
        .mark_episode_watched(key, None, Some(62))
        .await
        .unwrap();
    assert_eq!(unmarked, EpisodeToggle::Unmarked);
    assert!(h.memory.rows("tv_diary").await.is_empty());
}

#[tokio::test]
async fn movie_diary_drives_watched_state_and_collection() {
    let h = harness().await;

    let entry = h
        .service
        .log_movie(MovieLog {
            movie_id: MATRIX,
            movie_title: "The Matrix".to_string(),
            rating: Some(7),
            ..MovieLog::default()
        })
        .await
        .unwrap();
    let state = h.service.state(MATRIX).await;
    assert!(state.is_watched);
    assert_eq!(state.rating, Some(7));

    let updated = h
        .service
        .update_movie_diary_entry(
            entry.id,
            DiaryPatch {
                rating: Some(10),
                ..DiaryPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.rating, Some(10));
    assert_eq!(h.service.get_rating(MATRIX).await, Some(10));

    h.service.set_rating(matrix(), 8).await.unwrap();
    let watched = h.service.watched_titles().await.unwrap();
    assert_eq!(watched.len(), 1);
    assert_eq!(watched[0].rating, Some(10));

    h.service.delete_movie_diary_entry(entry.id).await.unwrap();
    assert_eq!(h.service.get_rating(MATRIX).await, Some(8));

    let missing = h.service.delete_movie_diary_entry(entry.id).await;
    assert!(matches!(missing, Err(WatchStateError::NotFound(_))));
}

#[tokio::test]
async fn community_ratings_are_grouped_per_season() {
    let h = harness().await;
    let others: Vec<UserId> = (0..3).map(|_| UserId::new(Uuid::new_v4())).collect();
    let review = |user: UserId, season: i32, episode: i32, rating: i32| {
        json!({
            "user_id": user,
            "movie_id": 1399,
            "media_type": "tv",
            "season_number": season,
            "episode_number": episode,
            "rating": rating,
        })
    };
    h.memory
        .seed(
            "user_reviews",
            vec![
                review(others[0], 1, 1, 8),
                review(others[1], 1, 1, 9),
                review(others[2], 1, 2, 6),
                review(others[0], 2, 1, 10),
            ],
        )
        .await;

    let seasons = h.service.season_review_summary(GAME_OF_THRONES).await.unwrap();
    assert_eq!(seasons.len(), 2);
    assert_eq!(seasons[0].season_number, 1);
    assert_eq!(seasons[0].rating_count, 3);
    // (8 + 9 + 6) / 3
    assert!((seasons[0].average_rating - 7.7).abs() < f64::EPSILON);
    assert!((seasons[0].episodes[0].average_rating - 8.5).abs() < f64::EPSILON);
    assert_eq!(seasons[1].episodes.len(), 1);
}

#[tokio::test]
async fn confirmed_mutations_are_published() {
    let mut h = harness().await;

    h.service.set_rating(matrix(), 6).await.unwrap();
    match h.events.recv().await.unwrap() {
        WatchStateEvent::StateChanged {
            user_id,
            media_id,
            state,
        } => {
            assert_eq!(user_id, h.user_id);
            assert_eq!(media_id, MATRIX);
            assert_eq!(state.rating, Some(6));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn clear_drops_the_cache() {
    let h = harness().await;
    h.service.set_rating(matrix(), 6).await.unwrap();
    assert!(h.service.is_loaded().await);

    h.service.clear().await;
    assert!(!h.service.is_loaded().await);
    assert_eq!(h.service.get_rating(MATRIX).await, None);
}

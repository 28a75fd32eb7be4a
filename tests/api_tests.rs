use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sceneburn::config::Config;
use sceneburn::domain::UserId;
use sceneburn::services::MemoryBackend;
use sceneburn::state::SharedState;
use sceneburn::store::MemoryStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const TOKEN: &str = "test-access-token";

struct TestApp {
    router: Router,
    memory: Arc<MemoryStore>,
}

async fn spawn_app() -> TestApp {
    let memory = Arc::new(MemoryStore::new());
    let backend = Arc::new(MemoryBackend::new(memory.clone()));
    backend
        .register(TOKEN, UserId::new(Uuid::new_v4()))
        .await;

    let shared = SharedState::with_backend(Config::default(), reqwest::Client::new(), backend);
    let state = sceneburn::api::create_app_state(Arc::new(shared), None);
    TestApp {
        router: sceneburn::api::router(state).await,
        memory,
    }
}

fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {TOKEN}"));
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        Request::builder()
            .uri("/api/system/health/live")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_auth_required() {
    let app = spawn_app().await;

    let (status, _) = send(
        &app.router,
        Request::builder()
            .uri("/api/titles/movie/603/state")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app.router,
        Request::builder()
            .uri("/api/titles/movie/603/state")
            .header("Authorization", "Bearer unknown-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = authed("GET", "/api/titles/movie/603/state", None);
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["is_liked"], false);
}

#[tokio::test]
async fn test_toggles_and_rating() {
    let app = spawn_app().await;
    let title = json!({ "title": "The Matrix", "poster": "/matrix.jpg" });

    let (status, body) = send(
        &app.router,
        authed("POST", "/api/titles/movie/603/watchlist", Some(title.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(body["data"]["requested"], true);
    assert_eq!(body["data"]["state"]["is_in_watchlist"], true);

    let (status, body) = send(
        &app.router,
        authed("POST", "/api/titles/movie/603/like", Some(title)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"]["is_liked"], true);

    let (status, body) = send(
        &app.router,
        authed(
            "PUT",
            "/api/titles/movie/603/rating",
            Some(json!({ "rating": 9, "title": "The Matrix" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rating"], 9);
    assert_eq!(body["data"]["is_watched"], true);

    let (_, body) = send(&app.router, authed("GET", "/api/titles/movie/603/state", None)).await;
    assert_eq!(
        body["data"],
        json!({ "is_liked": true, "is_in_watchlist": true, "is_watched": true, "rating": 9 })
    );

    assert_eq!(app.memory.rows("watchlist").await.len(), 1);
    assert_eq!(app.memory.rows("favorites").await.len(), 1);
    assert_eq!(app.memory.rows("user_ratings").await.len(), 1);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, authed("GET", "/api/titles/book/603/state", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app.router,
        authed(
            "PUT",
            "/api/titles/movie/603/rating",
            Some(json!({ "rating": 12, "title": "The Matrix" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        authed("POST", "/api/tv/1399/seasons/1/episodes/0/watched", Some(json!({ "runtime": 50 }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_season_rating_and_rollup() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        authed(
            "POST",
            "/api/tv/1399/seasons/1/episodes/1/watched",
            Some(json!({ "tv_name": "Game of Thrones", "runtime": 62 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["watched"], true);

    let (status, body) = send(
        &app.router,
        authed(
            "PUT",
            "/api/tv/1399/seasons/1/rating",
            Some(json!({ "rating": 8, "tv_name": "Game of Thrones" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rating"], 8);

    // Only episode rows count; the marked episode carries no rating.
    let request = authed("GET", "/api/tv/1399/seasons/1/rollup", None);
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["season_number"], 1);
    assert_eq!(body["data"]["average_rating"], Value::Null);

    let (_, body) = send(
        &app.router,
        authed("PUT", "/api/tv/1399/seasons/1/rating", Some(json!({ "rating": 0 }))),
    )
    .await;
    assert_eq!(body["data"]["rating"], Value::Null);
    assert_eq!(app.memory.rows("tv_diary").await.len(), 1);
}

#[tokio::test]
async fn test_diary_and_delete_title_data() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        authed(
            "POST",
            "/api/diary/movies",
            Some(json!({ "movie_id": 603, "movie_title": "The Matrix", "rating": 8 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entry_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app.router, authed("GET", "/api/collection/watched", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], "The Matrix");
    assert_eq!(body["data"][0]["rating"], 8);

    let (status, body) = send(
        &app.router,
        authed(
            "PATCH",
            &format!("/api/diary/movies/{entry_id}"),
            Some(json!({ "notes": "Rewatch" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notes"], "Rewatch");

    let (status, body) = send(&app.router, authed("DELETE", "/api/titles/movie/603", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["failed"], json!([]));
    assert!(app.memory.rows("movie_diary").await.is_empty());

    let (status, _) = send(
        &app.router,
        authed("DELETE", &format!("/api/diary/movies/{entry_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_requires_text_or_rating() {
    let app = spawn_app().await;

    let (status, _) = send(
        &app.router,
        authed("POST", "/api/reviews", Some(json!({ "media_id": 603 }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        authed(
            "POST",
            "/api/reviews",
            Some(json!({ "media_id": 603, "review_text": "Still holds up.", "rating": 9 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["review_text"], "Still holds up.");

    let (_, body) = send(&app.router, authed("GET", "/api/titles/movie/603/state", None)).await;
    assert_eq!(body["data"]["is_watched"], true);
}

#[tokio::test]
async fn test_sign_out_drops_the_session() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, authed("GET", "/api/session", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["user_id"].is_string());

    let (status, body) = send(&app.router, authed("POST", "/api/session/sign-out", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["signed_out"], true);
}

use crate::api::AppState;
use crate::constants::tables;
use axum::{
    extract::Request, extract::State, middleware::Next, response::IntoResponse,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

/// Domain area a matched route works on, for metric labels.
fn route_area(route: Option<&str>) -> &'static str {
    let Some(route) = route else {
        return "unmatched";
    };
    let rest = route.strip_prefix("/api").unwrap_or(route);
    let mut segments = rest.trim_start_matches('/').split('/');
    match segments.next() {
        Some("titles") => match segments.nth(2) {
            Some("like") => tables::FAVORITES,
            Some("watchlist") => tables::WATCHLIST,
            Some("rating") => tables::USER_RATINGS,
            _ => "watch_state",
        },
        Some("tv") if rest.ends_with("/rating") || rest.ends_with("/rollup") => tables::TV_DIARY,
        Some("tv") if rest.contains("/episodes/") => tables::TV_DIARY,
        Some("diary" | "collection") => tables::MOVIE_DIARY,
        Some("reviews") => tables::USER_REVIEWS,
        Some("tv" | "search") => "catalog",
        Some("session") => "session",
        _ => "system",
    }
}

/// Request span, request counters and the duration histogram.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let matched_path = req
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|mp| mp.as_str().to_string());

    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %uri,
        route = matched_path.clone(),
        user_id = tracing::field::Empty,
    );

    async move {
        let response = next.run(req).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = response.status().as_u16();

        let outcome = if status >= 500 {
            "error"
        } else if status >= 400 {
            "client_error"
        } else {
            "success"
        };

        // Matched route keeps label cardinality bounded.
        let metrics_path = matched_path.as_deref().unwrap_or(&uri);

        let labels = [
            ("method", method.clone()),
            ("path", metrics_path.to_string()),
            ("area", route_area(matched_path.as_deref()).to_string()),
            ("status", status.to_string()),
        ];

        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        info!(
            event = "http_request_finished",
            duration_ms = duration_ms,
            status_code = status,
            user_agent = %user_agent,
            outcome = %outcome,
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::route_area;

    #[test]
    fn routes_map_to_their_area() {
        let cases = [
            ("/api/titles/{media_type}/{id}/like", "favorites"),
            ("/api/titles/{media_type}/{id}/watchlist", "watchlist"),
            ("/api/titles/{media_type}/{id}/rating", "user_ratings"),
            ("/api/titles/{media_type}/{id}/state", "watch_state"),
            ("/api/titles/{media_type}/{id}", "watch_state"),
            ("/api/tv/{id}/seasons/{season}/rollup", "tv_diary"),
            ("/api/tv/{id}/seasons/{season}/episodes/{episode}/watched", "tv_diary"),
            ("/api/tv/{id}/seasons/{season}", "catalog"),
            ("/api/diary/movies/{entry_id}", "movie_diary"),
            ("/api/reviews", "user_reviews"),
            ("/api/session/sign-out", "session"),
            ("/api/system/health/live", "system"),
        ];
        for (route, area) in cases {
            assert_eq!(route_area(Some(route)), area, "{route}");
        }
        assert_eq!(route_area(None), "unmatched");
    }
}

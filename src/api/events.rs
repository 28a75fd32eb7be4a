use axum::{
    Extension, Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::warn;

use crate::api::AppState;
use crate::domain::UserId;
use crate::domain::events::WatchStateEvent;
use crate::services::UserSession;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(sse_handler))
}

/// Streams the watch-state events of the requesting user only.
async fn sse_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_bus().subscribe();
    let user_id = session.user_id;

    let stream = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(sse) = to_sse_event(&event, user_id) {
                        return Some((Ok(sse), rx));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("Client lagged by {} messages", count);

                    return Some((
                        Ok(Event::default().event("warning").data("Missed some events")),
                        rx,
                    ));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn to_sse_event(event: &WatchStateEvent, user_id: UserId) -> Option<Event> {
    if event.user_id() != user_id {
        return None;
    }
    let json = serde_json::to_string(event).unwrap_or_default();
    Some(Event::default().data(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaId;
    use uuid::Uuid;

    #[test]
    fn events_of_other_users_are_dropped() {
        let me = UserId::new(Uuid::new_v4());
        let other = UserId::new(Uuid::new_v4());
        let event = WatchStateEvent::SeasonRatingChanged {
            user_id: other,
            tv_id: MediaId::new(1399),
            season_number: 1,
            rating: Some(8),
        };
        assert!(to_sse_event(&event, me).is_none());
        assert!(to_sse_event(&event, other).is_some());
    }
}

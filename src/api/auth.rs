use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SignOutResponse};
use crate::domain::UserId;
use crate::services::UserSession;

/// Bearer token of the current request, kept for sign-out.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: UserId,
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves `Authorization: Bearer <access token>` into a loaded
/// [`UserSession`] and attaches it to the request.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let session = state.sessions().resolve(&token).await?;
    tracing::Span::current().record("user_id", tracing::field::display(session.user_id));

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(BearerToken(token));
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
pub async fn current_session(
    Extension(session): Extension<Arc<UserSession>>,
) -> Json<ApiResponse<SessionInfo>> {
    Json(ApiResponse::success(SessionInfo {
        user_id: session.user_id,
    }))
}

/// POST /session/sign-out
/// Drops the cached watch state and revokes the token.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<ApiResponse<SignOutResponse>>, ApiError> {
    let signed_out = state.sessions().sign_out(&token).await?;
    Ok(Json(ApiResponse::success(SignOutResponse { signed_out })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}

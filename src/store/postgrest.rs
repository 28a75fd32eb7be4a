//! [`RemoteStore`] over the hosted backend's PostgREST endpoint (`/rest/v1`).

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use super::{Query, RemoteStore, StoreError, require_filters};

/// PostgreSQL `insufficient_privilege`, raised by row-level security.
const RLS_VIOLATION_CODE: &str = "42501";

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    rest_url: Url,
    anon_key: String,
    access_token: Option<String>,
}

impl PostgrestStore {
    /// `project_url` is the project root, e.g. `https://xyz.supabase.co`.
    pub fn new(
        client: Client,
        project_url: &str,
        anon_key: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let mut rest_url = Url::parse(project_url)?;
        if !rest_url.path().ends_with('/') {
            let path = format!("{}/", rest_url.path());
            rest_url.set_path(&path);
        }
        let rest_url = rest_url.join("rest/v1/")?;

        Ok(Self {
            client,
            rest_url,
            anon_key: anon_key.into(),
            access_token: None,
        })
    }

    /// Requests made with a user token are subject to that user's
    /// row-level security policies.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// URL for `table` with the given query parameters.
    pub fn table_url(&self, table: &str, params: &[(String, String)]) -> Result<Url, StoreError> {
        let mut url = self
            .rest_url
            .join(table)
            .map_err(|e| StoreError::Transport(format!("invalid table url: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    async fn send(
        &self,
        table: &str,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, StoreError> {
        let start = Instant::now();
        let result = request.send().await;

        let outcome = match &result {
            Ok(resp) if resp.status().is_success() => "success",
            Ok(_) => "rejected",
            Err(_) => "transport_error",
        };
        let labels = [
            ("table", table.to_string()),
            ("op", operation.to_string()),
            ("outcome", outcome.to_string()),
        ];
        metrics::counter!("remote_store_requests_total", &labels).increment(1);
        debug!(
            table,
            operation,
            outcome,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "remote store request"
        );

        let response = result?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(table, response).await)
        }
    }

    async fn error_from_response(table: &str, response: Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<PostgrestErrorBody> = serde_json::from_str(&body).ok();

        let message = parsed.as_ref().map_or_else(
            || body.clone(),
            |b| {
                let mut parts: Vec<&str> = Vec::new();
                if let Some(m) = &b.message {
                    parts.push(m);
                }
                if let Some(d) = &b.details {
                    parts.push(d);
                }
                if let Some(h) = &b.hint {
                    parts.push(h);
                }
                parts.join(" | ")
            },
        );
        let code = parsed.and_then(|b| b.code);

        warn!(
            table,
            status = status.as_u16(),
            code = ?code,
            "remote store rejected request: {message}"
        );

        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || code.as_deref() == Some(RLS_VIOLATION_CODE)
        {
            return StoreError::PermissionDenied {
                table: table.to_string(),
                message,
            };
        }

        if status == StatusCode::CONFLICT {
            return StoreError::Conflict {
                table: table.to_string(),
                message,
            };
        }

        StoreError::Remote {
            table: table.to_string(),
            status: status.as_u16(),
            message,
        }
    }

    async fn rows(table: &str, response: Response) -> Result<Vec<Value>, StoreError> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(single @ Value::Object(_)) => Ok(vec![single]),
            Ok(other) => Err(StoreError::Decode {
                table: table.to_string(),
                message: format!("expected an array of rows, got {other}"),
            }),
            Err(e) => Err(StoreError::Decode {
                table: table.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl RemoteStore for PostgrestStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let url = self.table_url(table, &query.to_params())?;
        let response = self
            .send(table, "select", self.request(Method::GET, url))
            .await?;
        Self::rows(table, response).await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let url = self.table_url(table, &[])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&rows);
        let response = self.send(table, "insert", request).await?;
        Self::rows(table, response).await
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        require_filters(table, query, "update")?;
        let url = self.table_url(table, &query.filter_params())?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(table, "update", request).await?;
        Self::rows(table, response).await
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        on_conflict: &[&str],
    ) -> Result<Vec<Value>, StoreError> {
        let params = vec![("on_conflict".to_string(), on_conflict.join(","))];
        let url = self.table_url(table, &params)?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&rows);
        let response = self.send(table, "upsert", request).await?;
        Self::rows(table, response).await
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<usize, StoreError> {
        require_filters(table, query, "delete")?;
        let url = self.table_url(table, &query.filter_params())?;
        let request = self
            .request(Method::DELETE, url)
            .header("Prefer", "return=representation");
        let response = self.send(table, "delete", request).await?;
        Ok(Self::rows(table, response).await?.len())
    }

    fn backend_name(&self) -> &'static str {
        "postgrest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PostgrestStore {
        PostgrestStore::new(Client::new(), "https://demo.supabase.co", "anon").unwrap()
    }

    #[test]
    fn builds_rest_urls_under_project_root() {
        let url = store().table_url("user_ratings", &[]).unwrap();
        assert_eq!(url.as_str(), "https://demo.supabase.co/rest/v1/user_ratings");
    }

    #[test]
    fn encodes_filters_into_query_string() {
        let query = Query::new().eq("movie_id", 603).is_null("episode_number");
        let url = store().table_url("tv_diary", &query.filter_params()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/rest/v1/tv_diary?movie_id=eq.603&episode_number=is.null"
        );
    }

    #[test]
    fn keeps_project_path_prefix() {
        let store =
            PostgrestStore::new(Client::new(), "http://localhost:54321/base", "anon").unwrap();
        let url = store.table_url("watchlist", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:54321/base/rest/v1/watchlist");
    }
}

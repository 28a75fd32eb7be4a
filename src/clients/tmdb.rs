use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::TmdbConfig;
use crate::domain::MediaId;

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("TMDB API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("TMDB is not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid TMDB URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub job: Option<String>,
    pub department: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Videos {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

impl Videos {
    /// First YouTube trailer, the one the detail page embeds.
    #[must_use]
    pub fn trailer(&self) -> Option<&Video> {
        self.results
            .iter()
            .find(|v| v.site == "YouTube" && v.video_type == "Trailer")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: MediaId,
    pub title: String,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub credits: Option<Credits>,
    pub videos: Option<Videos>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub id: i64,
    pub season_number: i32,
    pub name: Option<String>,
    pub episode_count: Option<i32>,
    pub air_date: Option<String>,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvShowDetails {
    pub id: MediaId,
    pub name: String,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub first_air_date: Option<String>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    #[serde(default)]
    pub episode_run_time: Vec<i32>,
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
    pub credits: Option<Credits>,
    pub videos: Option<Videos>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub episode_number: i32,
    pub season_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub still_path: Option<String>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonDetails {
    pub id: i64,
    pub season_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

impl SeasonDetails {
    #[must_use]
    pub fn episode(&self, episode_number: i32) -> Option<&Episode> {
        self.episodes
            .iter()
            .find(|e| e.episode_number == episode_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDetails {
    pub id: i64,
    pub name: String,
    pub biography: Option<String>,
    pub birthday: Option<String>,
    pub place_of_birth: Option<String>,
    pub profile_path: Option<String>,
    pub known_for_department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: MediaId,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvSummary {
    pub id: MediaId,
    pub name: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub profile_path: Option<String>,
    pub known_for_department: Option<String>,
}

/// One row of `/search/multi`, discriminated by `media_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "media_type", rename_all = "lowercase")]
pub enum SearchResult {
    Movie(MovieSummary),
    Tv(TvSummary),
    Person(PersonSummary),
}

impl SearchResult {
    #[must_use]
    pub fn display_title(&self) -> &str {
        match self {
            Self::Movie(m) => &m.title,
            Self::Tv(t) => &t.name,
            Self::Person(p) => &p.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    pub page: u32,
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u32,
}

/// Filters for `/discover/movie`. Unset fields are omitted from the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverParams {
    pub page: Option<u32>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub with_genres: Vec<i32>,
    pub year: Option<i32>,
    pub min_vote_average: Option<f64>,
    pub with_original_language: Option<String>,
}

impl DiscoverParams {
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        params.push((
            "sort_by".to_string(),
            self.sort_by
                .clone()
                .unwrap_or_else(|| "popularity.desc".to_string()),
        ));
        if !self.with_genres.is_empty() {
            let genres: Vec<String> = self.with_genres.iter().map(ToString::to_string).collect();
            params.push(("with_genres".to_string(), genres.join(",")));
        }
        if let Some(year) = self.year {
            params.push(("primary_release_year".to_string(), year.to_string()));
        }
        if let Some(vote) = self.min_vote_average {
            params.push(("vote_average.gte".to_string(), vote.to_string()));
        }
        if let Some(lang) = &self.with_original_language {
            params.push(("with_original_language".to_string(), lang.clone()));
        }
        params
    }
}

#[derive(Clone, Debug)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    access_token: Option<String>,
    language: String,
}

impl TmdbClient {
    #[must_use]
    pub fn new(client: Client, config: &TmdbConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            access_token: config.access_token.clone().filter(|k| !k.is_empty()),
            language: config.language.clone(),
        }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.access_token.is_some()
    }

    /// Full request URL; the v3 key rides as a query parameter.
    pub fn url(&self, path: &str, params: &[(String, String)]) -> Result<Url, TmdbError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path.trim_start_matches('/')))?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(key) = &self.api_key {
                pairs.append_pair("api_key", key);
            }
            pairs.append_pair("language", &self.language);
            pairs.extend_pairs(params);
        }
        Ok(url)
    }

    /// `Ok(None)` on 404 so callers can render a "not found" state.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Option<T>, TmdbError> {
        if !self.is_configured() {
            return Err(TmdbError::NotConfigured(
                "set tmdb.api_key or tmdb.access_token".to_string(),
            ));
        }

        let url = self.url(path, params)?;
        debug!(path, "TMDB request");

        let mut request = self.client.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TmdbError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(Some(response.json().await?))
    }

    fn with_extras() -> Vec<(String, String)> {
        vec![(
            "append_to_response".to_string(),
            "credits,videos".to_string(),
        )]
    }

    pub async fn get_movie_details(&self, id: MediaId) -> Result<Option<MovieDetails>, TmdbError> {
        self.get_json(&format!("movie/{id}"), &Self::with_extras())
            .await
    }

    pub async fn get_tv_show_details(
        &self,
        id: MediaId,
    ) -> Result<Option<TvShowDetails>, TmdbError> {
        self.get_json(&format!("tv/{id}"), &Self::with_extras())
            .await
    }

    pub async fn get_season_details(
        &self,
        show_id: MediaId,
        season_number: i32,
    ) -> Result<Option<SeasonDetails>, TmdbError> {
        self.get_json(&format!("tv/{show_id}/season/{season_number}"), &[])
            .await
    }

    pub async fn get_person_details(&self, id: i64) -> Result<Option<PersonDetails>, TmdbError> {
        self.get_json(&format!("person/{id}"), &[]).await
    }

    pub async fn discover_movies(
        &self,
        params: &DiscoverParams,
    ) -> Result<Paged<MovieSummary>, TmdbError> {
        self.get_json("discover/movie", &params.to_params())
            .await?
            .ok_or_else(|| TmdbError::Status {
                status: 404,
                message: "discover endpoint not found".to_string(),
            })
    }

    pub async fn search_multi(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Paged<SearchResult>, TmdbError> {
        let params = vec![
            ("query".to_string(), query.to_string()),
            ("page".to_string(), page.max(1).to_string()),
            ("include_adult".to_string(), "false".to_string()),
        ];
        self.get_json("search/multi", &params)
            .await?
            .ok_or_else(|| TmdbError::Status {
                status: 404,
                message: "search endpoint not found".to_string(),
            })
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub supabase: SupabaseConfig,

    pub tmdb: TmdbConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
            suppress_connection_errors: false,
            event_bus_buffer_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project root, e.g. `https://abcd.supabase.co`.
    pub url: String,

    /// Public anon key. Row-level security still applies per user token.
    pub anon_key: String,

    pub request_timeout_seconds: u32,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub base_url: String,

    pub image_base_url: String,

    /// v3 key, sent as the `api_key` query parameter.
    pub api_key: Option<String>,

    /// v4 read access token, sent as a bearer token.
    pub access_token: Option<String>,

    pub language: String,

    pub request_timeout_seconds: u32,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p".to_string(),
            api_key: None,
            access_token: None,
            language: "en-US".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Signed-in sessions kept in memory; the oldest is evicted beyond this.
    pub max_sessions: usize,

    /// A cached token is re-checked with the auth backend once this old.
    pub session_revalidate_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 6790,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            max_sessions: 256,
            session_revalidate_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies `SCENEBURN_*` variables on top of the file values.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if let Some(url) = set(var("SCENEBURN_SUPABASE_URL")) {
            self.supabase.url = url;
        }
        if let Some(key) = set(var("SCENEBURN_SUPABASE_ANON_KEY")) {
            self.supabase.anon_key = key;
        }
        if let Some(key) = set(var("SCENEBURN_TMDB_API_KEY")) {
            self.tmdb.api_key = Some(key);
        }
        if let Some(token) = set(var("SCENEBURN_TMDB_ACCESS_TOKEN")) {
            self.tmdb.access_token = Some(token);
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("sceneburn").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".sceneburn").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// `offline` skips the checks that only matter when talking to Supabase.
    pub fn validate(&self, offline: bool) -> Result<()> {
        if !offline {
            if self.supabase.url.trim().is_empty() {
                anyhow::bail!("supabase.url cannot be empty");
            }
            url::Url::parse(&self.supabase.url).with_context(|| {
                format!("supabase.url is not a valid URL: {}", self.supabase.url)
            })?;

            if self.supabase.anon_key.trim().is_empty() {
                anyhow::bail!(
                    "supabase.anon_key is not set (config.toml or SCENEBURN_SUPABASE_ANON_KEY)"
                );
            }
        }

        if self.server.enabled && self.server.port == 0 {
            anyhow::bail!("server.port must be > 0");
        }

        if self.server.max_sessions == 0 {
            anyhow::bail!("server.max_sessions must be > 0");
        }

        Ok(())
    }
}

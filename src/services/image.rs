use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::TmdbConfig;

/// Width tokens the image CDN serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    W92,
    W154,
    W185,
    W342,
    #[default]
    W500,
    W780,
    Original,
}

impl ImageSize {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::W92 => "w92",
            Self::W154 => "w154",
            Self::W185 => "w185",
            Self::W342 => "w342",
            Self::W500 => "w500",
            Self::W780 => "w780",
            Self::Original => "original",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "w92" => Ok(Self::W92),
            "w154" => Ok(Self::W154),
            "w185" => Ok(Self::W185),
            "w342" => Ok(Self::W342),
            "w500" => Ok(Self::W500),
            "w780" => Ok(Self::W780),
            "original" => Ok(Self::Original),
            other => Err(format!("unknown image size: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageService {
    base_url: String,
}

impl ImageService {
    #[must_use]
    pub fn new(config: &TmdbConfig) -> Self {
        Self {
            base_url: config.image_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full CDN URL for a catalog image path such as `/abc.jpg`.
    #[must_use]
    pub fn url(&self, path: Option<&str>, size: ImageSize) -> Option<String> {
        let path = path.map(str::trim).filter(|p| !p.is_empty())?;
        Some(format!(
            "{}/{}/{}",
            self.base_url,
            size,
            path.trim_start_matches('/')
        ))
    }
}

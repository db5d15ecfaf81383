//! Movie and TV show metadata lookups.
//!
//! The addon only needs two operations from a metadata service, captured by
//! [`MetaFetcher`]. [`CinemetaClient`] implements it against Stremio's public
//! Cinemeta addon and is used whenever enrichment is enabled without a custom
//! fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Public Cinemeta instance.
pub const CINEMETA_BASE_URL: &str = "https://v3-cinemeta.strem.io";

/// Metadata of a movie or TV show.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub name: String,

    /// E.g. "2008" for movies and "2008-2013" for TV shows
    #[serde(default)]
    pub release_info: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<Video>,

    /// The requested episode, only set by [`MetaFetcher::get_tv_show`]
    #[serde(skip)]
    pub episode: Option<Video>,
}

impl Meta {
    /// Human readable name for logs: `"<name> (<releaseInfo>)"`.
    pub fn media_name(&self) -> String {
        format!("{} ({})", self.name, self.release_info)
    }
}

/// One episode of a TV show.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub season: u32,
    #[serde(default)]
    pub episode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
}

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status code {0}")]
    Status(u16),

    #[error("No meta found for '{0}'")]
    NotFound(String),

    #[error("'{id}' has no episode S{season:02}E{episode:02}")]
    EpisodeNotFound {
        id: String,
        season: u32,
        episode: u32,
    },

    #[error("Malformed TV show ID '{0}' (expected '<id>:<season>:<episode>')")]
    InvalidId(String),
}

/// Capability to resolve titles for movies and TV shows.
#[async_trait]
pub trait MetaFetcher: Send + Sync {
    async fn get_movie(&self, id: &str) -> Result<Meta, MetaError>;

    async fn get_tv_show(&self, id: &str, season: u32, episode: u32) -> Result<Meta, MetaError>;
}

/// Split a TV show stream ID of the form `tt0944947:1:2`.
///
/// # Errors
///
/// Returns `MetaError::InvalidId` if there aren't exactly three parts or
/// season and episode aren't numbers.
pub fn parse_episode_id(id: &str) -> Result<(&str, u32, u32), MetaError> {
    let mut parts = id.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(show), Some(season), Some(episode), None) if !show.is_empty() => {
            let season = season
                .parse()
                .map_err(|_| MetaError::InvalidId(id.to_string()))?;
            let episode = episode
                .parse()
                .map_err(|_| MetaError::InvalidId(id.to_string()))?;
            Ok((show, season, episode))
        }
        _ => Err(MetaError::InvalidId(id.to_string())),
    }
}

#[derive(Deserialize)]
struct MetaEnvelope {
    meta: Option<Meta>,
}

/// HTTP client for Cinemeta.
#[derive(Debug, Clone)]
pub struct CinemetaClient {
    http: Client,
    base_url: String,
}

impl CinemetaClient {
    /// Create a client for the public Cinemeta instance.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the HTTP client can't be built.
    pub fn new(timeout: Duration) -> Result<Self, MetaError> {
        Self::with_base_url(CINEMETA_BASE_URL, timeout)
    }

    /// Create a client for another Cinemeta-compatible service.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the HTTP client can't be built.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MetaError> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("stremio_addon/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, media_type: &str, id: &str) -> Result<Meta, MetaError> {
        let url = format!("{}/meta/{media_type}/{id}.json", self.base_url);
        debug!(url = %url, "Fetching meta");

        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(MetaError::NotFound(id.to_string())),
            status => return Err(MetaError::Status(status.as_u16())),
        }

        let envelope: MetaEnvelope = response.json().await?;
        envelope
            .meta
            .ok_or_else(|| MetaError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl MetaFetcher for CinemetaClient {
    async fn get_movie(&self, id: &str) -> Result<Meta, MetaError> {
        self.fetch("movie", id).await
    }

    async fn get_tv_show(&self, id: &str, season: u32, episode: u32) -> Result<Meta, MetaError> {
        let mut meta = self.fetch("series", id).await?;
        meta.episode = Some(select_episode(&meta, id, season, episode)?);
        Ok(meta)
    }
}

fn select_episode(meta: &Meta, id: &str, season: u32, episode: u32) -> Result<Video, MetaError> {
    meta.videos
        .iter()
        .find(|v| v.season == season && v.episode == episode)
        .cloned()
        .ok_or_else(|| MetaError::EpisodeNotFound {
            id: id.to_string(),
            season,
            episode,
        })
}

//! Items returned by catalog, stream and subtitle handlers.

use serde::{Deserialize, Serialize};

/// Entry of a catalog response (`{"metas": [...]}`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPreviewItem {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub name: String,
    /// URL
    pub poster: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_shape: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub director: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cast: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<MetaLinkItem>,

    #[serde(rename = "imdbRating", default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,

    /// E.g. "2000" for movies and "2000-2014" or "2000-" for TV shows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// ISO 8601, e.g. "2010-12-06T05:00:00.000Z"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    #[serde(default, skip_serializing_if = "MetaBehaviorHints::is_empty")]
    pub behavior_hints: MetaBehaviorHints,
}

impl MetaPreviewItem {
    pub fn new(
        id: impl Into<String>,
        media_type: impl Into<String>,
        name: impl Into<String>,
        poster: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            media_type: media_type.into(),
            name: name.into(),
            poster: poster.into(),
            ..Default::default()
        }
    }
}

/// Link to a page within Stremio (genres, director, cast...).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetaLinkItem {
    pub name: String,
    pub category: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaBehaviorHints {
    #[serde(rename = "defaultVideoId", default, skip_serializing_if = "Option::is_none")]
    pub default_video_id: Option<String>,
}

impl MetaBehaviorHints {
    pub fn is_empty(&self) -> bool {
        self.default_video_id.is_none()
    }
}

/// Entry of a stream response (`{"streams": [...]}`).
///
/// Exactly one of `url`, `yt_id`, `info_hash` or `external_url` should be set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yt_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,

    /// Usually the stream quality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Only with `info_hash`
    #[serde(rename = "fileIdx", default, skip_serializing_if = "Option::is_none")]
    pub file_index: Option<u8>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtitles: Vec<SubtitleItem>,

    #[serde(default, skip_serializing_if = "StreamBehaviorHints::is_empty")]
    pub behavior_hints: StreamBehaviorHints,
}

impl StreamItem {
    /// HTTP stream with a title.
    pub fn http(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Torrent stream.
    pub fn torrent(info_hash: impl Into<String>, file_index: u8, title: impl Into<String>) -> Self {
        Self {
            info_hash: Some(info_hash.into()),
            file_index: Some(file_index),
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamBehaviorHints {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub binge_watch: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_play: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub proxy: bool,
}

impl StreamBehaviorHints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Subtitle track. Subtitle responses are a bare JSON array of these.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubtitleItem {
    pub id: String,
    pub url: String,
    /// ISO 639-1 language code
    pub language: String,
    pub label: String,
}

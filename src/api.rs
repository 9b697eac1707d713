#![forbid(unsafe_code)]

//! YouTube Data API v3 endpoints used by the harvester and the subset of
//! their JSON payloads we actually read.
//!
//! Quota cost: `channels`, `playlistItems` and `videos` list calls are one
//! unit each, so a full run costs roughly `2 * pages + 2` units.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::transport::HttpResponse;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const PLAYLIST_ITEM_KIND: &str = "youtube#playlistItem";
/// Largest `maxResults` the list endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Builds request URLs for one credential against one API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base: String,
    key: String,
}

impl ApiEndpoints {
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_base(DEFAULT_API_BASE, key)
    }

    pub fn with_base(base: impl Into<String>, key: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            base,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn channel_lookup(&self, channel_id: &str, page_size: u32) -> String {
        format!(
            "{}/channels?part=contentDetails&id={channel_id}&maxResults={page_size}&key={}",
            self.base, self.key
        )
    }

    pub fn playlist_items(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> String {
        let mut url = format!(
            "{}/playlistItems?key={}&playlistId={playlist_id}&part=snippet,id,contentDetails&maxResults={page_size}",
            self.base, self.key
        );
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(token);
        }
        url
    }

    pub fn video_statistics(&self, video_ids: &[String], page_size: u32) -> String {
        format!(
            "{}/videos?key={}&maxResults={page_size}&part=statistics&id={}",
            self.base,
            self.key,
            video_ids.join(",")
        )
    }
}

pub fn parse_body<T: DeserializeOwned>(response: &HttpResponse) -> serde_json::Result<T> {
    serde_json::from_str(&response.body)
}

/// `channels?part=contentDetails`
#[derive(Debug, Default, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    #[serde(default)]
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    #[serde(default)]
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

/// `playlistItems?part=snippet,id,contentDetails`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(default)]
    pub page_info: PageInfo,
    pub next_page_token: Option<String>,
}

impl PlaylistItemsResponse {
    /// Continuation cursor, if another page follows. An empty token counts
    /// as the last page.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub snippet: PlaylistSnippet,
    #[serde(default)]
    pub content_details: PlaylistContentDetails,
}

impl PlaylistItem {
    pub fn is_playlist_entry(&self) -> bool {
        self.kind == PLAYLIST_ITEM_KIND
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<String>,
    pub channel_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistContentDetails {
    pub video_id: Option<String>,
}

/// `videos?part=statistics`
#[derive(Debug, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoItem {
    pub id: Option<String>,
    #[serde(default)]
    pub statistics: VideoStatistics,
}

/// Counters arrive as decimal strings; a bare number is accepted too.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default, deserialize_with = "count_string")]
    pub view_count: Option<String>,
    #[serde(default, deserialize_with = "count_string")]
    pub like_count: Option<String>,
    #[serde(default, deserialize_with = "count_string")]
    pub comment_count: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountValue {
    Text(String),
    Number(u64),
}

fn count_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<CountValue>::deserialize(deserializer)?;
    Ok(value.map(|value| match value {
        CountValue::Text(text) => text,
        CountValue::Number(number) => number.to_string(),
    }))
}

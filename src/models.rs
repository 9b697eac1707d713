#![forbid(unsafe_code)]

//! Records written to the output document.
//!
//! Every optional field serializes as an explicit `null` so that "unknown"
//! stays distinguishable from a real zero.

use serde::{Deserialize, Serialize};

pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// One harvested upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub title: Option<String>,
    pub link: String,
    pub publish_time: Option<String>,
    pub views: Option<String>,
    pub likes: Option<String>,
    pub comments_number: Option<String>,
    pub description: Option<String>,
}

/// Channel-level metadata, fetched once before paging starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel_title: Option<String>,
    pub videos_number: u64,
}

/// The whole output document.
///
/// `videos_number` is what the API reports for the playlist; it can exceed
/// `videos.len()` when paging stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub channel_title: Option<String>,
    pub videos_number: u64,
    pub videos: Vec<VideoRecord>,
}

impl AggregateResult {
    pub fn new(summary: ChannelSummary, videos: Vec<VideoRecord>) -> Self {
        Self {
            channel_title: summary.channel_title,
            videos_number: summary.videos_number,
            videos,
        }
    }
}

pub fn watch_link(video_id: &str) -> String {
    format!("{WATCH_URL_PREFIX}{video_id}")
}

/// Turns `2021-05-01T12:00:00Z` into `2021-05-01 12:00:00`.
///
/// Only the separators are touched; fractional seconds or offsets pass
/// through as the API sent them.
pub fn normalize_publish_time(raw: &str) -> String {
    raw.replace('T', " ").replace('Z', "")
}

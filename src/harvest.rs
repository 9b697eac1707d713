#![forbid(unsafe_code)]

//! Pagination over the uploads playlist.
//!
//! Each page costs two gated calls: the `playlistItems` page itself and one
//! batched `videos?part=statistics` lookup for the ids on that page. Both go
//! through the gate in soft-stop mode, so a closed gate ends paging and
//! keeps whatever earlier pages produced. A page whose statistics call is
//! refused is dropped as a whole.
//!
//! A page that carries no video ids at all skips the statistics lookup, so
//! it costs a single request instead of two.

use std::collections::HashMap;

use thiserror::Error;

use crate::api::{
    PlaylistItem, PlaylistItemsResponse, VideoListResponse, VideoStatistics, parse_body,
};
use crate::gate::{FailMode, GateError, GateOutcome, Session};
use crate::models::{VideoRecord, normalize_publish_time, watch_link};
use crate::transport::HttpGet;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("malformed API payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Per-item data taken from a playlist page, before statistics are joined.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlaylistEntry {
    video_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    publish_time: Option<String>,
}

impl PlaylistEntry {
    fn from_item(item: &PlaylistItem) -> Option<Self> {
        if !item.is_playlist_entry() {
            return None;
        }
        let video_id = item
            .content_details
            .video_id
            .clone()
            .filter(|id| !id.is_empty());
        if video_id.is_none() {
            log::warn!(
                "Playlist entry without a video id ({}); it gets no statistics",
                item.snippet.title.as_deref().unwrap_or("untitled")
            );
        }
        Some(Self {
            video_id,
            title: item.snippet.title.clone(),
            description: item.snippet.description.clone(),
            publish_time: item
                .snippet
                .published_at
                .as_deref()
                .map(normalize_publish_time),
        })
    }

    fn into_record(self, statistics: Option<&VideoStatistics>) -> VideoRecord {
        let statistics = statistics.cloned().unwrap_or_default();
        VideoRecord {
            title: self.title,
            link: watch_link(self.video_id.as_deref().unwrap_or_default()),
            publish_time: self.publish_time,
            views: statistics.view_count,
            likes: statistics.like_count,
            comments_number: statistics.comment_count,
            description: self.description,
        }
    }
}

/// Keys statistics by video id. Items the API returns without an id fall
/// back to the id requested at the same position.
fn index_statistics(
    list: VideoListResponse,
    requested: &[String],
) -> HashMap<String, VideoStatistics> {
    list.items
        .into_iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let id = item.id.or_else(|| requested.get(position).cloned())?;
            Some((id, item.statistics))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Running,
    Done,
}

/// Lazy page-by-page walk of a playlist. Yields the finished records of one
/// page per `next()`; ends when a page has no continuation cursor or the
/// gate closes. Not restartable.
pub struct PageStream<'s, T> {
    session: &'s mut Session<T>,
    playlist_id: String,
    page_size: u32,
    cursor: Option<String>,
    state: EngineState,
    pages: usize,
    videos_seen: usize,
    truncated: bool,
}

impl<'s, T: HttpGet> PageStream<'s, T> {
    pub fn new(
        session: &'s mut Session<T>,
        playlist_id: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            session,
            playlist_id: playlist_id.into(),
            page_size,
            cursor: None,
            state: EngineState::Running,
            pages: 0,
            videos_seen: 0,
            truncated: false,
        }
    }

    /// Pages fully turned into records so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// False once the gate cut paging short.
    pub fn is_complete(&self) -> bool {
        !self.truncated
    }

    fn stop_truncated(&mut self) -> Option<Vec<VideoRecord>> {
        log::warn!("Stopped after {} pages; the result is partial", self.pages);
        self.truncated = true;
        None
    }

    fn step(&mut self) -> Result<Option<Vec<VideoRecord>>, HarvestError> {
        let url = self.session.endpoints().playlist_items(
            &self.playlist_id,
            self.page_size,
            self.cursor.as_deref(),
        );
        let GateOutcome::Response(response) =
            self.session.guarded_fetch(&url, FailMode::SoftStop)?
        else {
            return Ok(self.stop_truncated());
        };
        let page: PlaylistItemsResponse = parse_body(&response)?;

        let entries: Vec<PlaylistEntry> =
            page.items.iter().filter_map(PlaylistEntry::from_item).collect();
        let video_ids: Vec<String> = entries
            .iter()
            .filter_map(|entry| entry.video_id.clone())
            .collect();

        let statistics = if video_ids.is_empty() {
            HashMap::new()
        } else {
            let url = self
                .session
                .endpoints()
                .video_statistics(&video_ids, self.page_size);
            let GateOutcome::Response(response) =
                self.session.guarded_fetch(&url, FailMode::SoftStop)?
            else {
                return Ok(self.stop_truncated());
            };
            let list: VideoListResponse = parse_body(&response)?;
            index_statistics(list, &video_ids)
        };

        let videos: Vec<VideoRecord> = entries
            .into_iter()
            .map(|entry| {
                let stats = entry.video_id.as_ref().and_then(|id| statistics.get(id));
                entry.into_record(stats)
            })
            .collect();

        self.pages += 1;
        self.videos_seen += videos.len();
        log::info!("Parsed {} videos", self.videos_seen);

        self.cursor = page.next_cursor().map(str::to_string);
        if self.cursor.is_none() {
            self.state = EngineState::Done;
        }
        Ok(Some(videos))
    }
}

impl<T: HttpGet> Iterator for PageStream<'_, T> {
    type Item = Result<Vec<VideoRecord>, HarvestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == EngineState::Done {
            return None;
        }
        match self.step() {
            Ok(Some(videos)) => Some(Ok(videos)),
            Ok(None) => {
                self.state = EngineState::Done;
                None
            }
            Err(err) => {
                self.state = EngineState::Done;
                Some(Err(err))
            }
        }
    }
}

/// Outcome of a full walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvest {
    pub videos: Vec<VideoRecord>,
    pub pages: usize,
    /// False when the gate closed before the last page.
    pub complete: bool,
}

/// Drains a [`PageStream`] into one ordered list.
pub fn collect_videos<T: HttpGet>(
    session: &mut Session<T>,
    playlist_id: &str,
    page_size: u32,
) -> Result<Harvest, HarvestError> {
    let mut stream = PageStream::new(session, playlist_id, page_size);
    let mut videos = Vec::new();
    for page in stream.by_ref() {
        videos.extend(page?);
    }
    Ok(Harvest {
        videos,
        pages: stream.pages(),
        complete: stream.is_complete(),
    })
}

#![forbid(unsafe_code)]

use anyhow::{Context, Result};

use crate::channel::{fetch_channel_summary, fetch_uploads_playlist_id, resolve_channel_id};
use crate::gate::Session;
use crate::harvest::collect_videos;
use crate::models::AggregateResult;
use crate::transport::HttpGet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDump {
    pub channel_id: String,
    pub playlist_id: String,
    pub document: AggregateResult,
    pub pages: usize,
    /// False when the request gate cut the listing short.
    pub complete: bool,
}

/// Runs every API step for one channel reference. Setup failures are
/// errors; a gate closing during paging only makes the dump incomplete.
pub fn dump_channel<T: HttpGet>(
    session: &mut Session<T>,
    channel_reference: &str,
    page_size: u32,
) -> Result<ChannelDump> {
    let channel_id = resolve_channel_id(session.transport(), channel_reference)
        .with_context(|| format!("resolving channel id of {channel_reference}"))?;

    log::info!("Fetching playlist id of channel {channel_id}");
    let playlist_id = fetch_uploads_playlist_id(session, &channel_id, page_size)
        .context("fetching uploads playlist")?;

    log::info!("Fetching channel data from playlist {playlist_id}");
    let summary = fetch_channel_summary(session, &playlist_id, page_size)
        .context("fetching channel summary")?;

    let harvest =
        collect_videos(session, &playlist_id, page_size).context("listing channel videos")?;
    if !harvest.complete {
        log::warn!(
            "Collected {} of {} declared videos before the API refused further requests",
            harvest.videos.len(),
            summary.videos_number
        );
    }

    Ok(ChannelDump {
        channel_id,
        playlist_id,
        document: AggregateResult::new(summary, harvest.videos),
        pages: harvest.pages,
        complete: harvest.complete,
    })
}

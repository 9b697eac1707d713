#![forbid(unsafe_code)]

use std::sync::LazyLock;

use scraper::{Html, Selector};
use thiserror::Error;

use crate::api::{ChannelListResponse, PlaylistItemsResponse, parse_body};
use crate::gate::{GateError, Session};
use crate::models::ChannelSummary;
use crate::transport::{HttpGet, ResilientTransport, TransportError};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("can not parse html page to find channel id ({0})")]
    ChannelIdNotFound(String),
    #[error("channel '{0}' has no uploads playlist; is the channel id correct?")]
    MissingUploadsPlaylist(String),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed API payload: {0}")]
    Payload(#[from] serde_json::Error),
}

static CANONICAL_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel="canonical"]"#).expect("valid selector"));

/// True for anything that should be fetched rather than used verbatim.
pub fn is_channel_url(reference: &str) -> bool {
    let trimmed = reference.trim();
    trimmed.starts_with("http://") || trimmed.starts_with("https://")
}

/// Accepts either a bare channel id (returned as is) or a channel page URL,
/// whose canonical link element names the id.
pub fn resolve_channel_id<T: HttpGet>(
    transport: &ResilientTransport<T>,
    reference: &str,
) -> Result<String, ChannelError> {
    let reference = reference.trim();
    if !is_channel_url(reference) {
        if reference.is_empty() {
            return Err(ChannelError::ChannelIdNotFound("empty channel reference".into()));
        }
        return Ok(reference.to_string());
    }

    let page = transport.fetch(reference)?;
    let channel_id = canonical_channel_id(&page.body)
        .ok_or_else(|| ChannelError::ChannelIdNotFound(reference.to_string()))?;
    log::info!("Resolved {reference} to channel id {channel_id}");
    Ok(channel_id)
}

/// Last path segment of `<link rel="canonical" href="...">`.
pub fn canonical_channel_id(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let href = document
        .select(&CANONICAL_LINK)
        .find_map(|link| link.value().attr("href"))?;
    let href = href.split(['?', '#']).next().unwrap_or(href);
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Looks up the auto-generated "uploads" playlist of `channel_id`.
pub fn fetch_uploads_playlist_id<T: HttpGet>(
    session: &mut Session<T>,
    channel_id: &str,
    page_size: u32,
) -> Result<String, ChannelError> {
    let url = session.endpoints().channel_lookup(channel_id, page_size);
    let response = session.fetch_required(&url)?;
    let channels: ChannelListResponse = parse_body(&response)?;

    channels
        .items
        .into_iter()
        .next()
        .and_then(|item| item.content_details.related_playlists.uploads)
        .filter(|uploads| !uploads.is_empty())
        .ok_or_else(|| ChannelError::MissingUploadsPlaylist(channel_id.to_string()))
}

/// Channel title (from the first playlist entry) and the declared number of
/// uploads.
pub fn fetch_channel_summary<T: HttpGet>(
    session: &mut Session<T>,
    playlist_id: &str,
    page_size: u32,
) -> Result<ChannelSummary, ChannelError> {
    let url = session
        .endpoints()
        .playlist_items(playlist_id, page_size, None);
    let response = session.fetch_required(&url)?;
    let page: PlaylistItemsResponse = parse_body(&response)?;

    let channel_title = page
        .items
        .into_iter()
        .next()
        .and_then(|item| item.snippet.channel_title);

    Ok(ChannelSummary {
        channel_title,
        videos_number: page.page_info.total_results,
    })
}

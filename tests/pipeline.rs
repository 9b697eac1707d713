use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use channel_dump::api::ApiEndpoints;
use channel_dump::gate::Session;
use channel_dump::models::AggregateResult;
use channel_dump::output::{output_path, write_document};
use channel_dump::pipeline::dump_channel;
use channel_dump::transport::{
    HttpGet, HttpResponse, ResilientTransport, RetryPolicy, TransportError,
};
use serde_json::{Value, json};
use tempfile::tempdir;

const BASE: &str = "https://api.test/youtube/v3";
const CHANNEL_PAGE: &str = "https://www.youtube.com/@sample";

/// Canned API: answers by exact URL, 403 for anything unexpected, and can
/// fail the first few attempts of a URL at the transport level.
#[derive(Default)]
struct FakeApi {
    routes: HashMap<String, (u16, String)>,
    flaky: RefCell<HashMap<String, u32>>,
    calls: RefCell<Vec<String>>,
}

impl FakeApi {
    fn route(mut self, url: String, status: u16, body: Value) -> Self {
        self.routes.insert(url, (status, body.to_string()));
        self
    }

    fn html(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(url.to_string(), (200, body.to_string()));
        self
    }

    fn drop_first(self, url: String, failures: u32) -> Self {
        self.flaky.borrow_mut().insert(url, failures);
        self
    }

    fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }
}

impl HttpGet for FakeApi {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.calls.borrow_mut().push(url.to_string());
        if let Some(remaining) = self.flaky.borrow_mut().get_mut(url)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(TransportError::Connection("connection reset".into()));
        }
        Ok(match self.routes.get(url) {
            Some((status, body)) => HttpResponse::new(*status, body.clone()),
            None => HttpResponse::new(403, r#"{"error":{"code":403}}"#),
        })
    }
}

fn endpoints() -> ApiEndpoints {
    ApiEndpoints::with_base(BASE, "KEY")
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn item(id: &str, title: &str, published: &str) -> Value {
    json!({
        "kind": "youtube#playlistItem",
        "snippet": {
            "title": title,
            "description": format!("{title} description"),
            "publishedAt": published,
            "channelTitle": "Sample Channel"
        },
        "contentDetails": {"videoId": id}
    })
}

fn stats(id: &str, views: u32) -> Value {
    json!({
        "id": id,
        "statistics": {
            "viewCount": views.to_string(),
            "likeCount": (views / 10).to_string(),
            "commentCount": "2"
        }
    })
}

fn sample_channel() -> FakeApi {
    let api = endpoints();
    let first_page = json!({
        "items": [
            item("v3", "Third", "2023-03-01T10:00:00Z"),
            item("v2", "Second", "2022-02-01T10:00:00Z")
        ],
        "pageInfo": {"totalResults": 3, "resultsPerPage": 2},
        "nextPageToken": "PAGE2"
    });
    FakeApi::default()
        .html(
            CHANNEL_PAGE,
            r#"<html><head><link rel="canonical" href="https://www.youtube.com/channel/UCsample"></head></html>"#,
        )
        .route(
            api.channel_lookup("UCsample", 2),
            200,
            json!({"items": [{"contentDetails": {"relatedPlaylists": {"uploads": "UUsample"}}}]}),
        )
        // The summary call and the first harvest call share a URL.
        .route(api.playlist_items("UUsample", 2, None), 200, first_page)
        .route(
            api.video_statistics(&ids(&["v3", "v2"]), 2),
            200,
            json!({"items": [stats("v3", 300), stats("v2", 200)]}),
        )
        .route(
            api.playlist_items("UUsample", 2, Some("PAGE2")),
            200,
            json!({
                "items": [item("v1", "First", "2021-05-01T12:00:00Z")],
                "pageInfo": {"totalResults": 3, "resultsPerPage": 2}
            }),
        )
        .route(
            api.video_statistics(&ids(&["v1"]), 2),
            200,
            json!({"items": [stats("v1", 100)]}),
        )
}

fn session(api: &FakeApi) -> Session<&FakeApi> {
    Session::new(
        ResilientTransport::new(api, RetryPolicy::unbounded(Duration::ZERO)),
        endpoints(),
    )
}

#[test]
fn three_videos_over_two_pages() {
    let api = sample_channel();
    let mut session = session(&api);

    let dump = dump_channel(&mut session, CHANNEL_PAGE, 2).unwrap();
    assert!(dump.complete);
    assert_eq!(dump.channel_id, "UCsample");
    assert_eq!(dump.playlist_id, "UUsample");
    assert_eq!(dump.pages, 2);

    let document = &dump.document;
    assert_eq!(document.channel_title.as_deref(), Some("Sample Channel"));
    assert_eq!(document.videos_number, 3);
    assert_eq!(document.videos.len(), 3);

    let titles: Vec<_> = document
        .videos
        .iter()
        .map(|video| video.title.as_deref().unwrap())
        .collect();
    assert_eq!(titles, ["Third", "Second", "First"]);
    for video in &document.videos {
        assert!(video.views.is_some());
        assert!(video.likes.is_some());
        assert!(video.comments_number.is_some());
    }
    assert_eq!(document.videos[2].publish_time.as_deref(), Some("2021-05-01 12:00:00"));
    assert_eq!(document.videos[2].link, "https://www.youtube.com/watch?v=v1");

    // One list request and one statistics request per page, plus the setup calls.
    assert_eq!(api.calls_matching("/playlistItems?"), 3);
    assert_eq!(api.calls_matching("/videos?"), 2);
    assert_eq!(api.calls_matching("/channels?"), 1);
}

#[test]
fn transient_failures_are_retried_transparently() {
    let api = sample_channel().drop_first(
        endpoints().playlist_items("UUsample", 2, Some("PAGE2")),
        3,
    );
    let mut session = session(&api);

    let dump = dump_channel(&mut session, CHANNEL_PAGE, 2).unwrap();
    assert!(dump.complete);
    assert_eq!(dump.document.videos.len(), 3);
    assert_eq!(api.calls_matching("pageToken=PAGE2"), 4);
}

#[test]
fn quota_exhaustion_on_second_page_keeps_first_page() {
    let mut api = sample_channel();
    api.routes.remove(&endpoints().video_statistics(&ids(&["v1"]), 2));
    let mut session = session(&api);

    let dump = dump_channel(&mut session, CHANNEL_PAGE, 2).unwrap();
    assert!(!dump.complete);
    assert_eq!(dump.document.videos_number, 3);
    assert_eq!(dump.document.videos.len(), 2);
    assert!(!session.gate().is_open());
}

#[test]
fn rejected_setup_call_is_fatal() {
    let mut api = sample_channel();
    api.routes.remove(&endpoints().channel_lookup("UCsample", 2));
    let mut session = session(&api);

    let err = dump_channel(&mut session, CHANNEL_PAGE, 2).unwrap_err();
    assert!(format!("{err:#}").contains("Api response error!"));
    assert_eq!(api.calls_matching("/playlistItems?"), 0);
}

#[test]
fn unresolvable_channel_page_is_fatal() {
    let api = FakeApi::default().html(CHANNEL_PAGE, "<html><head></head></html>");
    let mut session = session(&api);

    let err = dump_channel(&mut session, CHANNEL_PAGE, 2).unwrap_err();
    assert!(format!("{err:#}").contains("can not parse html page"));
    assert_eq!(api.calls.borrow().len(), 1);
}

#[test]
fn written_document_has_expected_shape() {
    let api = sample_channel();
    let mut session = session(&api);
    let dump = dump_channel(&mut session, "UCsample", 2).unwrap();

    let dir = tempdir().unwrap();
    let path = output_path(dir.path(), "sample");
    write_document(&path, &dump.document).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["channel_title"], "Sample Channel");
    assert_eq!(value["videos_number"], 3);
    assert_eq!(
        value["videos"][0],
        json!({
            "title": "Third",
            "link": "https://www.youtube.com/watch?v=v3",
            "publish_time": "2023-03-01 10:00:00",
            "views": "300",
            "likes": "30",
            "comments_number": "2",
            "description": "Third description"
        })
    );

    let parsed: AggregateResult = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, dump.document);
}

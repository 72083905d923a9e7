use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use moka::future::Cache;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::locations::resolve_location;
use super::mock;
use super::types::Video;
use crate::config::{Config, PLACEHOLDER_API_KEY};
use crate::error::UpstreamError;

pub const MAX_RESULTS_LIMIT: usize = 50;
pub const DEFAULT_MAX_RESULTS: usize = 10;

const DETAIL_CACHE_TTL: Duration = Duration::from_secs(600);
const DETAIL_CACHE_CAPACITY: u64 = 1_000;

// ── Fallback policy ────────────────────────────────────────────────────────────

/// What a failed upstream call turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Hand the error back to the caller.
    None,
    /// Pretend the platform found nothing.
    Empty,
    /// Serve generated placeholder videos.
    #[default]
    Synthetic,
}

impl FallbackPolicy {
    pub fn recover_search(
        self,
        error: UpstreamError,
        location: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Video>, UpstreamError> {
        match self {
            FallbackPolicy::None => Err(error),
            FallbackPolicy::Empty => Ok(Vec::new()),
            FallbackPolicy::Synthetic => {
                debug!("Generating {max_results} placeholder videos for {location:?}");
                Ok(mock::generate(location, query, max_results, &mut rand::thread_rng()))
            }
        }
    }

    pub fn recover_details(self, error: UpstreamError, video_id: &str) -> Result<Video, UpstreamError> {
        match self {
            FallbackPolicy::None => Err(error),
            FallbackPolicy::Empty | FallbackPolicy::Synthetic => Ok(mock::placeholder_video(video_id)),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(FallbackPolicy::None),
            "empty" => Ok(FallbackPolicy::Empty),
            "synthetic" | "mock" | "mocks" => Ok(FallbackPolicy::Synthetic),
            other => Err(format!("unknown fallback policy {other:?} (expected none, empty or synthetic)")),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FallbackPolicy::None => "none",
            FallbackPolicy::Empty => "empty",
            FallbackPolicy::Synthetic => "synthetic",
        })
    }
}

// ── Query composition ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub q: String,
    pub max_results: usize,
    pub location: String,
    pub location_radius: String,
    pub relevance_language: Option<String>,
    pub region_code: Option<String>,
}

impl SearchRequest {
    /// Query string pairs, minus the credential.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("maxResults", self.max_results.to_string()),
            ("q", self.q.clone()),
            ("location", self.location.clone()),
            ("locationRadius", self.location_radius.clone()),
        ];
        if let Some(lang) = &self.relevance_language {
            pairs.push(("relevanceLanguage", lang.clone()));
        }
        if let Some(region) = &self.region_code {
            pairs.push(("regionCode", region.clone()));
        }
        pairs
    }
}

/// Builds the outbound search for a place and optional free-text query.
///
/// A non-empty query is sent as typed; the place is only a geographic filter.
/// Without one, the place's own default term (or `vlog <place>`) fills in.
pub fn compose_search(location: &str, search: &str, max_results: usize) -> SearchRequest {
    let entry = resolve_location(location);
    let search = search.trim();
    let place = match location.trim() {
        "" => entry.name,
        typed => typed,
    };

    let q = if !search.is_empty() {
        search.to_string()
    } else if let Some(term) = entry.default_query {
        term.to_string()
    } else {
        format!("vlog {place}")
    };

    SearchRequest {
        q,
        max_results: clamp_max_results(max_results),
        location: entry.coordinates(),
        location_radius: entry.radius.to_string(),
        relevance_language: entry.language.map(str::to_string),
        region_code: entry.region.map(str::to_string),
    }
}

pub fn clamp_max_results(requested: usize) -> usize {
    requested.clamp(1, MAX_RESULTS_LIMIT)
}

// ── Upstream payloads ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchList {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    channel_id: Option<String>,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
    live_broadcast_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

impl Thumbnails {
    fn medium_first(&self) -> String {
        pick_url(&[&self.medium, &self.high, &self.default])
    }

    fn high_first(&self) -> String {
        pick_url(&[&self.high, &self.medium, &self.default])
    }
}

fn pick_url(candidates: &[&Option<Thumbnail>]) -> String {
    candidates
        .iter()
        .copied()
        .flatten()
        .next()
        .map(|t| t.url.clone())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

/// Search hits carry no statistics, so counts are filled in at random.
fn search_items_to_videos<R: Rng>(items: Vec<SearchItem>, rng: &mut R) -> Vec<Video> {
    items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.video_id?;
            let snippet = item.snippet;
            Some(Video {
                id,
                thumbnail: snippet.thumbnails.medium_first(),
                title: snippet.title,
                description: snippet.description,
                channel_title: snippet.channel_title,
                channel_id: snippet.channel_id,
                published_at: snippet.published_at,
                live_broadcast_content: snippet.live_broadcast_content,
                view_count: rng.gen_range(0..1_000_000u64).to_string(),
                like_count: rng.gen_range(0..50_000u64).to_string(),
            })
        })
        .collect()
}

fn video_item_to_video(item: VideoItem) -> Video {
    let snippet = item.snippet;
    Video {
        id: item.id,
        thumbnail: snippet.thumbnails.high_first(),
        title: snippet.title,
        description: snippet.description,
        channel_title: snippet.channel_title,
        channel_id: snippet.channel_id,
        published_at: snippet.published_at,
        live_broadcast_content: snippet.live_broadcast_content,
        view_count: item.statistics.view_count.unwrap_or_else(|| "0".to_string()),
        like_count: item.statistics.like_count.unwrap_or_else(|| "0".to_string()),
    }
}

// ── Service ────────────────────────────────────────────────────────────────────

pub struct YouTubeService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    fallback: FallbackPolicy,
    /// Successful detail lookups, keyed by video id.
    detail_cache: Cache<String, Video>,
}

impl YouTubeService {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("videito-server/", env!("CARGO_PKG_VERSION")))
            .timeout(config.upstream_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty() && k != PLACEHOLDER_API_KEY),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            fallback: config.fallback,
            detail_cache: Cache::builder()
                .max_capacity(DETAIL_CACHE_CAPACITY)
                .time_to_live(DETAIL_CACHE_TTL)
                .build(),
        })
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search with the fallback policy applied.
    pub async fn search_videos(
        &self,
        location: &str,
        search: &str,
        max_results: usize,
    ) -> Result<Vec<Video>, UpstreamError> {
        let request = compose_search(location, search, max_results);

        match self.fetch_search(&request).await {
            Ok(videos) => {
                info!("Found {} videos for {:?} near {:?}", videos.len(), request.q, location);
                Ok(videos)
            }
            Err(e) => {
                log_failure("search", &e);
                self.fallback
                    .recover_search(e, location, search.trim(), request.max_results)
            }
        }
    }

    /// One search call, no fallback. Zero hits count as a failure.
    pub async fn fetch_search(&self, request: &SearchRequest) -> Result<Vec<Video>, UpstreamError> {
        let key = self.api_key.as_deref().ok_or(UpstreamError::MissingCredential)?;

        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&request.query_pairs())
            .query(&[("key", key)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status(resp.status()));
        }

        let list: SearchList = resp.json().await?;
        let videos = search_items_to_videos(list.items, &mut rand::thread_rng());
        if videos.is_empty() {
            return Err(UpstreamError::Empty);
        }
        Ok(videos)
    }

    /// Details for one video, served from cache when possible.
    pub async fn video_details(&self, video_id: &str) -> Result<Video, UpstreamError> {
        if let Some(cached) = self.detail_cache.get(video_id).await {
            return Ok(cached);
        }

        match self.fetch_video(video_id).await {
            Ok(video) => {
                self.detail_cache
                    .insert(video_id.to_string(), video.clone())
                    .await;
                Ok(video)
            }
            Err(e) => {
                log_failure("video details", &e);
                self.fallback.recover_details(e, video_id)
            }
        }
    }

    pub async fn fetch_video(&self, video_id: &str) -> Result<Video, UpstreamError> {
        let key = self.api_key.as_deref().ok_or(UpstreamError::MissingCredential)?;

        let resp = self
            .client
            .get(format!("{}/videos", self.base_url))
            .query(&[("part", "snippet,statistics"), ("id", video_id), ("key", key)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status(resp.status()));
        }

        let list: VideoList = resp.json().await?;
        list.items
            .into_iter()
            .next()
            .map(video_item_to_video)
            .ok_or(UpstreamError::Empty)
    }
}

fn log_failure(operation: &str, error: &UpstreamError) {
    match error {
        UpstreamError::MissingCredential => debug!("Skipping upstream {operation}: {error}"),
        UpstreamError::Empty => info!("Upstream {operation} came back empty"),
        _ if error.is_timeout() => warn!("Upstream {operation} timed out"),
        _ => warn!("Upstream {operation} failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base: &str, key: Option<&str>, fallback: FallbackPolicy) -> YouTubeService {
        let config = Config {
            api_key: key.map(str::to_string),
            api_base: base.to_string(),
            fallback,
            upstream_timeout: Duration::from_secs(1),
            ..Config::default()
        };
        YouTubeService::new(&config).unwrap()
    }

    fn search_body() -> serde_json::Value {
        json!({
            "items": [
                {
                    "id": { "kind": "youtube#video", "videoId": "vid1" },
                    "snippet": {
                        "title": "Ramen tour",
                        "description": "Tokyo",
                        "channelTitle": "Eats",
                        "channelId": "UC1",
                        "publishedAt": "2024-05-01T10:00:00Z",
                        "thumbnails": {
                            "default": { "url": "https://img/default.jpg" },
                            "medium": { "url": "https://img/medium.jpg" }
                        },
                        "liveBroadcastContent": "none"
                    }
                },
                {
                    "id": { "kind": "youtube#channel", "channelId": "UC2" },
                    "snippet": { "title": "A channel" }
                }
            ]
        })
    }

    #[test]
    fn query_text_is_sent_alone() {
        let req = compose_search("Japón", "  ramen ", 5);
        assert_eq!(req.q, "ramen");
        assert_eq!(req.location, "36.2048,138.2529");
        assert_eq!(req.location_radius, "500km");
        assert_eq!(req.relevance_language.as_deref(), Some("ja"));
        assert_eq!(req.region_code.as_deref(), Some("JP"));
    }

    #[test]
    fn blank_query_falls_back_to_vlog_of_place() {
        assert_eq!(compose_search("Puebla", "", 10).q, "vlog Puebla");
        assert_eq!(compose_search("", "", 10).q, "vlog Oaxaca");
        // Unknown place: typed text goes into the query, default coordinates filter.
        let req = compose_search("Atlantis", "", 10);
        assert_eq!(req.q, "vlog Atlantis");
        assert_eq!(req.location, "17.0732,-96.7266");
    }

    #[test]
    fn blank_query_uses_entry_default_term_when_present() {
        assert_eq!(compose_search("China", "", 5).q, "china travel vlog");
        assert_eq!(compose_search("china", "  ", 5).q, "china travel vlog");
        // Typed text still wins over the entry's term.
        assert_eq!(compose_search("china", "dumplings", 5).q, "dumplings");
    }

    #[test]
    fn max_results_is_clamped() {
        assert_eq!(compose_search("oaxaca", "", 0).max_results, 1);
        assert_eq!(compose_search("oaxaca", "", 500).max_results, MAX_RESULTS_LIMIT);
    }

    #[test]
    fn query_pairs_include_hints() {
        let pairs = compose_search("brasil", "samba", 3).query_pairs();
        assert!(pairs.contains(&("regionCode", "BR".to_string())));
        assert!(pairs.contains(&("relevanceLanguage", "pt".to_string())));
        assert!(pairs.contains(&("maxResults", "3".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "key"));
    }

    #[test]
    fn policy_parses() {
        assert_eq!("EMPTY".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Empty);
        assert_eq!("none".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::None);
        assert_eq!("mock".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Synthetic);
        assert!("maybe".parse::<FallbackPolicy>().is_err());
    }

    #[tokio::test]
    async fn missing_key_never_touches_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .expect(0)
            .mount(&server)
            .await;

        let yt = service(&server.uri(), None, FallbackPolicy::Synthetic);
        let started = Instant::now();
        let videos = yt.search_videos("oaxaca", "", 4).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(videos.len(), 4);
        assert_eq!(videos[0].id, mock::DEMO_VIDEO_ID);

        let placeholder = service(&server.uri(), Some(PLACEHOLDER_API_KEY), FallbackPolicy::Synthetic);
        assert!(!placeholder.has_credential());
        assert_eq!(placeholder.search_videos("usa", "", 2).await.unwrap().len(), 2);

        let empty = service(&server.uri(), None, FallbackPolicy::Empty);
        assert!(empty.search_videos("oaxaca", "", 4).await.unwrap().is_empty());

        let strict = service(&server.uri(), None, FallbackPolicy::None);
        assert!(matches!(
            strict.search_videos("oaxaca", "", 4).await,
            Err(UpstreamError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn search_sends_composed_query_and_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "ramen"))
            .and(query_param("type", "video"))
            .and(query_param("part", "snippet"))
            .and(query_param("maxResults", "5"))
            .and(query_param("location", "36.2048,138.2529"))
            .and(query_param("locationRadius", "500km"))
            .and(query_param("regionCode", "JP"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .expect(1)
            .mount(&server)
            .await;

        let yt = service(&server.uri(), Some("secret"), FallbackPolicy::None);
        let videos = yt.search_videos("japon", "ramen", 5).await.unwrap();

        assert_eq!(videos.len(), 1);
        let v = &videos[0];
        assert_eq!(v.id, "vid1");
        assert_eq!(v.title, "Ramen tour");
        assert_eq!(v.channel_title, "Eats");
        assert_eq!(v.thumbnail, "https://img/medium.jpg");
        assert_eq!(v.live_broadcast_content.as_deref(), Some("none"));
        assert!(v.view_count.parse::<u64>().is_ok());
    }

    #[tokio::test]
    async fn http_error_follows_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let synthetic = service(&server.uri(), Some("k"), FallbackPolicy::Synthetic);
        assert_eq!(synthetic.search_videos("usa", "", 6).await.unwrap().len(), 6);

        let empty = service(&server.uri(), Some("k"), FallbackPolicy::Empty);
        assert!(empty.search_videos("usa", "", 6).await.unwrap().is_empty());

        let strict = service(&server.uri(), Some("k"), FallbackPolicy::None);
        match strict.search_videos("usa", "", 6).await {
            Err(UpstreamError::Status(status)) => assert_eq!(status.as_u16(), 403),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_results_count_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let strict = service(&server.uri(), Some("k"), FallbackPolicy::None);
        assert!(matches!(
            strict.search_videos("china", "", 3).await,
            Err(UpstreamError::Empty)
        ));

        let synthetic = service(&server.uri(), Some("k"), FallbackPolicy::Synthetic);
        assert_eq!(synthetic.search_videos("china", "", 3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(search_body())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let strict = service(&server.uri(), Some("k"), FallbackPolicy::None);
        let err = strict.search_videos("oaxaca", "", 2).await.unwrap_err();
        assert!(err.is_timeout(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn details_are_mapped_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos"))
            .and(query_param("id", "abc123"))
            .and(query_param("part", "snippet,statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "abc123",
                    "snippet": {
                        "title": "Guelaguetza",
                        "description": "Festival",
                        "channelTitle": "Oaxaca TV",
                        "channelId": "UCoax",
                        "publishedAt": "2023-07-24T00:00:00Z",
                        "thumbnails": {
                            "medium": { "url": "https://img/m.jpg" },
                            "high": { "url": "https://img/h.jpg" }
                        }
                    },
                    "statistics": { "viewCount": "1234", "likeCount": "56" }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let yt = service(&server.uri(), Some("k"), FallbackPolicy::None);
        let first = yt.video_details("abc123").await.unwrap();
        let second = yt.video_details("abc123").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.thumbnail, "https://img/h.jpg");
        assert_eq!(first.view_count, "1234");
        assert_eq!(first.like_count, "56");
        assert_eq!(first.channel_id.as_deref(), Some("UCoax"));
    }

    #[tokio::test]
    async fn missing_details_get_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let yt = service(&server.uri(), Some("k"), FallbackPolicy::Empty);
        let video = yt.video_details("gone").await.unwrap();
        assert_eq!(video.id, "gone");
        assert_eq!(video.title, "Video de YouTube");

        let strict = service(&server.uri(), Some("k"), FallbackPolicy::None);
        assert!(strict.video_details("gone").await.is_err());
    }
}

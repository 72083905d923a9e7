use serde::{Deserialize, Serialize};

// ── Videos ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "channelTitle")]
    pub channel_title: String,
    #[serde(rename = "channelId", skip_serializing_if = "Option::is_none", default)]
    pub channel_id: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub thumbnail: String,
    #[serde(rename = "liveBroadcastContent", skip_serializing_if = "Option::is_none", default)]
    pub live_broadcast_content: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: String,
    #[serde(rename = "likeCount")]
    pub like_count: String,
}

// ── Sessions ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub query: String,
    pub location: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub id: String,
    pub title: String,
    pub channel: String,
    #[serde(rename = "watchedAt")]
    pub watched_at: String,
    pub thumbnail: String,
}

/// Per-caller state. History lists are newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "currentRegion")]
    pub current_region: String,
    #[serde(rename = "searchHistory", default)]
    pub search_history: Vec<SearchEntry>,
    #[serde(rename = "watchHistory", default)]
    pub watch_history: Vec<WatchEntry>,
}

impl Session {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            current_region: region.into(),
            search_history: Vec::new(),
            watch_history: Vec::new(),
        }
    }

    pub fn push_search(&mut self, entry: SearchEntry, cap: usize) {
        push_capped(&mut self.search_history, entry, cap);
    }

    pub fn push_watch(&mut self, entry: WatchEntry, cap: usize) {
        push_capped(&mut self.watch_history, entry, cap);
    }
}

fn push_capped<T>(list: &mut Vec<T>, entry: T, cap: usize) {
    list.insert(0, entry);
    list.truncate(cap);
}

// ── Comments ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub name: String,
    pub comment: String,
    pub timestamp: String,
    pub likes: u64,
}

// ── Response envelopes ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct VideosResponse {
    pub success: bool,
    #[serde(rename = "currentRegion")]
    pub current_region: String,
    #[serde(rename = "searchQuery")]
    pub search_query: String,
    pub videos: Vec<Video>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub searches: Vec<SearchEntry>,
    pub videos: Vec<WatchEntry>,
}

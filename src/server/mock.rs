//! Placeholder videos served when real results are unavailable.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use rand::{distributions::Alphanumeric, Rng};

use super::types::Video;

/// Id of the first record in every synthetic batch.
pub const DEMO_VIDEO_ID: &str = "tUrVwCBPUpY";

const PLACEHOLDER_THUMBNAIL: &str = "https://via.placeholder.com/320x180/ff6b6b/white";

pub fn generate<R: Rng>(location: &str, query: &str, count: usize, rng: &mut R) -> Vec<Video> {
    let mut videos = Vec::with_capacity(count);
    let mut seen: HashSet<String> = HashSet::with_capacity(count);
    let published_at = now_rfc3339();
    let thumbnail = placeholder_thumbnail(location);
    let topic = if query.trim().is_empty() { "General" } else { query.trim() };

    for index in 0..count {
        let (id, title) = if index == 0 {
            (DEMO_VIDEO_ID.to_string(), format!("Video Demo en {location}: {topic}"))
        } else {
            let id = loop {
                let candidate = demo_id(rng);
                if !seen.contains(&candidate) {
                    break candidate;
                }
            };
            (id, format!("Video Demo #{}", index + 1))
        };
        seen.insert(id.clone());

        videos.push(Video {
            id,
            title,
            description: format!("Descripción de prueba para {location}"),
            channel_title: format!("Canal {location}"),
            channel_id: None,
            published_at: published_at.clone(),
            thumbnail: thumbnail.clone(),
            live_broadcast_content: None,
            view_count: rng.gen_range(1_000..1_000_000u64).to_string(),
            like_count: rng.gen_range(10..50_000u64).to_string(),
        });
    }

    videos
}

/// Stand-in for a single video whose details could not be fetched.
pub fn placeholder_video(id: &str) -> Video {
    Video {
        id: id.to_string(),
        title: "Video de YouTube".to_string(),
        description: "Descripción no disponible".to_string(),
        channel_title: "Canal de YouTube".to_string(),
        channel_id: None,
        published_at: now_rfc3339(),
        thumbnail: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", urlencoding::encode(id)),
        live_broadcast_content: None,
        view_count: "15000".to_string(),
        like_count: "500".to_string(),
    }
}

fn demo_id<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..9)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect();
    format!("demo_{suffix}")
}

fn placeholder_thumbnail(location: &str) -> String {
    format!("{PLACEHOLDER_THUMBNAIL}?text={}", urlencoding::encode(location))
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::{
    comments::{new_comment, CommentStore},
    history::Sessions,
    mock::now_rfc3339,
    types::{HistoryResponse, VideosResponse},
    youtube::{YouTubeService, DEFAULT_MAX_RESULTS},
};
use crate::error::{StoreError, UpstreamError};

static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("video id pattern is valid")
});

// ── Application state shared across all routes ─────────────────────────────────

#[derive(Clone)]
pub struct ApiState {
    pub youtube: Arc<YouTubeService>,
    pub sessions: Sessions,
    pub comments: Arc<dyn CommentStore>,
}

// ── Errors ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn upstream(err: UpstreamError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("Store failure: {err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Query param structs ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

#[derive(Default)]
struct VideosQuery {
    location: Option<String>,
    search: Option<String>,
    max_results: Option<String>,
    session_id: Option<String>,
}

impl VideosQuery {
    /// First value wins when a key repeats; unknown keys are ignored.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut q = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "location" => &mut q.location,
                "search" => &mut q.search,
                "maxResults" => &mut q.max_results,
                "sessionId" => &mut q.session_id,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        q
    }
}

#[derive(Deserialize)]
struct VideoInfoQuery {
    v: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct CommentBody {
    name: Option<String>,
    comment: Option<String>,
}

fn query_or_bad_request<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ── Route handlers ────────────────────────────────────────────────────────────

async fn handle_test() -> impl IntoResponse {
    Json(json!({
        "message": "API de VideITO funcionando correctamente",
        "timestamp": now_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_videos(
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    State(state): State<ApiState>,
) -> ApiResult<Json<VideosResponse>> {
    // Searches always answer with videos, so an unreadable query string
    // just means defaults.
    let q = match query {
        Ok(Query(pairs)) => VideosQuery::from_pairs(pairs),
        Err(rejection) => {
            warn!("Ignoring unreadable query string: {}", rejection.body_text());
            VideosQuery::default()
        }
    };
    let session_id = Sessions::resolve_id(q.session_id.as_deref());
    let session = state.sessions.get_or_create(session_id).await?;

    let location = non_blank(q.location).unwrap_or(session.current_region);
    let session = state.sessions.set_region(session_id, &location).await?;
    let search = non_blank(q.search).unwrap_or_default();
    let max_results = q
        .max_results
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_RESULTS);

    info!(
        session = session_id,
        location = %location,
        search = %search,
        max_results,
        "Video search requested"
    );

    let videos = state
        .youtube
        .search_videos(&location, &search, max_results)
        .await
        .map_err(ApiError::upstream)?;

    state
        .sessions
        .record_search(session_id, &search, &location)
        .await?;

    Ok(Json(VideosResponse {
        success: true,
        current_region: session.current_region,
        search_query: search,
        count: videos.len(),
        videos,
    }))
}

async fn handle_video_info(
    query: Result<Query<VideoInfoQuery>, QueryRejection>,
    State(state): State<ApiState>,
) -> ApiResult<Response> {
    let q = query_or_bad_request(query)?;
    let Some(video_id) = non_blank(q.v) else {
        return Err(ApiError::bad_request("Se requiere el ID del video"));
    };
    if !VIDEO_ID_RE.is_match(&video_id) {
        return Err(ApiError::bad_request("ID de video inválido"));
    }

    let video = state
        .youtube
        .video_details(&video_id)
        .await
        .map_err(ApiError::upstream)?;

    if let Some(session_id) = non_blank(q.session_id) {
        state.sessions.record_watch(&session_id, &video).await?;
    }

    Ok(Json(json!({ "success": true, "video": video })).into_response())
}

async fn handle_history(
    query: Result<Query<SessionQuery>, QueryRejection>,
    State(state): State<ApiState>,
) -> ApiResult<Json<HistoryResponse>> {
    let q = query_or_bad_request(query)?;
    let session_id = Sessions::resolve_id(q.session_id.as_deref());
    let session = state.sessions.get_or_create(session_id).await?;
    Ok(Json(HistoryResponse {
        searches: session.search_history,
        videos: session.watch_history,
    }))
}

async fn handle_get_comments(State(state): State<ApiState>) -> ApiResult<Response> {
    let comments = state.comments.list().await?;
    Ok(Json(json!({ "success": true, "comments": comments })).into_response())
}

async fn handle_post_comment(
    State(state): State<ApiState>,
    payload: Result<Json<CommentBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let comment = new_comment(
        body.name.as_deref().unwrap_or_default(),
        body.comment.as_deref().unwrap_or_default(),
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))?;

    state.comments.prepend(comment.clone()).await?;
    Ok(Json(json!({ "success": true, "comment": comment })).into_response())
}

async fn handle_current_region(
    query: Result<Query<SessionQuery>, QueryRejection>,
    State(state): State<ApiState>,
) -> ApiResult<Response> {
    let q = query_or_bad_request(query)?;
    let session_id = Sessions::resolve_id(q.session_id.as_deref());
    let session = state.sessions.get_or_create(session_id).await?;
    Ok(Json(json!({ "success": true, "region": session.current_region })).into_response())
}

// ── Router factory ────────────────────────────────────────────────────────────

pub fn build_router(state: ApiState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/test", get(handle_test))
        .route("/videos", get(handle_videos))
        .route("/video-info", get(handle_video_info))
        .route("/history", get(handle_history))
        .route("/comments", get(handle_get_comments).post(handle_post_comment))
        .route("/current-region", get(handle_current_region))
        .with_state(state);

    let mut router = Router::new().nest("/api", api);

    // Serve the front-end if one was configured
    if let Some(dir) = static_dir {
        if dir.is_dir() {
            info!("Serving static files from {}", dir.display());
            router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
        } else {
            error!("STATIC_DIR {} is not a directory, skipping", dir.display());
        }
    }

    router.layer(cors).layer(TraceLayer::new_for_http())
}

//! Axum handlers wiring JSON payloads to the codec driver.
//!
//! Every pipeline operation answers with the uniform success/fail
//! envelope: failures carry the error's display message and nothing
//! else. Malformed JSON is rejected by the `Json` extractor before it
//! reaches the pipeline.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use rfxp_core::{
    CodecError, EncodeRequest, LayerPanel, PanelRequest, RecomputeRequest, ReturnResult, Tile,
};

use crate::config::StudioConfig;
use crate::session::{SessionState, SessionStore};

// ── AppState ─────────────────────────────────────────────────────

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub config: Arc<StudioConfig>,
}

impl AppState {
    pub fn new(config: StudioConfig) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            config: Arc::new(config),
        }
    }
}

/// The studio's HTTP surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/working-image", post(working_image))
        .route("/api/encode", post(encode))
        .route("/api/recompute", post(recompute))
        .route("/api/layer-panel", post(layer_panel))
        .route("/api/input-panel", post(input_panel))
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────

async fn healthz() -> &'static str {
    "ok"
}

/// Select the session's working image, relative to the tile directory.
/// Starting a new image drops the previous-frame reference.
#[derive(Debug, Deserialize)]
pub struct WorkingImageRequest {
    pub path: String,
}

async fn working_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<WorkingImageRequest>,
) -> Response {
    let (id, cookie) = state.sessions.resolve(&headers);
    let envelope = match set_working_image(&state, id, &request.path).await {
        Ok(()) => {
            info!(session = %id, path = %request.path, "working image selected");
            ReturnResult::success("Success")
        }
        Err(e) => {
            warn!(session = %id, path = %request.path, error = %e, "working image rejected");
            ReturnResult::fail(e.to_string())
        }
    };
    respond(cookie, &envelope)
}

async fn encode(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<EncodeRequest>,
) -> Response {
    let (id, cookie) = state.sessions.resolve(&headers);
    let envelope = match state.sessions.get_or_create(id) {
        Ok(session) => {
            let mut session = session.lock().await;
            let SessionState { driver, context } = &mut *session;
            let outcome = driver.encode(&request, context);
            match &outcome {
                Ok(_) => {
                    // This frame becomes the next request's reference.
                    context.previous_frame_path = context.working_image_path.clone();
                    info!(session = %id, "encode complete");
                }
                Err(e) => warn!(session = %id, error = %e, "encode failed"),
            }
            ReturnResult::from_outcome(&outcome)
        }
        Err(e) => ReturnResult::fail(e.to_string()),
    };
    respond(cookie, &envelope)
}

async fn recompute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RecomputeRequest>,
) -> Response {
    let (id, cookie) = state.sessions.resolve(&headers);
    let envelope = match state.sessions.get_or_create(id) {
        Ok(session) => {
            let mut session = session.lock().await;
            let SessionState { driver, context } = &mut *session;
            let outcome = driver.recompute(&request, context);
            match &outcome {
                Ok(_) => info!(session = %id, action = %request.action, "recompute complete"),
                Err(e) => {
                    warn!(session = %id, action = %request.action, error = %e, "recompute failed")
                }
            }
            ReturnResult::from_outcome(&outcome)
        }
        Err(e) => ReturnResult::fail(e.to_string()),
    };
    respond(cookie, &envelope)
}

async fn layer_panel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PanelRequest>,
) -> Response {
    let (id, cookie) = state.sessions.resolve(&headers);
    let layers = panel(&state, id, &request.name, Panel::Output).await;
    respond(cookie, &layers)
}

async fn input_panel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PanelRequest>,
) -> Response {
    let (id, cookie) = state.sessions.resolve(&headers);
    let layers = panel(&state, id, &request.name, Panel::Input).await;
    respond(cookie, &layers)
}

// ── Internal ─────────────────────────────────────────────────────

enum Panel {
    Input,
    Output,
}

async fn panel(state: &AppState, id: Uuid, name: &str, side: Panel) -> Vec<LayerPanel> {
    match state.sessions.get_or_create(id) {
        Ok(session) => {
            let session = session.lock().await;
            match side {
                Panel::Input => session.driver.input_panel(name),
                Panel::Output => session.driver.layer_panel(name),
            }
        }
        Err(_) => Vec::new(),
    }
}

async fn set_working_image(state: &AppState, id: Uuid, path: &str) -> Result<(), CodecError> {
    let resolved = state.config.storage.tile_dir.join(sanitize(path)?);
    // Surface unreadable or malformed tiles at selection time.
    Tile::from_file(&resolved)?;

    let session = state.sessions.get_or_create(id)?;
    let mut session = session.lock().await;
    session.context.working_image_path = Some(resolved);
    session.context.previous_frame_path = None;
    Ok(())
}

/// Only bare relative paths below the tile directory are allowed.
fn sanitize(path: &str) -> Result<PathBuf, CodecError> {
    let rel = Path::new(path);
    let escapes = rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes || path.is_empty() {
        return Err(CodecError::Validation(format!("illegal tile path '{path}'")));
    }
    Ok(rel.to_path_buf())
}

fn respond<T: Serialize>(cookie: Option<HeaderValue>, body: &T) -> Response {
    let mut response = Json(body).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

// ── Tests ────────────────────────────────────────────────────────

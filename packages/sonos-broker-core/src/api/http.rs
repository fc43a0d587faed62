//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, Path, Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::api::AppState;
use crate::error::{BrokerError, BrokerResult};
use crate::protocol_constants::{GENA_CALLBACK_PATH, MAX_GENA_BODY_SIZE, SERVICE_ID};
use crate::zone::snapshot::full_snapshot;

// ─────────────────────────────────────────────────────────────────────────────
// GENA Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Validates required GENA headers and extracts SID and SEQ values.
fn validate_gena_headers(headers: &HeaderMap) -> BrokerResult<(String, String)> {
    let nt = headers.get("NT").and_then(|v| v.to_str().ok());
    if nt != Some("upnp:event") {
        log::warn!("[GENA] NOTIFY missing or invalid NT header: {:?}", nt);
        return Err(BrokerError::InvalidRequest(
            "Missing or invalid NT header".into(),
        ));
    }

    let nts = headers.get("NTS").and_then(|v| v.to_str().ok());
    if nts != Some("upnp:propchange") {
        log::warn!("[GENA] NOTIFY missing or invalid NTS header: {:?}", nts);
        return Err(BrokerError::InvalidRequest(
            "Missing or invalid NTS header".into(),
        ));
    }

    let sid = match headers.get("SID").and_then(|v| v.to_str().ok()) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            log::warn!("[GENA] NOTIFY missing SID header");
            return Err(BrokerError::InvalidRequest("Missing SID header".into()));
        }
    };

    // SEQ is logged only; events are applied in arrival order
    let seq = headers
        .get("SEQ")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("?")
        .to_string();

    Ok((sid, seq))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct VolumeRequest {
    volume: u8,
    #[serde(default)]
    group: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GroupQuery {
    group: bool,
}

#[derive(Deserialize)]
struct MuteRequest {
    mute: bool,
    #[serde(default)]
    group: bool,
}

/// `null` disables the cap.
#[derive(Deserialize)]
struct MaxVolumeRequest {
    max_volume: Option<u8>,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum TransportRequest {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek {
        position: String,
    },
    PlayUri {
        uri: String,
        #[serde(default)]
        metadata: String,
    },
    PlayFromQueue {
        index: u32,
    },
    PlayMode {
        mode: String,
    },
}

#[derive(Deserialize)]
struct SnippetRequest {
    uri: String,
    volume: Option<u8>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PublishQuery {
    force: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/zones", get(list_zones))
        .route("/zones/{uid}", get(get_zone))
        .route("/zones/{uid}/volume", post(set_volume))
        .route("/zones/{uid}/volume/up", post(volume_up))
        .route("/zones/{uid}/volume/down", post(volume_down))
        .route("/zones/{uid}/mute", post(set_mute))
        .route("/zones/{uid}/max_volume", post(set_max_volume))
        .route("/zones/{uid}/transport", post(transport))
        .route("/zones/{uid}/snippet", post(play_snippet))
        .route("/zones/{uid}/publish", post(publish_zone))
        .route("/discovery/scan", post(trigger_scan))
        .route(GENA_CALLBACK_PATH, any(handle_gena_notify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

fn api_ok() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// Liveness probe. Always 200 while the process serves requests.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "zones": state.registry.len(),
        "online": state.registry.online_uids().len(),
        "callback": state.network.gena_callback_url(),
    }))
}

async fn list_zones(State(state): State<AppState>) -> impl IntoResponse {
    let mut uids = state.registry.uids();
    uids.sort();
    let zones: Vec<_> = uids
        .iter()
        .filter_map(|uid| state.registry.view(uid, full_snapshot))
        .collect();
    Json(json!({ "zones": zones }))
}

async fn get_zone(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> BrokerResult<impl IntoResponse> {
    let uid = uid.to_lowercase();
    state
        .registry
        .view(&uid, full_snapshot)
        .map(Json)
        .ok_or(BrokerError::ZoneNotFound(uid))
}

async fn set_volume(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(req): Json<VolumeRequest>,
) -> BrokerResult<impl IntoResponse> {
    state
        .controller
        .set_volume(&uid.to_lowercase(), req.volume, req.group)
        .await?;
    Ok(api_ok())
}

async fn volume_up(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(q): Query<GroupQuery>,
) -> BrokerResult<impl IntoResponse> {
    state.controller.volume_up(&uid.to_lowercase(), q.group).await?;
    Ok(api_ok())
}

async fn volume_down(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(q): Query<GroupQuery>,
) -> BrokerResult<impl IntoResponse> {
    state
        .controller
        .volume_down(&uid.to_lowercase(), q.group)
        .await?;
    Ok(api_ok())
}

async fn set_mute(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(req): Json<MuteRequest>,
) -> BrokerResult<impl IntoResponse> {
    state
        .controller
        .set_mute(&uid.to_lowercase(), req.mute, req.group)
        .await?;
    Ok(api_ok())
}

async fn set_max_volume(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(req): Json<MaxVolumeRequest>,
) -> BrokerResult<impl IntoResponse> {
    state
        .controller
        .set_max_volume(&uid.to_lowercase(), req.max_volume)
        .await?;
    Ok(api_ok())
}

async fn transport(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(req): Json<TransportRequest>,
) -> BrokerResult<impl IntoResponse> {
    let uid = uid.to_lowercase();
    let controller = &state.controller;
    match req {
        TransportRequest::Play => controller.play(&uid).await?,
        TransportRequest::Pause => controller.pause(&uid).await?,
        TransportRequest::Stop => controller.stop(&uid).await?,
        TransportRequest::Next => controller.next(&uid).await?,
        TransportRequest::Previous => controller.previous(&uid).await?,
        TransportRequest::Seek { position } => controller.seek(&uid, &position).await?,
        TransportRequest::PlayUri { uri, metadata } => {
            controller.play_uri(&uid, &uri, &metadata).await?
        }
        TransportRequest::PlayFromQueue { index } => {
            controller.play_from_queue(&uid, index).await?
        }
        TransportRequest::PlayMode { mode } => controller.set_playmode(&uid, &mode).await?,
    }
    Ok(api_ok())
}

async fn play_snippet(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(req): Json<SnippetRequest>,
) -> BrokerResult<impl IntoResponse> {
    let coordinator = state
        .snippets
        .play(&uid.to_lowercase(), &req.uri, req.volume)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "coordinator": coordinator })),
    ))
}

async fn publish_zone(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(q): Query<PublishQuery>,
) -> BrokerResult<impl IntoResponse> {
    let sent = state
        .publisher
        .publish_full(&uid.to_lowercase(), q.force)
        .await?;
    Ok(Json(json!({ "sent": sent })))
}

async fn trigger_scan(State(state): State<AppState>) -> impl IntoResponse {
    state.discovery.trigger_scan();
    (StatusCode::ACCEPTED, api_ok())
}

/// GENA NOTIFY callback. Registered with `any()` since NOTIFY is not a
/// standard method filter.
async fn handle_gena_notify(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> BrokerResult<impl IntoResponse> {
    let (parts, body) = req.into_parts();

    if parts.method.as_str() != "NOTIFY" {
        return Err(BrokerError::InvalidRequest(format!(
            "Expected NOTIFY method, got {}",
            parts.method
        )));
    }

    let (sid, seq) = validate_gena_headers(&parts.headers)?;

    let body_bytes = axum::body::to_bytes(body, MAX_GENA_BODY_SIZE)
        .await
        .map_err(|e| {
            log::warn!("[GENA] Failed to read NOTIFY body: {}", e);
            BrokerError::InvalidRequest("Failed to read body".into())
        })?;

    let applied = state
        .decoder
        .handle_notify(&sid, &String::from_utf8_lossy(&body_bytes))
        .await;

    if applied {
        log::debug!(
            "[GENA] NOTIFY from {} (SID: {}, SEQ: {}) applied",
            remote_addr.ip(),
            sid,
            seq
        );
    } else {
        log::trace!(
            "[GENA] NOTIFY from {} (SID: {}, SEQ: {}) dropped",
            remote_addr.ip(),
            sid,
            seq
        );
    }

    Ok(StatusCode::OK)
}

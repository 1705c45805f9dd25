//! Local HTTP control surface.
//!
//! Thin pass-through wrappers over the runtime state and the store: pause /
//! resume, auto-correct toggle, temporary context, contact CRUD. Spawned as
//! a background task by the gateway; a failing handler never touches the
//! message loop.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sosie_core::{
    config::ApiConfig,
    runtime::{RuntimeState, TemporaryContext},
};
use sosie_memory::{ContactPatch, NewContact, Store};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub runtime: Arc<RuntimeState>,
    pub store: Store,
    pub uptime: Instant,
    pub api_key: Option<String>,
    pub context_ttl_minutes: i64,
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    action: String,
}

#[derive(Debug, Deserialize)]
struct AutocorrectRequest {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ContextRequest {
    description: String,
    ttl_minutes: Option<i64>,
}

/// Constant-time string comparison for the bearer token.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check bearer token auth. Returns `None` if authorized.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Option<(StatusCode, Json<Value>)> {
    let key = match api_key {
        Some(k) => k,
        None => return None, // No auth configured, local use.
    };

    let value = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    match value.strip_prefix("Bearer ") {
        Some(token) if constant_time_eq(token, key) => None,
        _ => Some((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid or missing token"})),
        )),
    }
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn internal(e: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    error!("api error: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
}

/// Persist the current runtime flags after a mutation.
async fn persist(state: &ApiState) -> Result<(), (StatusCode, Json<Value>)> {
    state
        .store
        .save_flags(&state.runtime.flags().await)
        .await
        .map_err(internal)
}

/// `GET /api/status`
async fn status(headers: HeaderMap, State(state): State<ApiState>) -> ApiResult {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let context = state.runtime.active_context().await;
    let master = state.store.master_switch().await.map_err(internal)?;

    Ok(Json(json!({
        "status": "ok",
        "paused": state.runtime.is_paused(),
        "autocorrect": state.runtime.autocorrect_enabled(),
        "master_switch": master,
        "temporary_context": context.map(|c| c.description),
        "uptime_secs": state.uptime.elapsed().as_secs(),
    })))
}

/// `POST /api/control` — `{"action": "pause" | "resume"}`
async fn control(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Json(request): Json<ControlRequest>,
) -> ApiResult {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    match request.action.as_str() {
        "pause" => state.runtime.set_paused(true),
        "resume" => state.runtime.set_paused(false),
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("unknown action '{other}', expected 'pause' or 'resume'")})),
            ));
        }
    }
    persist(&state).await?;

    Ok(Json(json!({"paused": state.runtime.is_paused()})))
}

/// `POST /api/autocorrect` — `{"enabled": bool}`
async fn autocorrect(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Json(request): Json<AutocorrectRequest>,
) -> ApiResult {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    state.runtime.set_autocorrect(request.enabled);
    persist(&state).await?;

    Ok(Json(json!({"autocorrect": request.enabled})))
}

/// `POST /api/context` — `{"description": "...", "ttl_minutes": 30}`
async fn set_context(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Json(request): Json<ContextRequest>,
) -> ApiResult {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    if request.description.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "description must not be empty"})),
        ));
    }

    let ttl = request.ttl_minutes.unwrap_or(state.context_ttl_minutes);
    let context = TemporaryContext::new(request.description.trim(), chrono::Duration::minutes(ttl));
    let expires_at = context.expires_at;
    state.runtime.set_context(context).await;
    persist(&state).await?;

    Ok(Json(json!({
        "description": request.description.trim(),
        "expires_at": expires_at.to_rfc3339(),
    })))
}

/// `DELETE /api/context`
async fn clear_context(headers: HeaderMap, State(state): State<ApiState>) -> ApiResult {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    state.runtime.clear_context().await;
    persist(&state).await?;

    Ok(Json(json!({"cleared": true})))
}

/// `GET /api/contacts`
async fn list_contacts(headers: HeaderMap, State(state): State<ApiState>) -> ApiResult {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let contacts = state.store.list_contacts().await.map_err(internal)?;
    Ok(Json(json!({"contacts": contacts})))
}

/// `POST /api/contacts`
async fn add_contact(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Json(request): Json<NewContact>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    if request.phone_number.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "phone_number must not be empty"})),
        ));
    }

    let contact = state.store.add_contact(&request).await.map_err(internal)?;
    info!("contact added: {} ({})", contact.name, contact.phone_number);
    Ok((StatusCode::CREATED, Json(json!({"contact": contact}))))
}

/// `DELETE /api/contacts/{id}`
async fn delete_contact(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    if state.store.delete_contact(id).await.map_err(internal)? {
        Ok(Json(json!({"deleted": id})))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("no contact with id {id}")})),
        ))
    }
}

/// `PATCH /api/contacts/{id}`
async fn patch_contact(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(request): Json<ContactPatch>,
) -> ApiResult {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    match state
        .store
        .update_contact(id, &request)
        .await
        .map_err(internal)?
    {
        Some(contact) => Ok(Json(json!({"contact": contact}))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("no contact with id {id}")})),
        )),
    }
}

fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/control", post(control))
        .route("/api/autocorrect", post(autocorrect))
        .route("/api/context", post(set_context).delete(clear_context))
        .route("/api/contacts", get(list_contacts).post(add_contact))
        .route(
            "/api/contacts/{id}",
            axum::routing::patch(patch_contact).delete(delete_contact),
        )
        .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

/// Start the control API server. Called from `Gateway::run()`.
pub async fn serve(config: ApiConfig, state: ApiState) {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("control API failed to bind to {addr}: {e}");
            return;
        }
    };

    info!("control API listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("control API error: {e}");
    }
}

//! HTTP surface for the gateway: thin handlers over `LearningService`.
//!
//! Every error is caught here and mapped to a status code with an
//! `{ error, kind }` body; nothing panics and nothing leaks a raw
//! `ClientError` past this boundary.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use visolearn_core::{
    ActiveSession, ChatExchange, ClientError, ConversationState, EnvToggles, GatewayConfig,
    GeneratedSession, LearningService, Outcome, SessionConfig,
};

/// Shared state: config plus the single-owner service behind one lock, so
/// initialization and invocation never interleave on the same handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub toggles: Arc<EnvToggles>,
    pub service: Arc<RwLock<LearningService>>,
}

impl AppState {
    pub fn new(config: GatewayConfig, toggles: EnvToggles) -> Self {
        let service = LearningService::new(config.clone(), &toggles);
        Self {
            config: Arc::new(config),
            toggles: Arc::new(toggles),
            service: Arc::new(RwLock::new(service)),
        }
    }
}

/// Error wrapper that renders as `{ error, kind }` with a matching status.
pub enum ApiError {
    Client(ClientError),
    BadRequest(String),
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, kind) = match self {
            ApiError::Client(err) => {
                let status = match &err {
                    ClientError::Auth(_) => StatusCode::UNAUTHORIZED,
                    ClientError::Connection(_)
                    | ClientError::Protocol(_)
                    | ClientError::RemoteCall(_) => StatusCode::BAD_GATEWAY,
                    ClientError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string(), err.kind())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "bad_request"),
        };
        (status, Json(json!({ "error": error, "kind": kind }))).into_response()
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let service = state.service.read().await;
    let status = service.status();
    Json(json!({
        "app_name": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "space_id": state.config.space_id,
        "connected": status.connected,
        "fallback": status.fallback,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConnectBody {
    #[serde(default)]
    pub token: Option<String>,
}

/// Build a new client handle from the posted token (or `HF_TOKEN` from the
/// environment). The previous handle survives any failure.
pub async fn connect(
    State(state): State<AppState>,
    Json(body): Json<ConnectBody>,
) -> Result<Json<Value>, ApiError> {
    let credential = body
        .token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| state.toggles.hf_token.clone())
        .unwrap_or_default();
    let mut service = state.service.write().await;
    service.connect(&credential).await?;
    Ok(Json(json!({ "connected": true })))
}

pub async fn validate(State(state): State<AppState>) -> Json<Value> {
    let ready = state.service.read().await.validate().await;
    Json(json!({ "ready": ready }))
}

#[derive(Debug, Deserialize)]
pub struct FallbackBody {
    pub enabled: bool,
}

pub async fn set_fallback(
    State(state): State<AppState>,
    Json(body): Json<FallbackBody>,
) -> Json<Value> {
    let mut service = state.service.write().await;
    service.set_fallback(body.enabled);
    Json(json!({ "fallback": body.enabled }))
}

pub async fn generate(
    State(state): State<AppState>,
    Json(config): Json<SessionConfig>,
) -> Json<Outcome<GeneratedSession>> {
    let service = state.service.read().await;
    Json(service.generate(config).await)
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub conversation: ConversationState,
    pub session: ActiveSession,
    pub message: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<Outcome<ChatExchange>>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Please enter a description first".to_string(),
        ));
    }
    let service = state.service.read().await;
    let outcome = service
        .chat(body.conversation, body.session, &body.message)
        .await;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct SaveBody {
    pub session: ActiveSession,
    #[serde(default)]
    pub conversation: ConversationState,
}

pub async fn save_log(
    State(state): State<AppState>,
    Json(body): Json<SaveBody>,
) -> Result<Json<Value>, ApiError> {
    let service = state.service.read().await;
    let path = service.save_log(&body.session, &body.conversation).await?;
    Ok(Json(json!({ "paths": [path.display().to_string()] })))
}

pub async fn save_images(
    State(state): State<AppState>,
    Json(body): Json<SaveBody>,
) -> Result<Json<Value>, ApiError> {
    let service = state.service.read().await;
    let paths = service.save_images(&body.session).await?;
    let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    Ok(Json(json!({ "paths": paths })))
}

#[derive(Debug, Deserialize)]
pub struct FragmentBody {
    pub session: ActiveSession,
}

pub async fn checklist_fragment(
    State(state): State<AppState>,
    Json(body): Json<FragmentBody>,
) -> Json<Value> {
    let service = state.service.read().await;
    let html = service.checklist_fragment(&body.session).await;
    Json(json!({ "html": html }))
}

pub async fn progress_fragment(
    State(state): State<AppState>,
    Json(body): Json<FragmentBody>,
) -> Json<Value> {
    let service = state.service.read().await;
    let html = service.progress_fragment(&body.session).await;
    Json(json!({ "html": html }))
}

pub async fn attempts_fragment(
    State(state): State<AppState>,
    Json(body): Json<FragmentBody>,
) -> Json<Value> {
    let service = state.service.read().await;
    let html = service.attempts_fragment(&body.session).await;
    Json(json!({ "html": html }))
}

pub async fn difficulty_fragment(
    State(state): State<AppState>,
    Json(body): Json<FragmentBody>,
) -> Json<Value> {
    let service = state.service.read().await;
    let html = service.difficulty_fragment(&body.session).await;
    Json(json!({ "html": html }))
}

pub async fn sessions(
    State(state): State<AppState>,
    Json(body): Json<FragmentBody>,
) -> Json<Value> {
    let service = state.service.read().await;
    Json(service.sessions_value(&body.session).await)
}

//! Axum-based local gateway for the hosted VisoLearn Space.
//!
//! The credential stays in the backend: the browser never receives or sends
//! the Hugging Face token, it only posts its own session state and reads the
//! rendered results.

mod handlers;
mod ui;

use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use handlers::AppState;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visolearn_core::{EnvToggles, GatewayConfig};

async fn index() -> Html<&'static str> {
    Html(ui::INDEX_HTML)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/status", get(handlers::status))
        .route("/api/v1/connect", post(handlers::connect))
        .route("/api/v1/validate", post(handlers::validate))
        .route("/api/v1/fallback", post(handlers::set_fallback))
        .route("/api/v1/generate", post(handlers::generate))
        .route("/api/v1/chat", post(handlers::chat))
        .route("/api/v1/save/log", post(handlers::save_log))
        .route("/api/v1/save/images", post(handlers::save_images))
        .route("/api/v1/fragments/checklist", post(handlers::checklist_fragment))
        .route("/api/v1/fragments/progress", post(handlers::progress_fragment))
        .route("/api/v1/fragments/attempts", post(handlers::attempts_fragment))
        .route("/api/v1/fragments/difficulty", post(handlers::difficulty_fragment))
        .route("/api/v1/sessions", post(handlers::sessions))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load .env first so HF_TOKEN and the toggles are visible to everything
    // below. The token never leaves the backend.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[visolearn-gateway] .env not loaded: {e} (using system environment)");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match GatewayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("config load failed: {e}");
            std::process::exit(1);
        }
    };
    let mut toggles = EnvToggles::from_env();

    // CLI surface: --port and --no-queue only, no subcommands.
    let args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().position(|a| a == "--port") {
        match args.get(pos + 1).and_then(|v| v.parse().ok()) {
            Some(port) => config.port = port,
            None => {
                eprintln!("Usage: visolearn-gateway [--port <PORT>] [--no-queue]");
                std::process::exit(1);
            }
        }
    }
    if args.iter().any(|a| a == "--no-queue") {
        toggles.disable_queue = true;
    }

    if toggles.hf_token.is_none() {
        tracing::warn!(
            "HF_TOKEN is not set; the gateway starts but cannot connect until a token is provided"
        );
    }

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, toggles);
    tracing::info!(%addr, app = %state.config.app_name, space = %state.config.space_id, "starting gateway");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("cannot bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app(state)).await {
        tracing::error!("server error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use visolearn_core::{ActiveSession, SessionConfig};

    fn test_state(fallback: bool) -> AppState {
        let config = GatewayConfig::default();
        let toggles = EnvToggles {
            hf_token: None,
            disable_queue: false,
            fallback,
        };
        AppState::new(config, toggles)
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_responds_ok() {
        let app = app(test_state(false));
        let res = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_identity_and_flags() {
        let app = app(test_state(true));
        let res = app
            .oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["app_name"], "VisoLearn Local Gateway");
        assert_eq!(json["connected"], false);
        assert_eq!(json["fallback"], true);
    }

    #[tokio::test]
    async fn generate_in_fallback_mode_is_degraded() {
        let app = app(test_state(true));
        let config = serde_json::to_value(SessionConfig::default()).unwrap();
        let res = app.oneshot(post_json("/api/v1/generate", &config)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["degraded"], true);
        assert!(json["value"]["session"]["image"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml"));
        assert_eq!(json["value"]["conversation"]["identified_details"], 0);
    }

    #[tokio::test]
    async fn chat_in_fallback_mode_appends_turns() {
        let state = test_state(true);
        let generate_app = app(state.clone());
        let config = serde_json::to_value(SessionConfig::default()).unwrap();
        let res = generate_app.oneshot(post_json("/api/v1/generate", &config)).await.unwrap();
        let generated = body_json(res).await;

        let chat_body = serde_json::json!({
            "conversation": generated["value"]["conversation"],
            "session": generated["value"]["session"],
            "message": "I can see the main subject",
        });
        let res = app(state).oneshot(post_json("/api/v1/chat", &chat_body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["degraded"], true);
        assert_eq!(json["value"]["conversation"]["turns"].as_array().unwrap().len(), 2);
        assert_eq!(json["value"]["session"]["attempt_count"], 1);
    }

    #[tokio::test]
    async fn empty_chat_message_is_a_bad_request() {
        let app = app(test_state(true));
        let session = serde_json::to_value(ActiveSession::new(SessionConfig::default())).unwrap();
        let chat_body = serde_json::json!({
            "conversation": { "turns": [], "identified_details": 0 },
            "session": session,
            "message": "   ",
        });
        let res = app.oneshot(post_json("/api/v1/chat", &chat_body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn save_in_fallback_mode_is_a_bad_gateway() {
        let app = app(test_state(true));
        let session = serde_json::to_value(ActiveSession::new(SessionConfig::default())).unwrap();
        let body = serde_json::json!({ "session": session });
        let res = app.oneshot(post_json("/api/v1/save/log", &body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(res).await;
        assert_eq!(json["kind"], "remote_call");
    }

    #[tokio::test]
    async fn connect_without_any_token_is_unauthorized() {
        let app = app(test_state(false));
        let res = app
            .oneshot(post_json("/api/v1/connect", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(res).await;
        assert_eq!(json["kind"], "auth");
    }

    #[tokio::test]
    async fn validate_without_a_connection_reports_not_ready() {
        let app = app(test_state(false));
        let res = app
            .oneshot(post_json("/api/v1/validate", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["ready"], false);
    }

    #[tokio::test]
    async fn fragments_render_for_a_posted_session() {
        let state = test_state(true);
        let generate_app = app(state.clone());
        let config = serde_json::to_value(SessionConfig::default()).unwrap();
        let res = generate_app.oneshot(post_json("/api/v1/generate", &config)).await.unwrap();
        let generated = body_json(res).await;

        let body = serde_json::json!({ "session": generated["value"]["session"] });
        let res = app(state)
            .oneshot(post_json("/api/v1/fragments/progress", &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert!(json["html"].as_str().unwrap().contains("Progress: 0/"));
    }
}

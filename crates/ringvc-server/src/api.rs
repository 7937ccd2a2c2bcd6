//! HTTP surface the platform adapter talks to.
//!
//! The adapter resolves gateway state into a [`ChannelSnapshot`] and posts
//! it here together with the event or command; the reply tells it what to
//! say back to the user.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use ringvc_shared::{ChannelSnapshot, UserId};
use ringvc_store::StoreStatus;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::commands::{Command, Invoker};
use crate::engine::{EngineHandle, JoinReport};
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            started_at: Utc::now(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events/join", post(voice_join))
        .route("/commands", post(run_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    started_at: DateTime<Utc>,
    store: StoreStatus,
}

#[derive(Deserialize)]
struct JoinRequest {
    channel: ChannelSnapshot,
    user: UserId,
}

#[derive(Deserialize)]
struct CommandRequest {
    invoker: Invoker,
    #[serde(flatten)]
    command: Command,
}

#[derive(Serialize)]
struct CommandResponse {
    reply: String,
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let store = state.engine.status().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at,
        store,
    }))
}

async fn voice_join(
    State(state): State<AppState>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<JoinReport>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let report = state.engine.join(request.channel, request.user).await?;
    Ok(Json(report))
}

async fn run_command(
    State(state): State<AppState>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let reply = state.engine.execute(request.invoker, request.command).await?;
    Ok(Json(CommandResponse { reply }))
}

/// Start the HTTP server. Runs until the listener fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::delivery::testing::RecordingDelivery;
    use crate::engine::spawn_engine;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ringvc_store::{DebouncedStore, StorePaths};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn app(dir: &TempDir, delivery: Arc<RecordingDelivery>) -> Router {
        let paths = StorePaths::in_dir(dir.path());
        let (store, state) = DebouncedStore::open(paths, Duration::from_secs(3600))
            .await
            .unwrap();
        let (engine, _task) = spawn_engine(state, store, delivery);
        build_router(AppState::new(engine))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_store() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Arc::new(RecordingDelivery::default())).await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        // Opening an empty directory writes the initial file.
        assert_eq!(body["store"]["saves"], 1);
    }

    #[tokio::test]
    async fn test_command_and_join_flow() {
        let dir = TempDir::new().unwrap();
        let delivery = Arc::new(RecordingDelivery::default());
        let app = app(&dir, delivery.clone()).await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/commands",
                serde_json::json!({
                    "invoker": { "user": "b" },
                    "command": "signup",
                    "channel": "c"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["reply"], "Signed up for <#c>. Use /unsignup to unsignup");

        let response = app
            .oneshot(post_json(
                "/events/join",
                serde_json::json!({
                    "channel": { "id": "c", "name": "lounge", "occupants": ["a"] },
                    "user": "a"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["users"], serde_json::json!(["b"]));

        let sent = delivery.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "`@a` just joined `#lounge`, <@b>");
    }

    #[tokio::test]
    async fn test_unknown_command_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Arc::new(RecordingDelivery::default())).await;

        let response = app
            .oneshot(post_json(
                "/commands",
                serde_json::json!({ "invoker": { "user": "u" }, "command": "dance" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));
    }
}

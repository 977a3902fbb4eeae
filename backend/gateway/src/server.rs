//! HTTP entrypoint: router, shared state, and the REST handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use screensage_history::HistoryStore;
use screensage_pipeline::{PipelineCoordinator, SubscriberRegistry};

use crate::ws;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: PipelineCoordinator,
    pub store: Arc<dyn HistoryStore>,
    pub registry: Arc<SubscriberRegistry>,
    /// Default (and maximum sensible) page size for `/api/history`.
    pub history_page_size: usize,
}

/// Build the Axum router with all API routes. When `static_dir` is set,
/// unmatched paths serve the viewer frontend from that directory.
pub fn build_router(state: GatewayState, static_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/api/upload", post(upload))
        .route("/api/history", get(list_history))
        .route("/api/history/{id}", get(history_by_id).delete(delete_history))
        .route("/api/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app
}

/// Bind and serve until the shutdown future resolves.
pub async fn serve(
    addr: SocketAddr,
    state: GatewayState,
    static_dir: Option<PathBuf>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(state, static_dir);
    info!("gateway listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct UploadRequest {
    /// Base64 image payload, with or without a `data:` URL prefix.
    pub image: String,
}

/// Strip an optional data-URL prefix and decode the payload.
fn decode_image(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let raw = match payload.find("base64,") {
        Some(idx) => &payload[idx + "base64,".len()..],
        None => payload,
    };
    STANDARD.decode(raw.trim())
}

/// Accept an uploaded screenshot and return its correlation id
/// immediately; processing continues asynchronously.
async fn upload(
    State(state): State<GatewayState>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<Value>, StatusCode> {
    if request.image.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let image = decode_image(&request.image).map_err(|e| {
        warn!(error = %e, "rejecting upload with undecodable image payload");
        StatusCode::BAD_REQUEST
    })?;

    let process_id = state.pipeline.submit(image).await;
    Ok(Json(json!({
        "id": process_id,
        "status": "processing",
    })))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Recent records, most recent first.
async fn list_history(
    State(state): State<GatewayState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or(state.history_page_size)
        .min(state.history_page_size);
    match state.store.recent(limit).await {
        Ok(records) => Ok(Json(json!(records))),
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch history");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn history_by_id(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    match state.store.by_id(id).await {
        Ok(record) => Ok(Json(json!(record))),
        Err(e) if e.is_not_found() => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(error = %e, id, "failed to fetch record");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn delete_history(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    match state.store.delete(id).await {
        Ok(()) => Ok(Json(json!({ "status": "deleted", "id": id }))),
        Err(e) if e.is_not_found() => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(error = %e, id, "failed to delete record");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "screensage",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use screensage_history::MemoryHistoryStore;
    use screensage_pipeline::{BroadcastHub, PipelineTimeouts, RunTracker};
    use screensage_providers::{MockGenerator, MockRecognizer};

    fn state() -> GatewayState {
        let store = Arc::new(MemoryHistoryStore::new());
        let registry = Arc::new(SubscriberRegistry::new(store.clone(), 10));
        let hub = BroadcastHub::start(registry.clone());
        let tracker = Arc::new(RunTracker::new());
        let pipeline = PipelineCoordinator::new(
            Arc::new(MockRecognizer::returning("hello")),
            Arc::new(MockGenerator::returning("world")),
            store.clone(),
            hub,
            tracker,
            PipelineTimeouts::default(),
        );
        GatewayState {
            pipeline,
            store,
            registry,
            history_page_size: 50,
        }
    }

    #[test]
    fn test_decode_image_accepts_plain_and_data_url() {
        let encoded = STANDARD.encode(b"png-bytes");
        assert_eq!(decode_image(&encoded).unwrap(), b"png-bytes");

        let data_url = format!("data:image/png;base64,{}", encoded);
        assert_eq!(decode_image(&data_url).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(decode_image("!!not-base64!!").is_err());
    }

    #[tokio::test]
    async fn test_upload_returns_process_id_immediately() {
        let state = state();
        let tracker = state.pipeline.tracker().clone();
        let body = UploadRequest {
            image: STANDARD.encode(b"img"),
        };
        let response = upload(State(state), Json(body)).await.unwrap();
        let id = response.0["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("proc_"));
        assert_eq!(response.0["status"], "processing");
        // let the spawned run settle before the fixture drops
        tracker.wait_all().await;
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_payloads() {
        let state = state();
        let empty = upload(
            State(state.clone()),
            Json(UploadRequest {
                image: String::new(),
            }),
        )
        .await;
        assert_eq!(empty.unwrap_err(), StatusCode::BAD_REQUEST);

        let garbage = upload(
            State(state),
            Json(UploadRequest {
                image: "!!not-base64!!".to_string(),
            }),
        )
        .await;
        assert_eq!(garbage.unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_endpoints_round_trip() {
        let state = state();
        let body = UploadRequest {
            image: STANDARD.encode(b"img"),
        };
        upload(State(state.clone()), Json(body)).await.unwrap();
        state.pipeline.tracker().wait_all().await;

        let listed = list_history(State(state.clone()), Query(HistoryQuery { limit: None }))
            .await
            .unwrap();
        let records = listed.0.as_array().unwrap().clone();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["text"], "hello");
        let id = records[0]["id"].as_i64().unwrap();

        let fetched = history_by_id(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(fetched.0["answer"], "world");

        delete_history(State(state.clone()), Path(id)).await.unwrap();
        let missing = history_by_id(State(state), Path(id)).await;
        assert_eq!(missing.unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_service_name() {
        let response = health().await;
        assert_eq!(response.0["status"], "ok");
        assert_eq!(response.0["service"], "screensage");
    }
}

//! HTTP API used by the presentation layer.
//!
//! Reads return the engine's latest [`Snapshot`]. Gesture endpoints only queue
//! the gesture; the effect shows up in a later snapshot.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::engine::Appliance;
use crate::engine::EngineHandle;
use crate::engine::Gesture;
use crate::engine::Snapshot;
use crate::engine::UserSlot;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
    remote_url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    version: &'static str,
    remote_url: String,
    engine: EngineHandle,
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
            remote_url: state.remote_url.clone(),
        }),
    )
}

/// Handler for GET /v1/display
#[tracing::instrument(skip(state))]
async fn display(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(Snapshot::clone(&state.engine.snapshot()))
}

async fn submit(state: &AppState, gesture: Gesture) -> Response {
    match state.engine.gesture(gesture).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            tracing::warn!("Dropping {:?}: {}", gesture, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Handler for POST /v1/appliances/:appliance/click
#[tracing::instrument(skip(state))]
async fn click_appliance(
    State(state): State<Arc<AppState>>,
    Path(appliance): Path<Appliance>,
) -> Response {
    submit(&state, Gesture::ClickAppliance(appliance)).await
}

/// Handler for POST /v1/users/:slot/click
#[tracing::instrument(skip(state))]
async fn click_user(State(state): State<Arc<AppState>>, Path(slot): Path<UserSlot>) -> Response {
    submit(&state, Gesture::ClickUser(slot)).await
}

/// Handler for POST /v1/users/:slot/toggle
#[tracing::instrument(skip(state))]
async fn toggle_user(State(state): State<Arc<AppState>>, Path(slot): Path<UserSlot>) -> Response {
    submit(&state, Gesture::ToggleUser(slot)).await
}

/// Handler for POST /v1/selection/cancel
#[tracing::instrument(skip(state))]
async fn cancel_selection(State(state): State<Arc<AppState>>) -> Response {
    submit(&state, Gesture::CancelSelection).await
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/display", get(display))
        .route("/v1/appliances/:appliance/click", post(click_appliance))
        .route("/v1/users/:slot/click", post(click_user))
        .route("/v1/users/:slot/toggle", post(toggle_user))
        .route("/v1/selection/cancel", post(cancel_selection))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// Binds to `listen:port` and serves until `shutdown_rx` fires.
pub async fn serve(
    listen: String,
    port: u16,
    engine: EngineHandle,
    remote_url: String,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        version: env!("CARGO_PKG_VERSION"),
        remote_url,
        engine,
    });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

//! HTTP string-model service.
//!
//! Hosts one [`StringModel`] and serves it in the `{status, data}` envelope the
//! stringscope panel reads.

pub mod model;

use std::io;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use log::{info, warn};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use stringscope_core::API_PREFIX;

pub use model::{StateData, StringModel, UpdateError, UpdateRequest};

/// Shared server state.
struct AppState {
    model: Mutex<StringModel>,
}

fn success(data: StateData) -> Json<Value> {
    Json(json!({ "status": "success", "data": data }))
}

fn failure(status: StatusCode, detail: impl Into<String>) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "status": "error", "detail": detail.into() })),
    )
}

async fn handle_state(State(state): State<Arc<AppState>>) -> Json<Value> {
    let model = state.model.lock().await;
    success(model.to_data())
}

async fn handle_update(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("update rejected: {}", rejection.body_text());
            return failure(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let mut model = state.model.lock().await;
    match model.apply(&update) {
        Ok(()) => {
            info!("parameters updated: {update:?}");
            (StatusCode::OK, success(model.to_data()))
        }
        Err(err) => {
            warn!("update rejected: {err}");
            failure(StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": stringscope_core::VERSION,
    }))
}

async fn handle_index() -> Json<Value> {
    Json(json!({
        "name": "Stringscope Server",
        "version": stringscope_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/api/v1/string-theory/": {
                "method": "GET",
                "description": "Current parameters, compactification and mass spectrum",
            },
            "/api/v1/string-theory/update": {
                "method": "POST",
                "description": "Update parameters and return the recomputed state",
                "body": {
                    "dimensions": "Integer, 4-26",
                    "tension": "Float, 1e-6 to 1e6",
                    "coupling": "Float, 1e-6 to 1",
                    "alpha_prime": "Float, 1e-6 to 100",
                    "compactification_radius": "Float > 0, applied to every compact dimension",
                    "topology": "Calabi-Yau, Torus, Orbifold or K3",
                }
            },
            "/health": "Health check",
        },
    }))
}

/// Build the axum router around `model`.
pub fn build_router(model: StringModel) -> Router {
    let state = Arc::new(AppState {
        model: Mutex::new(model),
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route(API_PREFIX, get(handle_state))
        .route(&format!("{API_PREFIX}/"), get(handle_state))
        .route(&format!("{API_PREFIX}/update"), post(handle_update))
        .with_state(state)
}

/// Serve the default model on an already bound listener.
pub async fn serve(listener: TcpListener) -> io::Result<()> {
    axum::serve(listener, build_router(StringModel::default())).await
}

/// Bind `host:port` and run the service until the process exits.
pub async fn run_server(host: &str, port: u16) -> io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    serve(listener).await
}

//! HTTP Endpoint Layer
//!
//! Stateless wrappers over the counter. Callers parse the numeric suffix of
//! `pong N` and the bare count body as decimal integers, so both formats are
//! fixed.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, ResponseFormat, HEALTH_PATH};
use crate::error::ApiError;
use crate::state::AppState;

/// JSON body of the increment route.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingPongResponse {
    pub message: String,
}

/// Build the router: `/` and the increment path increment, the count path
/// peeks, `/health` probes.
pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    let increment = get(increment_handler).post(increment_handler);

    let mut app = Router::new().route("/", increment.clone());
    if config.increment_path != "/" {
        app = app.route(&config.increment_path, increment);
    }

    app.route(&config.count_path, get(count_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(state)
}

pub async fn increment_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let value = state.counter.increment_and_get().await?;
    let message = format!("pong {value}");
    info!("Responded with: {message}");

    Ok(match state.response_format {
        ResponseFormat::Json => Json(PingPongResponse { message }).into_response(),
        ResponseFormat::Text => message.into_response(),
    })
}

pub async fn count_handler(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    let value = state.counter.peek().await?;
    info!("Returned count: {value}");

    Ok(value.to_string())
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    if state.health_probe_backend {
        state.counter.ping().await.map_err(ApiError::Unhealthy)?;
    }

    Ok("OK")
}

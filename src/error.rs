//! Errors at the service edge.

use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pingpong_core::{CounterError, EstablishError};
use thiserror::Error;

use crate::config::ConfigError;

/// Request failures. Bodies never carry a counter value.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("counter unavailable: {0}")]
    Counter(#[from] CounterError),

    #[error("backend unhealthy: {0}")]
    Unhealthy(CounterError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Counter { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
            ApiError::Unhealthy { .. } => (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"),
        };

        (status, body).into_response()
    }
}

/// Failures that stop the process.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to establish counter backend: {0}")]
    Establish(#[from] EstablishError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingpong_core::StorageError;

    #[test]
    fn test_counter_failure_is_500_without_value() {
        let err = ApiError::from(CounterError::Inconsistent { value: 12345 });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unhealthy_is_503() {
        let err = ApiError::Unhealthy(CounterError::BackendUnavailable(StorageError::connection(
            "refused",
        )));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

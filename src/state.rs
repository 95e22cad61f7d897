use std::sync::Arc;

use pingpong_core::Counter;

use crate::config::{Config, ResponseFormat};

/// Everything a handler needs, shared through axum's `State`.
pub struct AppState {
    pub counter: Counter,
    pub response_format: ResponseFormat,
    pub health_probe_backend: bool,
}

impl AppState {
    pub fn new(counter: Counter, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            counter,
            response_format: config.response_format,
            health_probe_backend: config.health_probe_backend,
        })
    }
}

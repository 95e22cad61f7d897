//! PingPong - Resilient Counter Service
//!
//! An HTTP service around one durable counter.
//!
//! Features:
//! - `GET|POST /` and the increment path return `pong N`, N = pre-increment value
//! - The count path returns the committed value as bare decimal text
//! - `/health` pings the backend
//! - Postgres or file storage, reconnected with bounded retries at startup
//!
//! Startup order matters: the listener is bound only after the backend is
//! established, so a process that cannot reach its store never takes traffic.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod routes;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use pingpong_core::{establish, Connector, Counter, Delay};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{error, info};

use config::Config;
use error::ServiceError;
use lifecycle::{Lifecycle, Phase};
use state::AppState;

/// Establish the backend and build shared state.
///
/// # Errors
/// Returns [`ServiceError::Establish`] if the backend cannot be reached or
/// prepared.
pub async fn start<C: Connector>(
    config: &Config,
    connector: &C,
    delay: &dyn Delay,
    lifecycle: &mut Lifecycle,
) -> Result<Arc<AppState>, ServiceError> {
    lifecycle.advance(Phase::Connecting);

    let backend = match establish(connector, &config.retry_policy(), delay).await {
        Ok(backend) => backend,
        Err(e) => {
            lifecycle.advance(Phase::Failed);
            return Err(e.into());
        }
    };

    let counter = Counter::new(backend).with_timeout(config.backend_timeout());
    lifecycle.advance(Phase::Ready);

    Ok(AppState::new(counter, config))
}

/// Serve on an already bound listener until `shutdown` resolves, then close
/// the backend.
///
/// # Errors
/// Returns [`ServiceError::Serve`] if the server fails.
pub async fn serve(
    state: Arc<AppState>,
    config: &Config,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
    lifecycle: &mut Lifecycle,
) -> Result<(), ServiceError> {
    let app = routes::router(Arc::clone(&state), config);

    lifecycle.advance(Phase::Serving);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServiceError::Serve);

    lifecycle.advance(Phase::Draining);
    state.counter.close().await;
    lifecycle.advance(Phase::Stopped);

    result
}

/// Validate, establish, bind, serve.
///
/// # Errors
/// Any [`ServiceError`]; on `Establish` the listener was never bound.
pub async fn run<C: Connector>(
    config: &Config,
    connector: &C,
    delay: &dyn Delay,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServiceError> {
    config.validate()?;
    let addr = config.bind_addr().await?;

    let mut lifecycle = Lifecycle::new();
    let state = start(config, connector, delay, &mut lifecycle).await?;

    info!("Binding to {addr}");
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(source) => {
            lifecycle.advance(Phase::Failed);
            state.counter.close().await;
            return Err(ServiceError::Bind { addr, source });
        }
    };
    info!("Starting PingPong server on {addr}");

    serve(state, config, listener, shutdown, &mut lifecycle).await
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

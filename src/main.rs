//! PingPong server binary.

use clap::Parser;
use pingpong::config::{BackendKind, Config, APP_VERSION};
use pingpong::{run, shutdown_signal};
use pingpong_core::{FileConnector, TokioDelay};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::parse();

    // Initialize logging
    let filter = match config.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("PingPong v{}", APP_VERSION);

    match config.backend {
        BackendKind::File => {
            tracing::info!(
                "Using file backend at {} ({} writes)",
                config.counter_file.display(),
                config.counter_file_write_mode
            );
            let connector =
                FileConnector::new(config.counter_file.clone(), config.counter_file_write_mode);
            run(&config, &connector, &TokioDelay, shutdown_signal()).await?;
        }
        BackendKind::Postgres => run_postgres(&config).await?,
    }

    tracing::info!("Server shut down");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn run_postgres(config: &Config) -> anyhow::Result<()> {
    use pingpong_core::PostgresConnector;

    tracing::info!(
        "Connecting to database at {}:{}",
        config.postgres_host,
        config.postgres_port
    );
    let connector = PostgresConnector::new(
        &config.postgres_host,
        config.postgres_port,
        &config.postgres_user,
        &config.postgres_password,
        &config.postgres_db,
        &config.postgres_sslmode,
        config.backend_timeout(),
    )?;
    run(config, &connector, &TokioDelay, shutdown_signal()).await?;
    Ok(())
}

#[cfg(not(feature = "postgres"))]
async fn run_postgres(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("built without the `postgres` feature; use COUNTER_BACKEND=file")
}

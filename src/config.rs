//! Configuration
//!
//! TigerStyle: every option is a CLI flag backed by an environment variable
//! with a documented default. `.env` is loaded before parsing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use pingpong_core::{
    FileWriteMode, RetryPolicy, BACKEND_TIMEOUT_MS_DEFAULT, CONNECT_ATTEMPTS_MAX,
};
use thiserror::Error;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Application name
pub const APP_NAME: &str = "pingpong";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Route of the health check; not configurable.
pub const HEALTH_PATH: &str = "/health";

// =============================================================================
// Types
// =============================================================================

/// Where the counter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// PostgreSQL table with a single row
    Postgres,
    /// Local file with a decimal value
    File,
}

/// Body of the increment response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResponseFormat {
    /// `{"message":"pong N"}`
    Json,
    /// `pong N`
    Text,
}

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `CONNECT_MAX_RETRIES` out of range.
    #[error("connect attempts must be within 1..={max}, got {value}")]
    Attempts {
        /// Configured value
        value: u32,
        /// Largest accepted value
        max: u32,
    },

    /// `BACKEND_TIMEOUT_MS` is zero.
    #[error("backend timeout must be positive")]
    Timeout,

    /// A route path is malformed or collides with another route.
    #[error("invalid route {path:?}: {reason}")]
    Route {
        /// Offending path
        path: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// A required value is empty.
    #[error("{0} cannot be empty")]
    Missing(&'static str),

    /// `BIND_HOST`/`PORT` do not resolve to a socket address.
    #[error("invalid listen address {0:?}")]
    ListenAddress(String),
}

// =============================================================================
// Config
// =============================================================================

/// PingPong - resilient ping-pong counter service
#[derive(Parser, Debug, Clone)]
#[command(name = APP_NAME)]
#[command(about = "Durable, race-free ping-pong counter over HTTP")]
#[command(version)]
pub struct Config {
    /// Counter storage
    #[arg(long, env = "COUNTER_BACKEND", value_enum, default_value = "postgres")]
    pub backend: BackendKind,

    /// Postgres host
    #[arg(long, env = "POSTGRES_HOST", default_value = "localhost")]
    pub postgres_host: String,

    /// Postgres port
    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub postgres_port: u16,

    /// Postgres user
    #[arg(long, env = "POSTGRES_USER", default_value = "pingponguser")]
    pub postgres_user: String,

    /// Postgres password
    #[arg(long, env = "POSTGRES_PASSWORD", default_value = "pingpongpass", hide_env_values = true)]
    pub postgres_password: String,

    /// Postgres database
    #[arg(long, env = "POSTGRES_DB", default_value = "pingpongdb")]
    pub postgres_db: String,

    /// Postgres SSL mode (disable, allow, prefer, require, verify-ca, verify-full)
    #[arg(long, env = "POSTGRES_SSLMODE", default_value = "disable")]
    pub postgres_sslmode: String,

    /// Counter file for the file backend
    #[arg(long, env = "COUNTER_FILE", default_value = "files/pingpong.txt")]
    pub counter_file: PathBuf,

    /// How the file backend rewrites the counter (atomic, truncate)
    #[arg(long, env = "COUNTER_FILE_WRITE_MODE", default_value = "atomic")]
    pub counter_file_write_mode: FileWriteMode,

    /// Connection attempts before giving up
    #[arg(long, env = "CONNECT_MAX_RETRIES", default_value_t = 30)]
    pub connect_max_retries: u32,

    /// Delay between connection attempts in milliseconds
    #[arg(long, env = "CONNECT_RETRY_DELAY_MS", default_value_t = 2_000)]
    pub connect_retry_delay_ms: u64,

    /// Timeout of a single backend operation in milliseconds
    #[arg(long, env = "BACKEND_TIMEOUT_MS", default_value_t = BACKEND_TIMEOUT_MS_DEFAULT)]
    pub backend_timeout_ms: u64,

    /// Listen host
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub bind_host: String,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Route that increments (in addition to `/`)
    #[arg(long, env = "INCREMENT_PATH", default_value = "/pingpong")]
    pub increment_path: String,

    /// Route that returns the current count
    #[arg(long, env = "COUNT_PATH", default_value = "/pingpongcount")]
    pub count_path: String,

    /// Increment response body
    #[arg(long, env = "RESPONSE_FORMAT", value_enum, default_value = "json")]
    pub response_format: ResponseFormat,

    /// Ping the backend in the health check
    #[arg(long, env = "HEALTH_PROBE_BACKEND", default_value_t = true, action = clap::ArgAction::Set)]
    pub health_probe_backend: bool,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// Check cross-field constraints clap cannot express.
    ///
    /// # Errors
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_max_retries == 0 || self.connect_max_retries > CONNECT_ATTEMPTS_MAX {
            return Err(ConfigError::Attempts {
                value: self.connect_max_retries,
                max: CONNECT_ATTEMPTS_MAX,
            });
        }
        if self.backend_timeout_ms == 0 {
            return Err(ConfigError::Timeout);
        }
        if self.bind_host.is_empty() {
            return Err(ConfigError::Missing("BIND_HOST"));
        }
        match self.backend {
            BackendKind::Postgres if self.postgres_host.is_empty() => {
                return Err(ConfigError::Missing("POSTGRES_HOST"));
            }
            BackendKind::Postgres if self.postgres_db.is_empty() => {
                return Err(ConfigError::Missing("POSTGRES_DB"));
            }
            BackendKind::File if self.counter_file.as_os_str().is_empty() => {
                return Err(ConfigError::Missing("COUNTER_FILE"));
            }
            _ => {}
        }

        for path in [&self.increment_path, &self.count_path] {
            if !path.starts_with('/') {
                return Err(route_error(path, "must start with '/'"));
            }
            if path == HEALTH_PATH {
                return Err(route_error(path, "reserved for the health check"));
            }
        }
        if self.count_path == "/" {
            return Err(route_error(&self.count_path, "'/' always increments"));
        }
        if self.count_path == self.increment_path {
            return Err(route_error(&self.count_path, "same as the increment route"));
        }

        Ok(())
    }

    /// Retry policy for the establisher.
    ///
    /// # Panics
    /// Panics if called on a config that fails [`Config::validate`].
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_max_retries,
            Duration::from_millis(self.connect_retry_delay_ms),
        )
    }

    /// Per-operation backend timeout.
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Listen address. `BIND_HOST` may be an IP literal or a hostname; the
    /// first resolved address wins.
    ///
    /// # Errors
    /// Returns error if the host does not resolve.
    pub async fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let unresolved = || ConfigError::ListenAddress(format!("{}:{}", self.bind_host, self.port));

        tokio::net::lookup_host((self.bind_host.as_str(), self.port))
            .await
            .map_err(|_| unresolved())?
            .next()
            .ok_or_else(unresolved)
    }
}

fn route_error(path: &str, reason: &'static str) -> ConfigError {
    ConfigError::Route {
        path: path.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::{CommandFactory, FromArgMatches};

    /// Parse flags only; environment fallbacks are stripped so the host
    /// environment cannot leak into results.
    fn try_parse(args: &[&str]) -> Result<Config, clap::Error> {
        let mut argv = vec![APP_NAME];
        argv.extend_from_slice(args);
        let matches = Config::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(argv)?;
        Config::from_arg_matches(&matches)
    }

    fn parse(args: &[&str]) -> Config {
        try_parse(args).unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let config = parse(&["--postgres-host", "localhost"]);

        assert_eq!(config.postgres_port, 5432);
        assert_eq!(config.postgres_user, "pingponguser");
        assert_eq!(config.postgres_db, "pingpongdb");
        assert_eq!(config.postgres_sslmode, "disable");
        assert_eq!(config.connect_max_retries, 30);
        assert_eq!(config.retry_policy().delay(), Duration::from_secs(2));
        assert_eq!(config.backend_timeout(), Duration::from_secs(5));
        assert_eq!(config.increment_path, "/pingpong");
        assert_eq!(config.count_path, "/pingpongcount");
        assert_eq!(config.response_format, ResponseFormat::Json);
        assert_eq!(config.counter_file_write_mode, FileWriteMode::Atomic);
        assert!(config.health_probe_backend);
        assert_eq!(config.bind_addr().await.unwrap().port(), 8080);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_flags_override() {
        let config = parse(&[
            "--backend",
            "file",
            "--counter-file",
            "/tmp/count.txt",
            "--counter-file-write-mode",
            "truncate",
            "--response-format",
            "text",
            "--health-probe-backend",
            "false",
            "--port",
            "9000",
        ]);

        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.counter_file, PathBuf::from("/tmp/count.txt"));
        assert_eq!(config.counter_file_write_mode, FileWriteMode::Truncate);
        assert_eq!(config.response_format, ResponseFormat::Text);
        assert!(!config.health_probe_backend);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = parse(&["--connect-max-retries", "0"]);
        assert!(matches!(config.validate(), Err(ConfigError::Attempts { value: 0, .. })));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = parse(&["--backend-timeout-ms", "0"]);
        assert_eq!(config.validate(), Err(ConfigError::Timeout));
    }

    #[test]
    fn test_route_collisions_rejected() {
        for args in [
            ["--count-path", "/pingpong"],
            ["--count-path", "/"],
            ["--count-path", "/health"],
            ["--increment-path", "pingpong"],
        ] {
            let config = parse(&args);
            assert!(
                matches!(config.validate(), Err(ConfigError::Route { .. })),
                "{args:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_postgres_host_rejected() {
        let config = parse(&["--backend", "postgres", "--postgres-host", ""]);
        assert_eq!(config.validate(), Err(ConfigError::Missing("POSTGRES_HOST")));
    }

    #[tokio::test]
    async fn test_bad_bind_host_rejected() {
        let config = parse(&["--bind-host", "not a host"]);
        assert!(matches!(config.bind_addr().await, Err(ConfigError::ListenAddress(_))));

        let config = parse(&["--bind-host", ""]);
        assert_eq!(config.validate(), Err(ConfigError::Missing("BIND_HOST")));
    }

    #[tokio::test]
    async fn test_bind_host_accepts_hostname() {
        let config = parse(&["--bind-host", "localhost", "--port", "9001"]);
        assert_eq!(config.validate(), Ok(()));

        let addr = config.bind_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9001);
    }

    #[test]
    fn test_environment_is_ignored_by_test_parser() {
        std::env::set_var("COUNT_PATH", "/from-env");
        let config = parse(&[]);
        std::env::remove_var("COUNT_PATH");

        assert_eq!(config.count_path, "/pingpongcount");
    }

    #[test]
    fn test_unknown_write_mode_is_parse_error() {
        assert!(try_parse(&["--counter-file-write-mode", "append"]).is_err());
    }
}

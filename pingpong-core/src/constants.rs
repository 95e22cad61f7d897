//! TigerStyle Constants
//!
//! Limits and defaults, named with units last (`_MS`, `_COUNT_MAX`).

/// Default number of connection attempts before giving up.
pub const CONNECT_ATTEMPTS_DEFAULT: u32 = 30;

/// Upper bound on connection attempts accepted from configuration.
pub const CONNECT_ATTEMPTS_MAX: u32 = 10_000;

/// Default fixed delay between connection attempts.
pub const CONNECT_RETRY_DELAY_MS_DEFAULT: u64 = 2_000;

/// Default timeout for a single backend operation.
pub const BACKEND_TIMEOUT_MS_DEFAULT: u64 = 5_000;

/// Primary key of the single counter row.
pub const COUNTER_ROW_ID: i32 = 1;

/// Name of the counter table.
pub const COUNTER_TABLE_NAME: &str = "ping_counter";

/// Largest counter file we are willing to parse.
pub const COUNTER_FILE_BYTES_MAX: u64 = 64;

/// Suffix of the temporary sibling used by atomic file writes.
pub const COUNTER_FILE_TMP_SUFFIX: &str = ".tmp";

/// Maximum connections held by the Postgres pool.
pub const POSTGRES_POOL_CONNECTIONS_MAX: u32 = 5;

/// Largest single simulated clock advance.
pub const DST_TIME_ADVANCE_MS_MAX: u64 = 86_400_000;

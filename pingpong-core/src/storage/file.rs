//! FileBackend - Local File Storage
//!
//! TigerStyle: the whole counter is one decimal ASCII number in one file.
//!
//! # Layout
//!
//! ```text
//! files/pingpong.txt      "42"
//! files/pingpong.txt.tmp  (atomic mode only, transient)
//! ```
//!
//! # Recovery
//!
//! A crash between truncate and rewrite leaves an empty or partial file.
//! Empty, non-numeric, oversized or missing content reads as 0 and is logged;
//! the next increment overwrites it.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::backend::{CounterBackend, SeedOutcome};
use super::error::{StorageError, StorageResult};
use crate::constants::{COUNTER_FILE_BYTES_MAX, COUNTER_FILE_TMP_SUFFIX};
use crate::establish::Connector;

// =============================================================================
// Write Mode
// =============================================================================

/// How an increment rewrites the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileWriteMode {
    /// Truncate and rewrite in place. Not crash-atomic.
    Truncate,
    /// Write a sibling temp file, fsync, rename over the target, fsync the directory.
    #[default]
    Atomic,
}

impl FileWriteMode {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Truncate => "truncate",
            Self::Atomic => "atomic",
        }
    }
}

impl fmt::Display for FileWriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileWriteMode {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "atomic" => Ok(Self::Atomic),
            other => Err(StorageError::internal(format!(
                "unknown file write mode: {other}"
            ))),
        }
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Opens a [`FileBackend`] at a path.
#[derive(Debug, Clone)]
pub struct FileConnector {
    path: PathBuf,
    mode: FileWriteMode,
}

impl FileConnector {
    /// Connector for the given counter file.
    ///
    /// # Panics
    /// Panics if the path is empty.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mode: FileWriteMode) -> Self {
        let path = path.into();
        assert!(!path.as_os_str().is_empty(), "counter file path cannot be empty");
        Self { path, mode }
    }
}

#[async_trait]
impl Connector for FileConnector {
    type Backend = FileBackend;

    fn target(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn connect(&self, _attempt: u32) -> StorageResult<FileBackend> {
        // The directory may live on a volume that is not mounted yet.
        if let Some(parent) = parent_dir(&self.path) {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::connection(format!(
                    "failed to open directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(FileBackend::new(self.path.clone(), self.mode))
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

// =============================================================================
// FileBackend
// =============================================================================

/// Counter stored as decimal text in a single file.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    tmp_path: PathBuf,
    mode: FileWriteMode,
}

impl FileBackend {
    /// Backend over `path`. Does not touch the filesystem.
    #[must_use]
    pub fn new(path: PathBuf, mode: FileWriteMode) -> Self {
        let mut tmp = path.clone().into_os_string();
        tmp.push(COUNTER_FILE_TMP_SUFFIX);
        Self {
            path,
            tmp_path: PathBuf::from(tmp),
            mode,
        }
    }

    /// Path of the counter file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the value, mapping every malformed state to 0.
    async fn read_value(&self) -> StorageResult<u64> {
        let content = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "counter file missing, treating as 0");
                return Ok(0);
            }
            Err(e) => {
                return Err(StorageError::read(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        Ok(parse_counter(&content).unwrap_or_else(|| {
            tracing::warn!(
                path = %self.path.display(),
                bytes = content.len(),
                "malformed counter file, treating as 0"
            );
            0
        }))
    }

    async fn write_value(&self, value: u64) -> StorageResult<()> {
        match self.mode {
            FileWriteMode::Truncate => write_synced(&self.path, value).await,
            FileWriteMode::Atomic => {
                write_synced(&self.tmp_path, value).await?;
                fs::rename(&self.tmp_path, &self.path).await.map_err(|e| {
                    StorageError::write(format!(
                        "failed to rename {} over {}: {e}",
                        self.tmp_path.display(),
                        self.path.display()
                    ))
                })?;
                sync_dir(parent_dir(&self.path).unwrap_or_else(|| Path::new("."))).await
            }
        }
    }
}

/// Parse trimmed decimal content; `None` for anything else.
fn parse_counter(content: &[u8]) -> Option<u64> {
    if content.len() as u64 > COUNTER_FILE_BYTES_MAX {
        return None;
    }
    std::str::from_utf8(content).ok()?.trim().parse().ok()
}

async fn write_synced(path: &Path, value: u64) -> StorageResult<()> {
    let write_err = |e: std::io::Error| {
        StorageError::write(format!("failed to write {}: {e}", path.display()))
    };

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(write_err)?;
    file.write_all(value.to_string().as_bytes())
        .await
        .map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;
    Ok(())
}

/// Persist directory entries, so a completed rename survives power loss.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> StorageResult<()> {
    let sync_err = |e: std::io::Error| {
        StorageError::write(format!("failed to sync directory {}: {e}", dir.display()))
    };

    let handle = fs::File::open(dir).await.map_err(sync_err)?;
    handle.sync_all().await.map_err(sync_err)
}

// Directories cannot be opened for syncing here; rename durability is up to the OS.
#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> StorageResult<()> {
    Ok(())
}

#[async_trait]
impl CounterBackend for FileBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn ping(&self) -> StorageResult<()> {
        let Some(parent) = parent_dir(&self.path) else {
            return Ok(());
        };
        match fs::metadata(parent).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StorageError::connection(format!(
                "{} is not a directory",
                parent.display()
            ))),
            Err(e) => Err(StorageError::connection(format!(
                "failed to stat {}: {e}",
                parent.display()
            ))),
        }
    }

    async fn ensure_schema(&self) -> StorageResult<()> {
        match fs::metadata(&self.path).await {
            Ok(meta) if meta.is_dir() => Err(StorageError::schema(format!(
                "{} is a directory",
                self.path.display()
            ))),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::schema(format!(
                "failed to stat {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn ensure_initialized(&self) -> StorageResult<SeedOutcome> {
        match fs::try_exists(&self.path).await {
            Ok(true) => Ok(SeedOutcome::Existing(self.read_value().await?)),
            Ok(false) => {
                self.write_value(0)
                    .await
                    .map_err(|e| StorageError::schema(format!("failed to seed counter: {e}")))?;
                Ok(SeedOutcome::Created)
            }
            Err(e) => Err(StorageError::schema(format!(
                "failed to check {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn read(&self) -> StorageResult<u64> {
        self.read_value().await
    }

    async fn increment_and_return(&self) -> StorageResult<u64> {
        let current = self.read_value().await?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| StorageError::write("counter overflow"))?;
        self.write_value(next).await?;
        Ok(next)
    }

    async fn close(&self) {
        tracing::debug!(path = %self.path.display(), "closing file backend");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(dir: &TempDir, mode: FileWriteMode) -> FileBackend {
        FileConnector::new(dir.path().join("files").join("pingpong.txt"), mode)
            .connect(1)
            .await
            .unwrap()
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter(b"42"), Some(42));
        assert_eq!(parse_counter(b" 7\n"), Some(7));
        assert_eq!(parse_counter(b""), None);
        assert_eq!(parse_counter(b"4x"), None);
        assert_eq!(parse_counter(b"-1"), None);
        assert_eq!(parse_counter(&[b'1'; 100]), None);
    }

    #[test]
    fn test_write_mode_parse() {
        assert_eq!("ATOMIC".parse::<FileWriteMode>().unwrap(), FileWriteMode::Atomic);
        assert_eq!("truncate".parse::<FileWriteMode>().unwrap(), FileWriteMode::Truncate);
        assert!("append".parse::<FileWriteMode>().is_err());
    }

    #[tokio::test]
    async fn test_connect_creates_directory_and_seeds_zero() {
        let dir = TempDir::new().unwrap();
        let backend = open(&dir, FileWriteMode::Atomic).await;

        backend.ping().await.unwrap();
        backend.ensure_schema().await.unwrap();
        assert_eq!(backend.ensure_initialized().await.unwrap(), SeedOutcome::Created);

        let content = std::fs::read_to_string(backend.path()).unwrap();
        assert_eq!(content, "0");
    }

    #[tokio::test]
    async fn test_existing_value_is_kept() {
        let dir = TempDir::new().unwrap();
        let backend = open(&dir, FileWriteMode::Atomic).await;
        std::fs::write(backend.path(), "17").unwrap();

        assert_eq!(
            backend.ensure_initialized().await.unwrap(),
            SeedOutcome::Existing(17)
        );
        assert_eq!(backend.read().await.unwrap(), 17);
    }

    #[tokio::test]
    async fn test_increment_rewrites_not_appends() {
        for mode in [FileWriteMode::Truncate, FileWriteMode::Atomic] {
            let dir = TempDir::new().unwrap();
            let backend = open(&dir, mode).await;
            backend.ensure_initialized().await.unwrap();

            assert_eq!(backend.increment_and_return().await.unwrap(), 1);
            assert_eq!(backend.increment_and_return().await.unwrap(), 2);

            let content = std::fs::read_to_string(backend.path()).unwrap();
            assert_eq!(content, "2", "mode {mode}");
        }
    }

    #[tokio::test]
    async fn test_atomic_mode_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let backend = open(&dir, FileWriteMode::Atomic).await;
        backend.increment_and_return().await.unwrap();

        assert!(!backend.tmp_path.exists());
    }

    #[tokio::test]
    async fn test_directory_sync() {
        let dir = TempDir::new().unwrap();
        sync_dir(dir.path()).await.unwrap();

        #[cfg(unix)]
        assert!(matches!(
            sync_dir(&dir.path().join("absent")).await,
            Err(StorageError::Write { .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_file_reads_as_zero() {
        let dir = TempDir::new().unwrap();
        let backend = open(&dir, FileWriteMode::Truncate).await;
        std::fs::write(backend.path(), "").unwrap();

        assert_eq!(backend.read().await.unwrap(), 0);
        assert_eq!(
            backend.ensure_initialized().await.unwrap(),
            SeedOutcome::Existing(0)
        );
        assert_eq!(backend.increment_and_return().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_garbage_file_reads_as_zero() {
        let dir = TempDir::new().unwrap();
        let backend = open(&dir, FileWriteMode::Atomic).await;
        std::fs::write(backend.path(), "pong\u{0}\u{0}").unwrap();

        assert_eq!(backend.read().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_zero() {
        let dir = TempDir::new().unwrap();
        let backend = open(&dir, FileWriteMode::Atomic).await;

        assert_eq!(backend.read().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_directory_in_place_of_file_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let backend = open(&dir, FileWriteMode::Atomic).await;
        std::fs::create_dir_all(backend.path()).unwrap();

        let err = backend.ensure_schema().await.unwrap_err();
        assert!(matches!(err, StorageError::Schema { .. }));
    }
}

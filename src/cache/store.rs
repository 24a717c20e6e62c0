//! On-disk font cache shared by all workers
//!
//! Each entry is one file named by its cache key directly under the cache
//! root. New files are written into a process-local staging directory and
//! renamed into place, so readers in any process see either no file or a
//! complete one. Freshness is derived from the file's modification time.

use crate::cache::key::CacheKey;
use crate::error::{GfoError, GfoResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name of the worker roster directory under the cache root
pub const IPC_DIR_NAME: &str = ".ipc";

/// Prefix of per-process staging directories under the cache root
const STAGING_PREFIX: &str = "stage-";

/// File used to verify the cache root is writable
const WRITE_TEST_NAME: &str = ".write-test";

/// Upper bound for the TTL (100 years) to keep duration math in range
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 3600;

/// Source of the current time for freshness checks
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Snapshot of the cache contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cached files
    pub entries: usize,
    /// Entries within their TTL
    pub fresh: usize,
    /// Entries past their TTL, waiting for eviction
    pub expired: usize,
    /// Total size of all entries
    pub total_bytes: u64,
}

/// Filesystem-backed cache store
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    staging_dir: PathBuf,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Open the cache rooted at `root`, creating it and a fresh staging area.
    ///
    /// Fails with `CacheUnavailable` if the directories cannot be created or
    /// written to.
    pub async fn open(root: impl Into<PathBuf>, ttl_seconds: u64) -> GfoResult<Self> {
        let root = root.into();
        create_dir(&root).await?;
        create_dir(&root.join(IPC_DIR_NAME)).await?;

        let suffix = Uuid::new_v4().simple().to_string();
        let staging_dir = root.join(format!("{}{}", STAGING_PREFIX, &suffix[..8]));
        create_dir(&staging_dir).await?;
        write_test(&staging_dir).await?;

        debug!(
            "Opened cache at {} (staging {})",
            root.display(),
            staging_dir.display()
        );

        Ok(Self {
            root,
            staging_dir,
            ttl: chrono::Duration::seconds(ttl_seconds.min(MAX_TTL_SECS) as i64),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for freshness checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Wipe and recreate the cache root and its roster directory.
    ///
    /// Meant to run once before any worker starts.
    pub async fn reset(root: &Path) -> GfoResult<()> {
        if root.exists() {
            info!("Removing existing cache directory {}", root.display());
            fs::remove_dir_all(root)
                .await
                .map_err(|e| unavailable(root, e))?;
        }

        create_dir(root).await?;
        write_test(root).await?;
        create_dir(&root.join(IPC_DIR_NAME)).await?;

        info!("Cache directory {} is ready", root.display());
        Ok(())
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Process-local staging directory
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Shared worker roster directory
    pub fn ipc_dir(&self) -> PathBuf {
        self.root.join(IPC_DIR_NAME)
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Location of the file for `key` (which may not exist)
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Read a fresh entry. Stale entries are deleted and reported as a miss.
    pub async fn get(&self, key: &CacheKey) -> GfoResult<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        if !self.check_fresh(&path).await? {
            return Ok(None);
        }

        match fs::read(&path).await {
            Ok(bytes) => {
                debug!(key = %key, "Cache hit ({} bytes)", bytes.len());
                Ok(Some(bytes))
            }
            // Removed by a peer between the freshness check and the read
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GfoError::io(format!("reading cache file {}", path.display()), e)),
        }
    }

    /// Whether a fresh entry exists for `key`, deleting it if stale
    pub async fn is_fresh(&self, key: &CacheKey) -> GfoResult<bool> {
        self.check_fresh(&self.entry_path(key)).await
    }

    /// Path of a fresh entry for `key`, if any
    pub async fn fresh_path(&self, key: &CacheKey) -> GfoResult<Option<PathBuf>> {
        let path = self.entry_path(key);
        Ok(self.check_fresh(&path).await?.then_some(path))
    }

    /// Store `bytes` under `key` via the staging area and an atomic rename
    pub async fn put(&self, key: &CacheKey, bytes: &[u8]) -> GfoResult<()> {
        let staging_path = self
            .staging_dir
            .join(format!("{}-{}", key, Uuid::new_v4().simple()));
        let final_path = self.entry_path(key);

        fs::write(&staging_path, bytes).await.map_err(|e| {
            GfoError::io(format!("writing staging file {}", staging_path.display()), e)
        })?;

        if let Err(e) = fs::rename(&staging_path, &final_path).await {
            let _ = fs::remove_file(&staging_path).await;
            return Err(GfoError::io(
                format!("moving {} into the cache", staging_path.display()),
                e,
            ));
        }

        debug!(key = %key, "Cached {} bytes at {}", bytes.len(), final_path.display());
        Ok(())
    }

    /// Delete every entry older than the TTL. Returns the number removed.
    ///
    /// Best-effort: entries created or removed concurrently by other
    /// workers are skipped. Abandoned staging directories of other
    /// processes are removed once they are older than the TTL.
    pub async fn evict_expired(&self) -> GfoResult<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| GfoError::io(format!("reading cache directory {}", self.root.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GfoError::io("reading cache entry", e))?
        {
            let path = entry.path();
            let Some(modified) = modified_time(&path).await? else {
                continue;
            };
            let expired = self.is_expired(modified);

            if is_foreign_staging_dir(&path, &self.staging_dir) {
                if expired {
                    debug!("Removing abandoned staging directory {}", path.display());
                    if let Err(e) = fs::remove_dir_all(&path).await {
                        warn!("Failed to remove {}: {}", path.display(), e);
                    }
                }
                continue;
            }

            if !is_entry_file(&entry).await {
                continue;
            }

            if expired {
                debug!(
                    "Removing {} (age exceeds {}s)",
                    path.display(),
                    self.ttl.num_seconds()
                );
                if remove_entry(&path).await? {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!("Evicted {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Count entries and their sizes
    pub async fn stats(&self) -> GfoResult<CacheStats> {
        let mut stats = CacheStats::default();
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| GfoError::io(format!("reading cache directory {}", self.root.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GfoError::io("reading cache entry", e))?
        {
            if !is_entry_file(&entry).await {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };

            stats.entries += 1;
            stats.total_bytes += metadata.len();
            if self.is_expired(modified) {
                stats.expired += 1;
            } else {
                stats.fresh += 1;
            }
        }

        Ok(stats)
    }

    /// Remove every cache entry regardless of age. Returns the number removed.
    pub async fn clear(&self) -> GfoResult<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| GfoError::io(format!("reading cache directory {}", self.root.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GfoError::io("reading cache entry", e))?
        {
            if is_entry_file(&entry).await && remove_entry(&entry.path()).await? {
                removed += 1;
            }
        }

        info!("Cleared {} cache entries", removed);
        Ok(removed)
    }

    fn is_expired(&self, modified: SystemTime) -> bool {
        let age = self.clock.now() - DateTime::<Utc>::from(modified);
        age > self.ttl
    }

    async fn check_fresh(&self, path: &Path) -> GfoResult<bool> {
        let Some(modified) = modified_time(path).await? else {
            return Ok(false);
        };

        if self.is_expired(modified) {
            debug!("{} exceeded its cache lifespan, removing it", path.display());
            remove_entry(path).await?;
            return Ok(false);
        }

        Ok(true)
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
            if e.kind() != ErrorKind::NotFound {
                warn!(
                    "Failed to remove staging directory {}: {}",
                    self.staging_dir.display(),
                    e
                );
            }
        }
    }
}

fn unavailable(path: &Path, source: std::io::Error) -> GfoError {
    GfoError::CacheUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

async fn create_dir(path: &Path) -> GfoResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| unavailable(path, e))
}

async fn write_test(dir: &Path) -> GfoResult<()> {
    let test_path = dir.join(WRITE_TEST_NAME);
    fs::write(&test_path, b"")
        .await
        .map_err(|e| unavailable(dir, e))?;
    fs::remove_file(&test_path)
        .await
        .map_err(|e| unavailable(dir, e))?;
    debug!("Write test in {} succeeded", dir.display());
    Ok(())
}

/// Modification time, or `None` if the path vanished
async fn modified_time(path: &Path) -> GfoResult<Option<SystemTime>> {
    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GfoError::io(
                format!("reading metadata of {}", path.display()),
                e,
            ))
        }
    };

    metadata
        .modified()
        .map(Some)
        .map_err(|e| GfoError::io(format!("reading mtime of {}", path.display()), e))
}

/// Remove a cache file, tolerating a concurrent removal. Returns whether
/// this call removed it.
async fn remove_entry(path: &Path) -> GfoResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(GfoError::io(format!("removing {}", path.display()), e)),
    }
}

/// Regular, non-hidden file directly under the root
async fn is_entry_file(entry: &fs::DirEntry) -> bool {
    if entry.file_name().to_string_lossy().starts_with('.') {
        return false;
    }
    entry.file_type().await.is_ok_and(|t| t.is_file())
}

fn is_foreign_staging_dir(path: &Path, own: &Path) -> bool {
    path != own
        && path.is_dir()
        && path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with(STAGING_PREFIX))
}

//! Cross-process worker role election
//!
//! Sibling workers share a roster directory. Each one drops an empty
//! marker file named after its pid, waits until the roster holds exactly
//! the expected number of workers, and the lowest pid leads. The role is
//! computed once per [`Coordinator`] and reused afterwards.

use crate::config::ElectionConfig;
use crate::error::{GfoError, GfoResult};
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Role of this process among its sibling workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    /// Runs the background maintenance services
    Leader,
    Follower,
}

impl WorkerRole {
    pub fn is_leader(&self) -> bool {
        matches!(self, Self::Leader)
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leader => write!(f, "leader"),
            Self::Follower => write!(f, "follower"),
        }
    }
}

/// Role of `pid` given a complete roster: the lowest pid leads
pub fn elect_leader(pid: u32, roster: &BTreeSet<u32>) -> WorkerRole {
    match roster.first() {
        Some(&lowest) if lowest == pid => WorkerRole::Leader,
        _ => WorkerRole::Follower,
    }
}

/// The expected number of workers, which must be known up front
pub fn resolve_worker_count(count: Option<usize>) -> GfoResult<usize> {
    count.ok_or_else(|| {
        GfoError::ElectionFailure("the number of sibling workers is unknown".to_string())
    })
}

/// Whether a process with this pid is still running
#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs only the existence and permission check.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Elects this process's role through the shared roster directory
#[derive(Debug)]
pub struct Coordinator {
    ipc_dir: PathBuf,
    pid: u32,
    worker_count: usize,
    max_backoff: Duration,
    timeout: Option<Duration>,
    prune_stale: bool,
    role: OnceCell<WorkerRole>,
}

impl Coordinator {
    pub fn new(ipc_dir: impl Into<PathBuf>, worker_count: usize, config: &ElectionConfig) -> Self {
        Self {
            ipc_dir: ipc_dir.into(),
            pid: std::process::id(),
            worker_count,
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
            prune_stale: config.prune_stale,
            role: OnceCell::new(),
        }
    }

    /// Stand in for another process id
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn prune_stale(mut self, prune: bool) -> Self {
        self.prune_stale = prune;
        self
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// This process's role, running the election on first use
    pub async fn role(&self) -> GfoResult<WorkerRole> {
        self.role.get_or_try_init(|| self.elect()).await.copied()
    }

    /// Pids currently registered in the roster directory
    pub async fn roster(&self) -> GfoResult<BTreeSet<u32>> {
        let mut pids = BTreeSet::new();
        let mut entries = fs::read_dir(&self.ipc_dir)
            .await
            .map_err(|e| self.election_error("reading roster", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.election_error("reading roster entry", e))?
        {
            if !entry.file_type().await.is_ok_and(|t| t.is_file()) {
                continue;
            }
            if let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse().ok()) {
                pids.insert(pid);
            }
        }

        Ok(pids)
    }

    async fn elect(&self) -> GfoResult<WorkerRole> {
        if self.worker_count < 2 {
            debug!(pid = self.pid, "Single worker deployment, leading");
            return Ok(WorkerRole::Leader);
        }

        fs::create_dir_all(&self.ipc_dir)
            .await
            .map_err(|e| self.election_error("creating roster directory", e))?;

        debug!(
            pid = self.pid,
            "Expecting {} workers, registering in {}",
            self.worker_count,
            self.ipc_dir.display()
        );

        let started = Instant::now();
        let marker = self.ipc_dir.join(self.pid.to_string());

        let roster = loop {
            if !marker.exists() {
                self.register(&marker).await?;
            }

            if self.prune_stale {
                self.prune_dead_markers().await?;
            }

            let roster = self.roster().await?;
            debug!(pid = self.pid, "Current roster: {:?}", roster);
            if roster.len() == self.worker_count {
                break roster;
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(GfoError::ElectionTimeout {
                        expected: self.worker_count,
                        seen: roster.len(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            tokio::time::sleep(self.backoff()).await;
        };

        let role = elect_leader(self.pid, &roster);
        info!(
            pid = self.pid,
            workers = roster.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Elected as {}",
            role
        );
        Ok(role)
    }

    async fn register(&self, marker: &Path) -> GfoResult<()> {
        debug!(pid = self.pid, "Writing roster marker {}", marker.display());
        fs::write(marker, b"")
            .await
            .map_err(|e| self.election_error("writing roster marker", e))
    }

    /// Remove markers of processes that no longer exist
    async fn prune_dead_markers(&self) -> GfoResult<()> {
        for pid in self.roster().await? {
            if pid == self.pid || process_alive(pid) {
                continue;
            }
            warn!(pid, "Removing roster marker of exited worker");
            match fs::remove_file(self.ipc_dir.join(pid.to_string())).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(self.election_error("removing stale roster marker", e)),
            }
        }
        Ok(())
    }

    fn backoff(&self) -> Duration {
        let max = self.max_backoff.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }

    fn election_error(&self, action: &str, e: std::io::Error) -> GfoError {
        GfoError::ElectionFailure(format!("{} in {}: {}", action, self.ipc_dir.display(), e))
    }
}

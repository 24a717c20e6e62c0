//! Worker command - elect a role and run maintenance when leading

use crate::cli::args::WorkerArgs;
use crate::context::AppContext;
use crate::error::{GfoError, GfoResult};
use crate::ipc::{resolve_worker_count, Coordinator, WorkerRole};
use crate::services::{CacheCleanupService, ServiceManager};
use console::style;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Execute the worker command
pub async fn execute(args: WorkerArgs, ctx: &AppContext) -> GfoResult<()> {
    let worker_count = resolve_worker_count(args.workers)?;
    let coordinator = Coordinator::new(ctx.store.ipc_dir(), worker_count, &ctx.config.election);

    let role = match coordinator.role().await {
        Ok(role) => role,
        Err(e @ GfoError::ElectionTimeout { .. }) => {
            // Lazy expiry keeps the cache correct without a sweeping leader
            error!(pid = coordinator.pid(), "{}; continuing as follower", e);
            WorkerRole::Follower
        }
        Err(e) => return Err(e),
    };

    let shutdown = ShutdownSignal::install()?;

    eprintln!(
        "{} Worker {} running as {}",
        style("✓").green(),
        coordinator.pid(),
        style(role).bold()
    );

    let mut services = ServiceManager::new();
    if role.is_leader() {
        services.register(Arc::new(CacheCleanupService::new(
            Arc::clone(&ctx.store),
            Duration::from_secs(ctx.config.services.cache_cleanup_interval_secs.max(1)),
        )));
        services.start();
    }

    let signal = shutdown.recv().await?;

    info!(pid = coordinator.pid(), signal, "Shutting down");
    services.shutdown().await;
    Ok(())
}

/// Ctrl-C, plus SIGTERM from the process manager on unix
struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Register handlers now so a signal sent before `recv` is not lost
    fn install() -> GfoResult<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .map_err(|e| GfoError::io("installing SIGTERM handler", e))?,
        })
    }

    /// Name of the first signal received
    #[cfg(unix)]
    async fn recv(mut self) -> GfoResult<&'static str> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => result
                .map(|()| "SIGINT")
                .map_err(|e| GfoError::io("waiting for Ctrl-C", e)),
            _ = self.terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    async fn recv(self) -> GfoResult<&'static str> {
        tokio::signal::ctrl_c()
            .await
            .map(|()| "Ctrl-C")
            .map_err(|e| GfoError::io("waiting for Ctrl-C", e))
    }
}

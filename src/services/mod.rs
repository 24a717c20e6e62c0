//! Periodic background services
//!
//! Services run only on the leader worker. Each registered service gets its
//! own task that calls [`Service::run`], logs the outcome, and sleeps for
//! the service interval. A failing or panicking run never stops the loop.

mod cache_cleanup;

pub use cache_cleanup::CacheCleanupService;

use crate::error::GfoResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A periodic maintenance job
#[async_trait]
pub trait Service: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &'static str;

    /// Delay between the end of one run and the start of the next
    fn interval(&self) -> Duration;

    /// Execute one round of work
    async fn run(&self) -> GfoResult<()>;
}

/// Starts, supervises and stops registered services
pub struct ServiceManager {
    services: Vec<Arc<dyn Service>>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            services: Vec::new(),
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Add a service to be started by [`ServiceManager::start`]
    pub fn register(&mut self, service: Arc<dyn Service>) -> &mut Self {
        self.services.push(service);
        self
    }

    /// Number of service loops currently running
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Spawn one loop per registered service
    pub fn start(&mut self) {
        for service in self.services.drain(..) {
            info!(
                service = service.name(),
                "Starting service (interval {}s)",
                service.interval().as_secs()
            );
            let shutdown = self.shutdown.subscribe();
            self.handles.push(tokio::spawn(service_loop(service, shutdown)));
        }
    }

    /// Signal every loop to stop and wait for them to finish
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Service loop ended abnormally: {}", e);
            }
        }
        debug!("All services stopped");
    }
}

async fn service_loop(service: Arc<dyn Service>, mut shutdown: watch::Receiver<bool>) {
    let name = service.name();

    loop {
        let started = Instant::now();
        debug!(service = name, "Starting service execution");

        // A separate task keeps panics inside the run from unwinding this loop
        let job = Arc::clone(&service);
        match tokio::spawn(async move { job.run().await }).await {
            Ok(Ok(())) => debug!(
                service = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Service execution succeeded"
            ),
            Ok(Err(e)) => error!(service = name, "Service execution failed: {}", e),
            Err(e) => error!(service = name, "Service execution panicked: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(service.interval()) => {}
            _ = shutdown.changed() => {
                debug!(service = name, "Service stopping");
                return;
            }
        }
    }
}

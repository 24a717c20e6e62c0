//! Periodic removal of expired cache entries

use crate::cache::CacheStore;
use crate::error::GfoResult;
use crate::services::Service;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct CacheCleanupService {
    store: Arc<CacheStore>,
    interval: Duration,
}

impl CacheCleanupService {
    pub fn new(store: Arc<CacheStore>, interval: Duration) -> Self {
        Self { store, interval }
    }
}

#[async_trait]
impl Service for CacheCleanupService {
    fn name(&self) -> &'static str {
        "cache-cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> GfoResult<()> {
        let removed = self.store.evict_expired().await?;
        debug!(service = self.name(), removed, "Cache sweep finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, ManualClock};
    use crate::services::ServiceManager;
    use chrono::Utc;
    use std::time::Instant;
    use tempfile::TempDir;

    #[tokio::test]
    async fn run_evicts_expired_entries() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(
            CacheStore::open(temp.path().join("fonts"), 60)
                .await
                .unwrap()
                .with_clock(clock.clone()),
        );
        let key = CacheKey::for_source("https://fonts.gstatic.com/a.woff2");
        store.put(&key, b"font").await.unwrap();

        let service = CacheCleanupService::new(store.clone(), Duration::from_secs(60));
        service.run().await.unwrap();
        assert!(store.entry_path(&key).exists());

        clock.advance(chrono::Duration::seconds(3600));
        service.run().await.unwrap();
        assert!(!store.entry_path(&key).exists());
    }

    #[tokio::test]
    async fn scheduled_by_manager() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now() + chrono::Duration::seconds(3600)));
        let store = Arc::new(
            CacheStore::open(temp.path().join("fonts"), 60)
                .await
                .unwrap()
                .with_clock(clock),
        );
        let key = CacheKey::for_source("https://fonts.gstatic.com/a.woff2");
        store.put(&key, b"font").await.unwrap();

        let mut manager = ServiceManager::new();
        manager.register(Arc::new(CacheCleanupService::new(
            store.clone(),
            Duration::from_millis(10),
        )));
        manager.start();

        let deadline = Instant::now() + Duration::from_secs(5);
        while store.entry_path(&key).exists() {
            assert!(Instant::now() < deadline, "entry was never evicted");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        manager.shutdown().await;
    }
}

//! Application context shared by all commands
//!
//! Built once at startup from the loaded configuration and passed by
//! reference to whatever needs the cache, the fetcher or the settings.

use crate::cache::{CacheKey, CacheStore};
use crate::config::Config;
use crate::error::GfoResult;
use crate::fetch::{Fetch, HttpFetcher};
use crate::fonts::{Bundler, Rewriter};
use std::path::PathBuf;
use std::sync::Arc;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<CacheStore>,
    pub fetcher: Arc<dyn Fetch>,
}

impl AppContext {
    /// Open the cache and create the HTTP fetcher.
    ///
    /// Fails with `CacheUnavailable` if the cache directory is unusable.
    pub async fn init(config: Config) -> GfoResult<Self> {
        let store = CacheStore::open(&config.cache.directory, config.cache.ttl_seconds).await?;
        let fetcher = HttpFetcher::new(&config.upstream);

        Ok(Self {
            config,
            store: Arc::new(store),
            fetcher: Arc::new(fetcher),
        })
    }

    /// Replace the fetcher used for upstream requests
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn rewriter(&self) -> Rewriter {
        Rewriter::new(
            Arc::clone(&self.store),
            Arc::clone(&self.fetcher),
            self.config.upstream.clone(),
        )
    }

    pub fn bundler(&self) -> Bundler {
        Bundler::new(Arc::clone(&self.store))
    }

    /// Path of the fresh cached file for a key taken from a font path.
    /// Malformed keys are treated like missing entries.
    pub async fn font_path(&self, key_text: &str) -> GfoResult<Option<PathBuf>> {
        let Some(key) = CacheKey::parse(key_text) else {
            return Ok(None);
        };
        self.store.fresh_path(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::ScriptedFetcher;
    use crate::fonts::{ArchiveFormat, StylesheetRequest};
    use tempfile::TempDir;

    fn config_in(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.cache.directory = temp.path().join("fonts");
        config
    }

    #[tokio::test]
    async fn init_opens_cache() {
        let temp = TempDir::new().unwrap();
        let ctx = AppContext::init(config_in(&temp)).await.unwrap();

        assert!(ctx.store.root().is_dir());
        assert_eq!(ctx.store.ttl().num_seconds(), 3600);
    }

    #[tokio::test]
    async fn font_path_lookup() {
        let temp = TempDir::new().unwrap();
        let ctx = AppContext::init(config_in(&temp)).await.unwrap();
        let key = CacheKey::for_source("https://fonts.gstatic.com/a.woff2");
        ctx.store.put(&key, b"font").await.unwrap();

        assert_eq!(
            ctx.font_path(key.as_str()).await.unwrap(),
            Some(ctx.store.entry_path(&key))
        );
        assert!(ctx.font_path("../../etc/passwd").await.unwrap().is_none());
        assert!(ctx
            .font_path(CacheKey::for_source("other").as_str())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn resolve_then_bundle() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctx = AppContext::init(config_in(&temp))
            .await
            .unwrap()
            .with_fetcher(fetcher.clone());

        let request = StylesheetRequest::css2(vec!["Lato".to_string()], None, None).unwrap();
        let url = request.origin_url(&ctx.config.upstream);
        fetcher.respond(&url, "@font-face { src: url(https://fonts.gstatic.com/l.woff2); }");
        fetcher.respond("https://fonts.gstatic.com/l.woff2", b"lato".to_vec());

        let resolved = ctx.rewriter().resolve(&request).await.unwrap();
        let archive = ctx
            .bundler()
            .bundle(&resolved.text, ArchiveFormat::Zip)
            .await
            .unwrap();

        let zip = zip::ZipArchive::new(archive).unwrap();
        assert_eq!(zip.len(), 2);
    }
}

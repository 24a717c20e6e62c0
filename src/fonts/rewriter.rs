//! Stylesheet resolution and font URL rewriting
//!
//! Resolving a request fetches (or reuses) the origin stylesheet, makes sure
//! every font it references is in the cache, and substitutes each font URL
//! with a `/font/<key>` path. URLs are discovered from `src` declarations
//! only, but each one is replaced wherever it occurs in the text.

use crate::cache::{CacheKey, CacheStore};
use crate::config::UpstreamConfig;
use crate::error::{GfoError, GfoResult};
use crate::fetch::Fetch;
use crate::fonts::request::StylesheetRequest;
use crate::fonts::scanner::{font_sources, replace_all};
use crate::fonts::FONT_PATH_PREFIX;
use futures_util::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A stylesheet whose font URLs point into the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenStylesheet {
    /// Rewritten stylesheet text
    pub text: String,
    /// Distinct font keys referenced by `text`, sorted
    pub fonts: Vec<CacheKey>,
}

/// Local path under which a cached font is served
pub fn font_path(key: &CacheKey) -> String {
    format!("{}{}", FONT_PATH_PREFIX, key)
}

/// Resolves stylesheet requests against the cache and upstream
#[derive(Clone)]
pub struct Rewriter {
    store: Arc<CacheStore>,
    fetcher: Arc<dyn Fetch>,
    upstream: UpstreamConfig,
}

impl Rewriter {
    pub fn new(store: Arc<CacheStore>, fetcher: Arc<dyn Fetch>, upstream: UpstreamConfig) -> Self {
        Self {
            store,
            fetcher,
            upstream,
        }
    }

    /// Resolve `request` into a rewritten stylesheet, caching the stylesheet
    /// and every font it references
    pub async fn resolve(&self, request: &StylesheetRequest) -> GfoResult<RewrittenStylesheet> {
        let started = Instant::now();
        let url = request.origin_url(&self.upstream);
        let raw = self.load(&url).await?;

        let css = String::from_utf8(raw)
            .map_err(|_| GfoError::upstream(&url, "stylesheet is not valid UTF-8"))?;

        let refs = font_sources(&css);
        if refs.is_empty() {
            debug!(url = %url, "Stylesheet has no font references");
            return Ok(RewrittenStylesheet {
                text: css,
                fonts: Vec::new(),
            });
        }

        let distinct: BTreeMap<&str, CacheKey> = refs
            .iter()
            .map(|r| (r.value.as_str(), CacheKey::for_source(&r.value)))
            .collect();

        try_join_all(
            distinct
                .iter()
                .map(|(font_url, key)| self.ensure(font_url, key)),
        )
        .await?;

        let replacements: Vec<(&str, String)> = distinct
            .iter()
            .map(|(font_url, key)| (*font_url, font_path(key)))
            .collect();
        let text = replace_all(&css, &replacements);

        let mut fonts: Vec<CacheKey> = distinct.into_values().collect();
        fonts.sort();
        fonts.dedup();

        info!(
            url = %url,
            fonts = fonts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resolved stylesheet"
        );

        Ok(RewrittenStylesheet { text, fonts })
    }

    /// Cached bytes for `url`, fetching and committing them on a miss
    async fn load(&self, url: &str) -> GfoResult<Vec<u8>> {
        let key = CacheKey::for_source(url);
        if let Some(bytes) = self.store.get(&key).await? {
            return Ok(bytes);
        }

        debug!(key = %key, url, "Cache miss");
        let bytes = self.fetcher.fetch(url).await?;
        self.store.put(&key, &bytes).await?;
        Ok(bytes)
    }

    /// Make sure a fresh copy of the font at `url` is cached under `key`
    async fn ensure(&self, url: &str, key: &CacheKey) -> GfoResult<()> {
        if self.store.is_fresh(key).await? {
            debug!(key = %key, "Font already cached");
            return Ok(());
        }

        debug!(key = %key, url, "Downloading font");
        let bytes = self.fetcher.fetch(url).await?;
        self.store.put(key, &bytes).await
    }
}

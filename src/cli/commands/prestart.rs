//! Prestart command - prepare the shared cache before workers start

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::GfoResult;
use console::style;

/// Execute the prestart command.
///
/// Wipes the cache directory, so it must run before any worker is up.
pub async fn execute(config: &Config) -> GfoResult<()> {
    CacheStore::reset(&config.cache.directory).await?;

    eprintln!(
        "{} Cache directory {} is ready",
        style("✓").green(),
        config.cache.directory.display()
    );
    Ok(())
}

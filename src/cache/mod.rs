//! Content-addressed font cache
//!
//! Stylesheets and font files are cached under keys derived from their
//! source URL and shared by every worker process on the host.
//!
//! # Directory Layout
//!
//! | Path | Owner | Description |
//! |------|-------|-------------|
//! | `<root>/<key>` | all workers | Cached stylesheet or font file |
//! | `<root>/stage-<random>` | one process | Staging area for writes in flight |
//! | `<root>/.ipc/<pid>` | one worker each | Roster marker for leader election |
//!
//! # Freshness
//!
//! An entry is fresh while `now - mtime <= ttl`. Stale entries are removed
//! lazily on read and periodically by the cache cleanup service.

pub mod key;
pub mod store;

pub use key::{CacheKey, KEY_HEX_LEN};
pub use store::{
    format_bytes, CacheStats, CacheStore, Clock, ManualClock, SystemClock, IPC_DIR_NAME,
};

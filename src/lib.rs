//! gfo - caching download proxy for web fonts
//!
//! Fetches font stylesheets from the upstream API, rewrites their font URLs
//! to cache keys, keeps the referenced font files in a cache shared by all
//! worker processes on the host, and bundles stylesheets with their fonts
//! into archives. One elected worker runs periodic cache maintenance.

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod fonts;
pub mod ipc;
pub mod logging;
pub mod services;

pub use context::AppContext;
pub use error::{GfoError, GfoResult};

//! Font stylesheet handling
//!
//! - [`request`]: origin request shapes and URL construction
//! - [`scanner`]: locating font URLs inside `@font-face` blocks
//! - [`rewriter`]: resolving a request into a stylesheet served from the cache
//! - [`bundle`]: packing a rewritten stylesheet with its fonts

pub mod bundle;
pub mod request;
pub mod rewriter;
pub mod scanner;

pub use bundle::{ArchiveFormat, Bundler, STYLESHEET_NAME};
pub use request::{ApiVersion, StylesheetRequest};
pub use rewriter::{font_path, RewrittenStylesheet, Rewriter};
pub use scanner::{font_sources, replace_all, replace_spans, UrlRef};

/// Path prefix under which cached fonts are referenced in rewritten stylesheets
pub const FONT_PATH_PREFIX: &str = "/font/";

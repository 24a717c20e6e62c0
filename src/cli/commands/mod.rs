//! CLI command implementations

pub mod cache;
pub mod config;
pub mod css;
pub mod font;
pub mod prestart;
pub mod worker;

pub use cache::execute as cache;
pub use config::execute as config;
pub use css::{css, css2};
pub use font::execute as font;
pub use prestart::execute as prestart;
pub use worker::execute as worker;

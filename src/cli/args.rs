//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// gfo - caching proxy for web-font stylesheets
///
/// Fetches font stylesheets, serves their font files from a shared local
/// cache and bundles both into self-contained archives.
#[derive(Parser, Debug)]
#[command(name = "gfo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GFO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a stylesheet through the legacy css API
    Css(CssArgs),

    /// Resolve a stylesheet through the css2 API
    Css2(Css2Args),

    /// Look up a cached font file by key
    Font(FontArgs),

    /// Inspect or maintain the font cache
    Cache(CacheArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Reset the cache directory before workers start
    Prestart,

    /// Run as one of several sibling workers
    Worker(WorkerArgs),
}

/// Where a resolved stylesheet goes
#[derive(Args, Debug, Default)]
pub struct OutputArgs {
    /// Write the rewritten stylesheet to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write a zip archive of the stylesheet and its fonts
    #[arg(short, long)]
    pub bundle: Option<PathBuf>,
}

/// Arguments for the css command
#[derive(Parser, Debug)]
pub struct CssArgs {
    /// Family specification (e.g. "Roboto:400,700|Open Sans")
    #[arg(short, long, required = true)]
    pub family: Vec<String>,

    /// font-display value (e.g. swap)
    #[arg(long)]
    pub display: Option<String>,

    /// Only include glyphs for this text
    #[arg(long)]
    pub text: Option<String>,

    /// Character subset (e.g. latin,cyrillic)
    #[arg(long)]
    pub subset: Option<String>,

    #[command(flatten)]
    pub out: OutputArgs,
}

/// Arguments for the css2 command
#[derive(Parser, Debug)]
pub struct Css2Args {
    /// Family with axes (e.g. "Roboto:wght@400;700"); repeat for more
    #[arg(short, long, required = true)]
    pub family: Vec<String>,

    /// font-display value (e.g. swap)
    #[arg(long)]
    pub display: Option<String>,

    /// Only include glyphs for this text
    #[arg(long)]
    pub text: Option<String>,

    #[command(flatten)]
    pub out: OutputArgs,
}

/// Arguments for the font command
#[derive(Parser, Debug)]
pub struct FontArgs {
    /// Cache key (last segment of a /font/ path)
    pub key: String,

    /// Copy the font to this file instead of printing its location
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the worker command
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Number of sibling workers started by the process manager
    #[arg(short, long, env = "GFO_WORKERS")]
    pub workers: Option<usize>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Print a single value
    Get {
        /// Configuration key (e.g., cache.ttl_seconds)
        key: String,
    },
}

/// Output format for cache stats
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show entry counts and sizes
    Stats {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove expired entries now
    Gc,

    /// Remove every cached entry
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

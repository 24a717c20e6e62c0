//! Cache command - inspect and maintain the font cache

use crate::cache::{format_bytes, CacheStats};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::context::AppContext;
use crate::error::GfoResult;
use console::style;
use std::io::{self, Write};

/// Execute the cache command
pub async fn execute(args: CacheArgs, ctx: &AppContext) -> GfoResult<()> {
    match args.action {
        CacheAction::Stats { format } => show_stats(ctx, format).await,
        CacheAction::Gc => gc(ctx).await,
        CacheAction::Clear { yes } => clear(ctx, yes).await,
    }
}

async fn show_stats(ctx: &AppContext, format: OutputFormat) -> GfoResult<()> {
    let stats = ctx.store.stats().await?;

    match format {
        OutputFormat::Table => print_stats_table(ctx, &stats),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": ctx.store.root().display().to_string(),
                "ttl_seconds": ctx.store.ttl().num_seconds(),
                "entries": stats.entries,
                "fresh": stats.fresh,
                "expired": stats.expired,
                "total_bytes": stats.total_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

fn print_stats_table(ctx: &AppContext, stats: &CacheStats) {
    println!("{:<12} {}", "DIRECTORY", ctx.store.root().display());
    println!("{:<12} {}s", "TTL", ctx.store.ttl().num_seconds());
    println!("{}", "-".repeat(40));
    println!("{:<12} {}", "ENTRIES", stats.entries);
    println!("{:<12} {}", "FRESH", style(stats.fresh).green());
    println!("{:<12} {}", "EXPIRED", style(stats.expired).yellow());
    println!("{:<12} {}", "SIZE", format_bytes(stats.total_bytes));
}

async fn gc(ctx: &AppContext) -> GfoResult<()> {
    let removed = ctx.store.evict_expired().await?;
    println!("{} removed {} expired entr(ies)", style("✓").green(), removed);
    Ok(())
}

async fn clear(ctx: &AppContext, skip_confirm: bool) -> GfoResult<()> {
    let stats = ctx.store.stats().await?;

    if stats.entries == 0 {
        println!("Cache is already empty.");
        return Ok(());
    }

    println!(
        "This will remove {} cached file(s) ({}) from {}",
        stats.entries,
        format_bytes(stats.total_bytes),
        ctx.store.root().display()
    );

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = ctx.store.clear().await?;
    println!("{} cleared {} entr(ies)", style("✓").green(), removed);

    Ok(())
}

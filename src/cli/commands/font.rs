//! Font command - resolve a cache key to its font file

use crate::cli::args::FontArgs;
use crate::context::AppContext;
use crate::error::{GfoError, GfoResult};
use console::style;
use tokio::fs;

/// Execute the font command
pub async fn execute(args: FontArgs, ctx: &AppContext) -> GfoResult<()> {
    let Some(path) = ctx.font_path(&args.key).await? else {
        return Err(GfoError::FontNotFound(args.key));
    };

    match args.output {
        Some(target) => {
            let bytes = fs::copy(&path, &target)
                .await
                .map_err(|e| GfoError::io(format!("copying font to {}", target.display()), e))?;
            eprintln!(
                "{} Wrote {} bytes to {}",
                style("✓").green(),
                bytes,
                target.display()
            );
        }
        None => println!("{}", path.display()),
    }

    Ok(())
}

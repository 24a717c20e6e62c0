//! Css commands - resolve a stylesheet and optionally bundle it

use crate::cli::args::{Css2Args, CssArgs, OutputArgs};
use crate::context::AppContext;
use crate::error::{GfoError, GfoResult};
use crate::fonts::{ArchiveFormat, StylesheetRequest};
use console::style;
use std::path::Path;
use tokio::fs;

/// Execute the css command (legacy API)
pub async fn css(args: CssArgs, ctx: &AppContext) -> GfoResult<()> {
    let request = StylesheetRequest::css(args.family.join("|"), args.display, args.text, args.subset)?;
    resolve_and_write(ctx, &request, args.out).await
}

/// Execute the css2 command
pub async fn css2(args: Css2Args, ctx: &AppContext) -> GfoResult<()> {
    let request = StylesheetRequest::css2(args.family, args.display, args.text)?;
    resolve_and_write(ctx, &request, args.out).await
}

async fn resolve_and_write(
    ctx: &AppContext,
    request: &StylesheetRequest,
    out: OutputArgs,
) -> GfoResult<()> {
    // Validate the archive target before doing any network work
    let bundle = out
        .bundle
        .map(|path| archive_format_for(&path).map(|format| (path, format)))
        .transpose()?;

    let resolved = ctx.rewriter().resolve(request).await?;

    match out.output {
        Some(ref path) => {
            fs::write(path, resolved.text.as_bytes())
                .await
                .map_err(|e| GfoError::io(format!("writing {}", path.display()), e))?;
            eprintln!(
                "{} Stylesheet with {} font(s) written to {}",
                style("✓").green(),
                resolved.fonts.len(),
                path.display()
            );
        }
        None => print!("{}", resolved.text),
    }

    if let Some((path, format)) = bundle {
        let archive = ctx.bundler().bundle(&resolved.text, format).await?;
        fs::write(&path, archive.into_inner())
            .await
            .map_err(|e| GfoError::io(format!("writing {}", path.display()), e))?;
        eprintln!(
            "{} Bundle written to {}",
            style("✓").green(),
            path.display()
        );
    }

    Ok(())
}

/// Archive format from the file extension, zip when there is none
fn archive_format_for(path: &Path) -> GfoResult<ArchiveFormat> {
    match path.extension() {
        None => Ok(ArchiveFormat::Zip),
        Some(ext) => ext.to_string_lossy().parse(),
    }
}

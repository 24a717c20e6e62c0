//! Archive bundling of a rewritten stylesheet and its fonts
//!
//! The bundle is assembled in a scoped temporary directory: the stylesheet
//! as `fonts.css` with its font references made relative, plus one file per
//! referenced font named by its cache key. The directory is packed into an
//! in-memory archive and removed before returning.

use crate::cache::{CacheKey, CacheStore};
use crate::error::{GfoError, GfoResult};
use crate::fonts::scanner::{font_sources, replace_spans};
use crate::fonts::FONT_PATH_PREFIX;
use std::fmt;
use std::io::{Cursor, ErrorKind, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

/// File name of the stylesheet inside a bundle
pub const STYLESHEET_NAME: &str = "fonts.css";

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    #[default]
    Zip,
}

impl ArchiveFormat {
    /// File extension for archives of this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = GfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            _ => Err(GfoError::UnsupportedArchiveFormat(s.to_string())),
        }
    }
}

/// Font keys referenced by a rewritten stylesheet, with the stylesheet text
/// rewritten to point at archive-relative files
fn relativize(stylesheet: &str) -> (String, Vec<CacheKey>) {
    let mut keys = Vec::new();
    let mut replacements = Vec::new();

    for r in font_sources(stylesheet) {
        let Some(key) = r
            .value
            .strip_prefix(FONT_PATH_PREFIX)
            .and_then(CacheKey::parse)
        else {
            continue;
        };
        replacements.push((r.span, format!("./{}", key)));
        keys.push(key);
    }

    keys.sort();
    keys.dedup();
    (replace_spans(stylesheet, &replacements), keys)
}

/// Packs rewritten stylesheets and their cached fonts into archives
#[derive(Clone)]
pub struct Bundler {
    store: Arc<CacheStore>,
}

impl Bundler {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Build an archive holding `stylesheet` and every font it references.
    ///
    /// The returned cursor is positioned at the start of the archive.
    pub async fn bundle(
        &self,
        stylesheet: &str,
        format: ArchiveFormat,
    ) -> GfoResult<Cursor<Vec<u8>>> {
        let (text, keys) = relativize(stylesheet);

        let workdir = tempfile::Builder::new()
            .prefix("gfo-bundle-")
            .tempdir()
            .map_err(|e| GfoError::io("creating bundle directory", e))?;

        tokio::fs::write(workdir.path().join(STYLESHEET_NAME), text.as_bytes())
            .await
            .map_err(|e| GfoError::io("writing bundled stylesheet", e))?;

        for key in &keys {
            let target = workdir.path().join(key.as_str());
            match tokio::fs::copy(self.store.entry_path(key), &target).await {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(GfoError::Bundling(format!(
                        "font {} is not in the cache",
                        key
                    )));
                }
                Err(e) => return Err(GfoError::io(format!("copying font {}", key), e)),
            }
        }

        let archive = tokio::task::spawn_blocking(move || pack(workdir, &keys, format))
            .await
            .map_err(|e| GfoError::Internal(format!("bundle task failed: {}", e)))??;

        debug!("Bundled stylesheet into {} byte {} archive", archive.get_ref().len(), format);
        Ok(archive)
    }
}

/// Pack the prepared directory, consuming (and thereby deleting) it
fn pack(workdir: TempDir, keys: &[CacheKey], format: ArchiveFormat) -> GfoResult<Cursor<Vec<u8>>> {
    let bytes = match format {
        ArchiveFormat::Zip => write_zip(workdir.path(), keys)?,
    };

    workdir
        .close()
        .map_err(|e| GfoError::io("removing bundle directory", e))?;

    Ok(Cursor::new(bytes))
}

fn write_zip(dir: &Path, keys: &[CacheKey]) -> GfoResult<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let names = std::iter::once(STYLESHEET_NAME).chain(keys.iter().map(CacheKey::as_str));
    for name in names {
        let contents = std::fs::read(dir.join(name))
            .map_err(|e| GfoError::io(format!("reading bundled file {}", name), e))?;
        zip.start_file(name, options)
            .map_err(|e| GfoError::Bundling(e.to_string()))?;
        zip.write_all(&contents)
            .map_err(|e| GfoError::io(format!("compressing {}", name), e))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| GfoError::Bundling(e.to_string()))?;
    Ok(cursor.into_inner())
}

//! Tracing subscriber setup
//!
//! Events go to stderr in text or JSON form. When `log.file` is set they are
//! also appended as JSON lines to that file, which may be shared by every
//! worker on the host: each event is written under an exclusive advisory
//! lock so lines from different processes never interleave.

use crate::config::{LogConfig, LogFormat};
use crate::error::{GfoError, GfoResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Filter directive for the crate: `-v` = debug, `-vv` = trace, otherwise
/// the configured level
pub fn filter_directive(level: &str, verbosity: u8) -> String {
    let level = match verbosity {
        0 => level,
        1 => "debug",
        _ => "trace",
    };
    format!("gfo={}", level)
}

/// Install the global subscriber. `RUST_LOG` takes precedence when set.
pub fn init(config: &LogConfig, verbosity: u8) -> GfoResult<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(filter_directive(&config.level, verbosity)),
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let stderr = fmt::layer().with_writer(io::stderr).with_target(false);
    layers.push(match config.format {
        LogFormat::Text => stderr.boxed(),
        LogFormat::Json => stderr.json().boxed(),
    });

    if let Some(ref path) = config.file {
        let file = LockedLogFile::open(path)?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| GfoError::Internal(format!("installing log subscriber: {}", e)))
}

/// Append-only log file guarded by an exclusive lock per event
#[derive(Debug, Clone)]
pub struct LockedLogFile {
    file: Arc<Mutex<File>>,
}

impl LockedLogFile {
    pub fn open(path: &Path) -> GfoResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                GfoError::io(format!("creating log directory {}", parent.display()), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| GfoError::io(format!("opening log file {}", path.display()), e))?;

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl<'a> MakeWriter<'a> for LockedLogFile {
    type Writer = LockedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LockedWriter {
            file: Arc::clone(&self.file),
            buf: Vec::new(),
        }
    }
}

/// Buffers one event and appends it under the file lock when dropped
pub struct LockedWriter {
    file: Arc<Mutex<File>>,
    buf: Vec<u8>,
}

impl LockedWriter {
    fn commit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }

        // The mutex excludes threads of this process, the file lock other processes
        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        file.lock_exclusive()?;
        let result = file.write_all(&self.buf).and_then(|()| file.flush());
        let unlocked = FileExt::unlock(&*file);
        self.buf.clear();
        result.and(unlocked)
    }
}

impl Write for LockedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl Drop for LockedWriter {
    fn drop(&mut self) {
        let _ = self.commit();
    }
}

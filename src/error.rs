//! Error types for gfo
//!
//! All modules use `GfoResult<T>` as their return type. The binary maps
//! errors to a status class and a public message at a single place in
//! `main`; the full error only goes to the log.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gfo operations
pub type GfoResult<T> = Result<T, GfoError>;

/// All errors that can occur in gfo
#[derive(Error, Debug)]
pub enum GfoError {
    // Upstream errors
    #[error("Upstream rejected request to {url} as malformed (HTTP {status})")]
    UpstreamBadRequest { url: String, status: u16 },

    #[error("Failed to fetch {url}: {reason}")]
    Upstream { url: String, reason: String },

    #[error("Invalid stylesheet request: {0}")]
    InvalidRequest(String),

    // Cache errors
    #[error("Cache directory {path} is unusable: {source}")]
    CacheUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Font not found: {0}")]
    FontNotFound(String),

    // Bundling errors
    #[error("Failed to bundle stylesheet: {0}")]
    Bundling(String),

    #[error("Unsupported archive format: {0}")]
    UnsupportedArchiveFormat(String),

    // Election errors
    #[error("Leader election failed: {0}")]
    ElectionFailure(String),

    #[error("Leader election timed out after {waited_secs}s: saw {seen} of {expected} workers")]
    ElectionTimeout {
        expected: usize,
        seen: usize,
        waited_secs: u64,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GfoError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an upstream fetch error
    pub fn upstream(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Upstream {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// HTTP-equivalent status class of this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UpstreamBadRequest { .. }
            | Self::InvalidRequest(_)
            | Self::UnsupportedArchiveFormat(_) => 400,
            Self::FontNotFound(_) => 404,
            _ => 500,
        }
    }

    /// Whether the caller is at fault (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Whether the process must not keep serving after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CacheUnavailable { .. } | Self::ElectionFailure(_)
        )
    }

    /// User-facing message without internal detail
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::UpstreamBadRequest { .. } => {
                "The font API responded with HTTP 400 to your request - please check your parameters."
            }
            Self::InvalidRequest(_) => "The stylesheet request is missing or has invalid parameters.",
            Self::UnsupportedArchiveFormat(_) => "The requested archive format is not supported.",
            Self::FontNotFound(_) => "The requested resource was not found.",
            _ => "An internal error occurred while processing your request.",
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheUnavailable { .. } => {
                Some("Check that cache.directory is writable, or run: gfo prestart")
            }
            Self::ElectionFailure(_) => Some("Pass the worker count: gfo worker --workers <N>"),
            Self::ConfigNotFound(_) => Some("Run: gfo config init"),
            Self::UnsupportedArchiveFormat(_) => Some("Supported formats: zip"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GfoError::UpstreamBadRequest {
            url: "https://fonts.example/css".to_string(),
            status: 400,
        };
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[test]
    fn status_classes() {
        assert_eq!(
            GfoError::InvalidRequest("no family".to_string()).status_code(),
            400
        );
        assert_eq!(GfoError::FontNotFound("abc".to_string()).status_code(), 404);
        assert_eq!(GfoError::upstream("u", "timeout").status_code(), 500);
        assert_eq!(GfoError::Bundling("missing".to_string()).status_code(), 500);
    }

    #[test]
    fn public_message_hides_detail() {
        let err = GfoError::upstream("https://secret.example/font.ttf", "connection reset");
        assert!(!err.public_message().contains("secret.example"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn fatal_errors() {
        assert!(GfoError::ElectionFailure("no worker count".to_string()).is_fatal());
        assert!(!GfoError::Bundling("x".to_string()).is_fatal());
    }

    #[test]
    fn error_hint() {
        let err = GfoError::ElectionFailure("x".to_string());
        assert_eq!(
            err.hint(),
            Some("Pass the worker count: gfo worker --workers <N>")
        );
    }
}

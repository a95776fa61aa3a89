//! Error types for bundle loading and saving

use std::path::{Path, PathBuf};

/// Fatal errors raised while opening, materializing or saving a bundle.
///
/// Recoverable conditions (one unreadable asset, one animation of an unknown
/// type, a sublayer without an id) never surface here; they are recorded in
/// [`crate::Diagnostics`] instead.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum CamlError {
    /// The bundle path exists but is not a directory
    #[error("Not a bundle directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    /// Bundle directory, index file or root document is missing
    #[error("Not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Index file parsed but does not describe a usable bundle
    #[error("Malformed index {}: {reason}", .path.display())]
    MalformedIndex { path: PathBuf, reason: String },

    /// Root document could not be parsed, even after repair
    #[error("{}", describe_parse_failure(.file, .original, .repair.as_deref()))]
    ParseError {
        file: PathBuf,
        original: String,
        repair: Option<String>,
    },

    /// A node was constructed from a missing or unsuitable element
    #[error("Invalid element: {reason}")]
    InvalidElement { reason: String },

    /// Read or write failure
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Property list encode/decode failure
    #[error("Property list error on {}: {source}", .path.display())]
    Plist {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },
}

pub type Result<T> = std::result::Result<T, CamlError>;

fn describe_parse_failure(file: &Path, original: &str, repair: Option<&str>) -> String {
    match repair {
        Some(repair) => format!(
            "XML parsing error in {}: {original}. Repair attempt failed with: {repair}",
            file.display()
        ),
        None => format!("XML parsing error in {}: {original}", file.display()),
    }
}

impl CamlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_element(reason: impl Into<String>) -> Self {
        Self::InvalidElement {
            reason: reason.into(),
        }
    }

    /// Error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotADirectory { .. } | Self::NotFound { .. } => "lookup",
            Self::MalformedIndex { .. } | Self::Plist { .. } => "index",
            Self::ParseError { .. } => "parse",
            Self::InvalidElement { .. } => "model",
            Self::Io { .. } => "io",
        }
    }

    /// Path of the file or directory the error refers to, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotADirectory { path }
            | Self::NotFound { path }
            | Self::MalformedIndex { path, .. }
            | Self::Io { path, .. }
            | Self::Plist { path, .. } => Some(path),
            Self::ParseError { file, .. } => Some(file),
            Self::InvalidElement { .. } => None,
        }
    }
}

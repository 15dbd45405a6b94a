//! Error types for proxy requests.

use std::io;
use std::path::PathBuf;

/// Errors that end a single proxy request.
///
/// None of these are retried; the router reports every one of them to the
/// client as `404 Not Found` with the error text as the body.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The request path is not a valid module proxy path.
    #[error("parsing path {path}: {reason}")]
    MalformedPath { path: String, reason: String },

    /// The backing archive (or the store directory) could not be opened.
    #[error("open {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backing archive exists but is not a well-formed txtar file.
    #[error("corrupt archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    /// Writing the zip stream failed.
    #[error("packaging zip: {0}")]
    Packaging(#[from] io::Error),

    /// The `.info` body could not be encoded.
    #[error("encoding info: {0}")]
    Encode(#[from] serde_json::Error),

    /// `@latest` queries need a version selection policy this server lacks.
    #[error("latest version resolution is not supported")]
    LatestUnsupported,
}

impl ProxyError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        ProxyError::MalformedPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = ProxyError> = std::result::Result<T, E>;

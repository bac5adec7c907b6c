use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SpotError {
    #[error("SPOT authentication failed: {0}")]
    #[diagnostic(help("check the username and password, or set SPOT_USERNAME/SPOT_PASSWORD"))]
    Auth(String),

    #[error("SPOT session is not authenticated")]
    NotAuthenticated,

    #[error("SPOT session is closed")]
    SessionClosed,

    #[error("SPOT returned status {status} for {url}: {message}")]
    RemoteStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("malformed SPOT response from {url}: {message}")]
    RemoteDecode { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("filesystem error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to read list file {path}: {message}")]
    Format { path: String, message: String },

    #[error("no derived dataset of kind `{kind}` for {dataset}")]
    DerivedNotFound { dataset: String, kind: String },

    #[error("image index {index} out of range for {dataset} ({count} images)")]
    ImageIndexOutOfRange {
        dataset: String,
        index: usize,
        count: usize,
    },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to obtain credentials: {0}")]
    Credentials(String),
}

impl SpotError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        SpotError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Error types shared by the viewer core and its hosts
use thiserror::Error;

/// Errors raised while configuring, loading or driving a viewer.
///
/// None of these reach the host page as a panic: the widget logs them and
/// degrades to "scene not fully rendered" or "hit-test is a no-op".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// The container element could not be found in the document
    #[error("no container element found: {0}")]
    MissingContainer(String),

    /// The host failed to create a render surface
    #[error("render surface error: {0}")]
    Surface(String),

    /// The model asset could not be fetched
    #[error("asset fetch failed for {path}: {reason}")]
    Asset { path: String, reason: String },

    /// The model asset was fetched but could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid viewer configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid hotspot definition
    #[error("invalid hit target '{name}': {reason}")]
    HitTarget { name: String, reason: String },
}

impl ViewerError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn asset(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Asset {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result alias used across the core crate
pub type Result<T> = std::result::Result<T, ViewerError>;

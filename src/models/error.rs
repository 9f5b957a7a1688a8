use thiserror::Error;

/// Errors raised while resolving, downloading or loading a model.
///
/// `Clone` because a single coalesced load hands its outcome to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("model download cancelled")]
    Cancelled,

    #[error("download failed: {0}")]
    Download(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("model runtime error: {0}")]
    Runtime(String),
}

impl ModelError {
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        Self::Download(err.to_string())
    }
}

use std::path::PathBuf;

use supfeed_normalize::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("UTC offset of {0} hours is out of range")]
    InvalidOffset(i32),

    #[error("no feeds to merge")]
    NoInputs,
}

impl FeedError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

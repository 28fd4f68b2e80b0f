//! Task-level errors.

use tracing::{error, info, warn};

use crate::stream::StreamError;

/// Why a session task stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The stream consumer failed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// A live stream ran out of events.
    #[error("stream ended")]
    StreamEnded,
}

impl TaskError {
    /// Log the error at the level its class calls for.
    pub fn log(&self, session: &str, task: &str) {
        match self {
            Self::Stream(StreamError::Cancelled) => {
                info!(session, task, "Stream closed by cancellation");
            }
            Self::Stream(err) if err.is_transport() => {
                warn!(session, task, error = %err, "Stream transport failure");
            }
            Self::StreamEnded => {
                warn!(session, task, error = %self, "Stream ended");
            }
            Self::Stream(err) => {
                error!(session, task, error = %err, "Unexpected stream failure");
            }
        }
    }
}

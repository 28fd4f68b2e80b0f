//! The read-side contract to a live session.
//!
//! A [`StreamConsumer`] yields typed change events and answers snapshot
//! queries. A [`Connector`] produces a fresh consumer for every connection
//! cycle of the supervisor.

use std::sync::Arc;

use async_trait::async_trait;
use dcscribe_types::{Airbase, MarkPanel, MarkPanelEvent, UnitEvent};
use futures::stream::BoxStream;

/// A live, possibly endless, sequence of events.
pub type EventStream<T> = BoxStream<'static, Result<T, StreamError>>;

/// Errors raised by a [`StreamConsumer`] or [`Connector`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The caller's own cancellation closed the stream.
    #[error("stream cancelled")]
    Cancelled,

    /// The connection or RPC layer failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A message could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Whether the error comes from the connection layer.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Streaming and snapshot access to one live session.
#[async_trait]
pub trait StreamConsumer: Send + Sync {
    /// Open the unit stream, hinting the desired poll rate.
    async fn stream_units(&self, poll_rate: u32) -> Result<EventStream<UnitEvent>, StreamError>;

    /// Open the mark panel stream.
    async fn stream_markpanels(&self) -> Result<EventStream<MarkPanelEvent>, StreamError>;

    /// Current airbases.
    async fn airbases(&self) -> Result<Vec<Airbase>, StreamError>;

    /// Current mark panels.
    async fn markpanels(&self) -> Result<Vec<MarkPanel>, StreamError>;
}

/// Opens a [`StreamConsumer`] for one connection cycle.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the live session.
    async fn connect(&self) -> Result<Arc<dyn StreamConsumer>, StreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_transport() {
        assert!(StreamError::Transport("reset".into()).is_transport());
        assert!(!StreamError::Cancelled.is_transport());
        assert!(!StreamError::Decode("bad".into()).is_transport());
        assert!(!StreamError::Other("boom".into()).is_transport());
    }
}

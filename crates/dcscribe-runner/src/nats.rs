//! NATS-backed [`StreamConsumer`] for a live game server.
//!
//! Subjects, relative to the session's prefix:
//!
//! - `{prefix}.units` -- `UnitUpdate` stream
//! - `{prefix}.units.poll_rate` -- poll-rate hint, published once per stream
//! - `{prefix}.markpanels` -- `MarkPanelUpdate` stream
//! - `{prefix}.airbases.get` / `{prefix}.markpanels.get` -- snapshot requests

use std::sync::Arc;

use async_trait::async_trait;
use dcscribe_core::config::SessionConfig;
use dcscribe_core::{Connector, EventStream, StreamConsumer, StreamError};
use dcscribe_types::{Airbase, MarkPanel, MarkPanelEvent, UnitEvent};
use futures::StreamExt;
use futures::stream;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::wire::{MarkPanelUpdate, UnitUpdate, WireAirbase, WireMarkPanel};

/// Opens a fresh NATS connection for every supervisor cycle.
#[derive(Debug, Clone)]
pub struct NatsConnector {
    session: Arc<str>,
    url: String,
    prefix: String,
}

impl NatsConnector {
    /// Connector for one configured session.
    pub fn new(session: &SessionConfig) -> Self {
        Self {
            session: Arc::from(session.short_name.as_str()),
            url: session.rpc.url(),
            prefix: session.rpc.subject_prefix(&session.short_name),
        }
    }
}

#[async_trait]
impl Connector for NatsConnector {
    async fn connect(&self) -> Result<Arc<dyn StreamConsumer>, StreamError> {
        info!(session = %self.session, url = %self.url, "Connecting to NATS server");
        let client = async_nats::connect(self.url.as_str()).await.map_err(|e| {
            StreamError::Transport(format!("failed to connect to {}: {e}", self.url))
        })?;
        info!(session = %self.session, "NATS connection established");
        Ok(Arc::new(NatsConsumer {
            session: Arc::clone(&self.session),
            client,
            prefix: self.prefix.clone(),
        }))
    }
}

/// One live connection to a game server.
pub struct NatsConsumer {
    session: Arc<str>,
    client: async_nats::Client,
    prefix: String,
}

impl NatsConsumer {
    fn subject(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.prefix)
    }

    async fn subscribe<W, T>(&self, suffix: &str) -> Result<EventStream<T>, StreamError>
    where
        W: DeserializeOwned + Into<T> + 'static,
        T: Send + 'static,
    {
        let subject = self.subject(suffix);
        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| StreamError::Transport(format!("failed to subscribe to {subject}: {e}")))?;
        debug!(session = %self.session, subject = %subject, "Subscribed");

        let session = Arc::clone(&self.session);
        let closed = subject.clone();
        let events = subscriber
            .filter_map(move |message| {
                let decoded = match serde_json::from_slice::<W>(&message.payload) {
                    Ok(update) => Some(Ok::<T, StreamError>(update.into())),
                    Err(e) => {
                        warn!(
                            session = %session,
                            subject = %message.subject,
                            error = %e,
                            "Unexpected update case, skipping"
                        );
                        None
                    }
                };
                std::future::ready(decoded)
            })
            .chain(stream::once(async move {
                Err(StreamError::Transport(format!("subscription to {closed} closed")))
            }));
        Ok(events.boxed())
    }

    async fn request<W>(&self, suffix: &str) -> Result<Vec<W>, StreamError>
    where
        W: DeserializeOwned,
    {
        let subject = self.subject(suffix);
        let reply = self
            .client
            .request(subject.clone(), Vec::<u8>::new().into())
            .await
            .map_err(|e| StreamError::Transport(format!("request to {subject} failed: {e}")))?;
        serde_json::from_slice(&reply.payload)
            .map_err(|e| StreamError::Decode(format!("invalid reply on {subject}: {e}")))
    }
}

#[async_trait]
impl StreamConsumer for NatsConsumer {
    async fn stream_units(&self, poll_rate: u32) -> Result<EventStream<UnitEvent>, StreamError> {
        let events = self.subscribe::<UnitUpdate, UnitEvent>("units").await?;
        let subject = self.subject("units.poll_rate");
        self.client
            .publish(subject.clone(), poll_rate.to_string().into_bytes().into())
            .await
            .map_err(|e| StreamError::Transport(format!("failed to publish to {subject}: {e}")))?;
        Ok(events)
    }

    async fn stream_markpanels(&self) -> Result<EventStream<MarkPanelEvent>, StreamError> {
        self.subscribe::<MarkPanelUpdate, MarkPanelEvent>("markpanels")
            .await
    }

    async fn airbases(&self) -> Result<Vec<Airbase>, StreamError> {
        let airbases = self.request::<WireAirbase>("airbases.get").await?;
        Ok(airbases.into_iter().map(Airbase::from).collect())
    }

    async fn markpanels(&self) -> Result<Vec<MarkPanel>, StreamError> {
        let panels = self.request::<WireMarkPanel>("markpanels.get").await?;
        Ok(panels.into_iter().map(MarkPanel::from).collect())
    }
}

impl std::fmt::Debug for NatsConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsConsumer")
            .field("session", &self.session)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use dcscribe_core::Config;

    use super::*;

    #[test]
    fn connector_uses_session_endpoint_and_prefix() {
        let config: Config = serde_json::from_str(
            r#"{"sessions": [{
                "name": "Alpha", "short_name": "alpha",
                "rpc": {"host": "10.0.0.5", "port": 4223},
                "database": {"host": "db", "name": "dcscribe", "username": "scribe"}
            }]}"#,
        )
        .unwrap();
        let connector = NatsConnector::new(&config.sessions[0]);
        assert_eq!(connector.url, "nats://10.0.0.5:4223");
        assert_eq!(connector.prefix, "dcs.alpha");
    }
}

//! Scriptable stream consumer and connector for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dcscribe_types::{Airbase, MarkPanel, MarkPanelEvent, UnitEvent};
use futures::StreamExt;
use futures::stream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::stream::{Connector, EventStream, StreamConsumer, StreamError};

type Feed<T> = Mutex<Option<UnboundedReceiver<Result<T, StreamError>>>>;

fn channel_stream<T: Send + 'static>(
    receiver: UnboundedReceiver<Result<T, StreamError>>,
) -> EventStream<T> {
    stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|item| (item, receiver))
    })
    .boxed()
}

/// Consumer whose streams are fed from test-held channels.
///
/// Without a fed channel, the unit stream ends at once (a dropped
/// connection) and the mark panel stream never yields.
pub struct MockConsumer {
    units: Feed<UnitEvent>,
    markpanel_feed: Feed<MarkPanelEvent>,
    airbase_replies: Mutex<VecDeque<Result<Vec<Airbase>, StreamError>>>,
    markpanel_snapshot: Mutex<Result<Vec<MarkPanel>, StreamError>>,
    /// `stream_units` calls.
    pub unit_streams: AtomicUsize,
    /// `stream_markpanels` calls.
    pub markpanel_streams: AtomicUsize,
    /// `airbases` calls.
    pub airbase_calls: AtomicUsize,
    /// `markpanels` calls.
    pub markpanel_calls: AtomicUsize,
}

impl Default for MockConsumer {
    fn default() -> Self {
        Self {
            units: Mutex::new(None),
            markpanel_feed: Mutex::new(None),
            airbase_replies: Mutex::new(VecDeque::new()),
            markpanel_snapshot: Mutex::new(Ok(Vec::new())),
            unit_streams: AtomicUsize::new(0),
            markpanel_streams: AtomicUsize::new(0),
            airbase_calls: AtomicUsize::new(0),
            markpanel_calls: AtomicUsize::new(0),
        }
    }
}

impl MockConsumer {
    /// Feed the next unit stream from the returned sender.
    pub fn feed_units(&self) -> UnboundedSender<Result<UnitEvent, StreamError>> {
        let (tx, rx) = unbounded_channel();
        *self.units.lock().unwrap() = Some(rx);
        tx
    }

    /// Feed the next mark panel stream from the returned sender.
    pub fn feed_markpanels(&self) -> UnboundedSender<Result<MarkPanelEvent, StreamError>> {
        let (tx, rx) = unbounded_channel();
        *self.markpanel_feed.lock().unwrap() = Some(rx);
        tx
    }

    /// Queue a reply for `airbases`; an empty queue replies with no airbases.
    pub fn reply_airbases(&self, reply: Result<Vec<Airbase>, StreamError>) {
        self.airbase_replies.lock().unwrap().push_back(reply);
    }

    /// Set the reply of `markpanels`.
    pub fn set_markpanels(&self, reply: Result<Vec<MarkPanel>, StreamError>) {
        *self.markpanel_snapshot.lock().unwrap() = reply;
    }

    /// Read a call counter.
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamConsumer for MockConsumer {
    async fn stream_units(&self, _poll_rate: u32) -> Result<EventStream<UnitEvent>, StreamError> {
        self.unit_streams.fetch_add(1, Ordering::SeqCst);
        Ok(match self.units.lock().unwrap().take() {
            Some(receiver) => channel_stream(receiver),
            None => stream::empty().boxed(),
        })
    }

    async fn stream_markpanels(&self) -> Result<EventStream<MarkPanelEvent>, StreamError> {
        self.markpanel_streams.fetch_add(1, Ordering::SeqCst);
        Ok(match self.markpanel_feed.lock().unwrap().take() {
            Some(receiver) => channel_stream(receiver),
            None => stream::pending().boxed(),
        })
    }

    async fn airbases(&self) -> Result<Vec<Airbase>, StreamError> {
        self.airbase_calls.fetch_add(1, Ordering::SeqCst);
        self.airbase_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn markpanels(&self) -> Result<Vec<MarkPanel>, StreamError> {
        self.markpanel_calls.fetch_add(1, Ordering::SeqCst);
        self.markpanel_snapshot.lock().unwrap().clone()
    }
}

/// Connector handing out one shared [`MockConsumer`].
pub struct MockConnector {
    /// The consumer every successful connect returns.
    pub consumer: Arc<MockConsumer>,
    /// Connect attempts so far.
    pub connects: AtomicUsize,
    failures: AtomicUsize,
}

impl MockConnector {
    /// A connector whose first `failures` attempts fail.
    pub fn new(consumer: Arc<MockConsumer>, failures: usize) -> Self {
        Self {
            consumer,
            connects: AtomicUsize::new(0),
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn StreamConsumer>, StreamError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StreamError::Transport("connection refused".to_owned()));
        }
        Ok(Arc::clone(&self.consumer) as Arc<dyn StreamConsumer>)
    }
}

//! Publish request queueing: the per-callback outbox and the cross-context
//! channel handle.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::{String, Vec};

use super::PublishSink;
use crate::error::RelayError;

/// A publish request traveling over the cross-context channel.
///
/// Carries references only, so the topic and payload must outlive the
/// request; in practice both are `'static` configuration data.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    /// Topic to publish on.
    pub topic: &'a str,
    /// Payload bytes.
    pub payload: &'a [u8],
}

pub type PublishRequestChannel<'a, const DEPTH: usize> =
    Channel<CriticalSectionRawMutex, PublishRequest<'a>, DEPTH>;

pub type PublishRequestSender<'a, const DEPTH: usize> =
    Sender<'a, CriticalSectionRawMutex, PublishRequest<'a>, DEPTH>;

pub type PublishRequestReceiver<'a, const DEPTH: usize> =
    Receiver<'a, CriticalSectionRawMutex, PublishRequest<'a>, DEPTH>;

/// A handle that lets the rest of the firmware publish through the broker
/// session without holding a reference to it.
///
/// The handle wraps a channel sender, can be cloned freely, and can exist
/// before the session does: the session binds to the channel's receiving
/// end at construction time and drains requests in its service loop.
/// Wiring is therefore decoupled from session construction entirely.
#[derive(Clone, Copy)]
pub struct RelayPublisher<'a, const DEPTH: usize> {
    tx: PublishRequestSender<'a, DEPTH>,
}

impl<'a, const DEPTH: usize> RelayPublisher<'a, DEPTH> {
    pub fn new(tx: PublishRequestSender<'a, DEPTH>) -> Self {
        Self { tx }
    }

    /// Queues a publish request, waiting for a free channel slot.
    pub async fn publish(&self, topic: &'a str, payload: &'a [u8]) {
        self.tx.send(PublishRequest { topic, payload }).await;
    }

    /// Queues a publish request without waiting; `false` when the channel
    /// is full.
    pub fn try_publish(&self, topic: &'a str, payload: &'a [u8]) -> bool {
        self.tx.try_send(PublishRequest { topic, payload }).is_ok()
    }
}

/// An owned publish request with inline storage for topic and payload.
///
/// Outbox slots own their data, so nothing queued borrows from the relay
/// callback's arguments once the callback has returned.
#[derive(Debug, Clone)]
pub struct QueuedPublish<const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize> {
    /// Topic, stored inline.
    pub topic: String<TOPIC_SIZE>,
    /// Payload, stored inline.
    pub payload: Vec<u8, PAYLOAD_SIZE>,
}

/// A buffered outbox that collects publish requests during a relay callback.
///
/// The session hands a fresh outbox to the relay callback, then drains it
/// through the driver once the callback (and with it the borrow of the
/// driver's receive buffer) has ended.
///
/// # Type Parameters
///
/// - `CAPACITY`: how many requests one callback may queue
/// - `TOPIC_SIZE`: maximum topic length per slot
/// - `PAYLOAD_SIZE`: maximum payload length per slot
pub struct BufferedOutbox<const CAPACITY: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize>
{
    requests: Vec<QueuedPublish<TOPIC_SIZE, PAYLOAD_SIZE>, CAPACITY>,
}

impl<const CAPACITY: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize>
    BufferedOutbox<CAPACITY, TOPIC_SIZE, PAYLOAD_SIZE>
{
    /// Create a new empty buffered outbox.
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
        }
    }

    /// Drain all buffered requests, returning an owning iterator.
    pub fn drain(
        &mut self,
    ) -> impl Iterator<Item = QueuedPublish<TOPIC_SIZE, PAYLOAD_SIZE>> {
        core::mem::take(&mut self.requests).into_iter()
    }

    /// Check if the outbox is empty.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Get the number of buffered requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }
}

impl<const CAPACITY: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize> Default
    for BufferedOutbox<CAPACITY, TOPIC_SIZE, PAYLOAD_SIZE>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize> PublishSink
    for BufferedOutbox<CAPACITY, TOPIC_SIZE, PAYLOAD_SIZE>
{
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), RelayError> {
        let mut topic_str = String::new();
        topic_str
            .push_str(topic)
            .map_err(|_| RelayError::TopicTooLong {
                len: topic.len(),
                capacity: TOPIC_SIZE,
            })?;

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| RelayError::PayloadTooLarge {
                len: payload.len(),
                capacity: PAYLOAD_SIZE,
            })?;

        self.requests
            .push(QueuedPublish {
                topic: topic_str,
                payload: payload_vec,
            })
            .map_err(|_| RelayError::OutboxFull)
    }
}

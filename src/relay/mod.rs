//! Message Relay
//!
//! Strategies for moving a received payload out of the driver's receive
//! buffer and onto the outbound topic without corrupting either.
//!
//! # Overview
//!
//! The MQTT driver owns the buffer behind an [`InboundMessage`] and reuses
//! it as soon as the relay callback returns, while the outbound publish may
//! itself use shared I/O buffers. Every strategy therefore stages a complete
//! private copy of the payload *before* any outbound publish is issued:
//!
//! - [`HeapCopyRelay`] stages through an exactly-sized heap block, bounded
//!   by available RAM.
//! - [`StagedRelay`] stages through a single-slot scratch region of a
//!   persistent byte store, bounded by store capacity and suited to payloads
//!   that should be durably visible or exceed a convenient heap allocation.
//!
//! # Publishing Pattern
//!
//! Relay callbacks never perform async I/O directly. Instead, they queue
//! publish requests on a [`PublishSink`] (an owned [`BufferedOutbox`]), and
//! the session performs the actual publishing after the callback returns.
//! This keeps the callback object-safe, and it means no callback ever needs
//! a reference to the session it is wired to, which breaks the
//! construction-order knot between the two.

pub(crate) mod heap;
pub(crate) mod outbox;
pub(crate) mod staged;

pub use heap::HeapCopyRelay;
pub use outbox::{
    BufferedOutbox, PublishRequest, PublishRequestChannel, PublishRequestReceiver,
    PublishRequestSender, QueuedPublish, RelayPublisher,
};
pub use staged::{STAGE_SENTINEL, StageStore, StagedRelay};

use crate::error::RelayError;
use crate::session::InboundMessage;

/// Object-safe trait for queuing outbound publish requests.
///
/// Strategies use this to hand off their staged copy. The call is
/// synchronous and returns immediately; the session publishes the queued
/// requests after the callback returns. A request the sink cannot hold is
/// an error the strategy surfaces, never a silent drop.
pub trait PublishSink {
    /// Queue a message for publishing.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), RelayError>;
}

/// Object-safe trait for relay strategies.
///
/// Called synchronously from the session's service loop for every message
/// arriving on the inbound topic; at most one message is in flight at a
/// time. `msg` borrows the driver's receive buffer and is only valid for
/// the duration of the call.
pub trait MessageRelay {
    fn on_message(
        &mut self,
        msg: &InboundMessage<'_>,
        out: &mut dyn PublishSink,
    ) -> Result<(), RelayError>;
}

/// Blanket implementation for mutable references to trait objects.
impl<M: MessageRelay + ?Sized> MessageRelay for &mut M {
    fn on_message(
        &mut self,
        msg: &InboundMessage<'_>,
        out: &mut dyn PublishSink,
    ) -> Result<(), RelayError> {
        (**self).on_message(msg, out)
    }
}

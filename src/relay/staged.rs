//! Persistent-store staging relay strategy.

use log::{info, warn};

use super::{MessageRelay, PublishSink};
use crate::config::StagePolicy;
use crate::error::RelayError;
use crate::session::InboundMessage;

/// Cursor position the store is parked at between messages.
///
/// The slot starting here is reserved for staging and never used for
/// anything else, so the store behaves as a reusable single-slot scratch
/// buffer rather than a log.
pub const STAGE_SENTINEL: u32 = 1;

/// A trait representing the byte-addressable staging store.
///
/// The cursor is shared between reads and writes and advances by one on
/// every `read`/`write`, matching the sequential byte-stream interface of
/// SPI flash abstractions.
pub trait StageStore {
    /// The error type returned by the store.
    type Error: core::fmt::Debug;

    /// Total addressable bytes.
    fn capacity(&self) -> u32;

    /// Current cursor position.
    fn position(&self) -> u32;

    /// Moves the cursor to an absolute offset.
    fn seek(&mut self, offset: u32) -> Result<(), Self::Error>;

    /// Writes one byte at the cursor and advances it.
    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Reads one byte at the cursor and advances it.
    fn read(&mut self) -> Result<u8, Self::Error>;
}

/// Relays each inbound payload through a single-slot region of a persistent
/// store.
///
/// Per message: the cursor is reset to [`STAGE_SENTINEL`], the payload is
/// streamed in byte-by-byte, read back byte-by-byte from the same offset,
/// handed to the configured output ([`StagePolicy`]), and the cursor is
/// parked back at the sentinel. The cursor position is therefore identical
/// before and after every message, publish failures included.
///
/// `MAX_PAYLOAD` bounds the read-back buffer; payloads beyond it (or beyond
/// what the store can hold past the sentinel) are rejected whole.
pub struct StagedRelay<S: StageStore, const MAX_PAYLOAD: usize> {
    store: S,
    out_topic: &'static str,
    policy: StagePolicy,
}

impl<S: StageStore, const MAX_PAYLOAD: usize> StagedRelay<S, MAX_PAYLOAD> {
    pub fn new(store: S, out_topic: &'static str, policy: StagePolicy) -> Self {
        Self {
            store,
            out_topic,
            policy,
        }
    }

    /// The underlying store, e.g. for cursor inspection.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Usable staging capacity: everything past the sentinel.
    pub fn staging_capacity(&self) -> usize {
        self.store.capacity().saturating_sub(STAGE_SENTINEL) as usize
    }

    fn park(&mut self) -> Result<(), RelayError> {
        self.store.seek(STAGE_SENTINEL).map_err(|e| {
            warn!("stage store seek failed: {:?}", e);
            RelayError::Store
        })
    }
}

impl<S: StageStore, const MAX_PAYLOAD: usize> MessageRelay for StagedRelay<S, MAX_PAYLOAD> {
    fn on_message(
        &mut self,
        msg: &InboundMessage<'_>,
        out: &mut dyn PublishSink,
    ) -> Result<(), RelayError> {
        let len = msg.payload.len();
        if len > MAX_PAYLOAD {
            return Err(RelayError::PayloadTooLarge {
                len,
                capacity: MAX_PAYLOAD,
            });
        }
        if len > self.staging_capacity() {
            return Err(RelayError::PayloadTooLarge {
                len,
                capacity: self.staging_capacity(),
            });
        }

        self.park()?;
        for &byte in msg.payload {
            self.store.write(byte).map_err(|e| {
                warn!("stage store write failed: {:?}", e);
                RelayError::Store
            })?;
        }

        self.park()?;
        let mut staged: heapless::Vec<u8, MAX_PAYLOAD> = heapless::Vec::new();
        for _ in 0..len {
            let byte = self.store.read().map_err(|e| {
                warn!("stage store read failed: {:?}", e);
                RelayError::Store
            })?;
            staged.push(byte).map_err(|_| RelayError::PayloadTooLarge {
                len,
                capacity: MAX_PAYLOAD,
            })?;
        }

        let result = match self.policy {
            StagePolicy::Republish => out.publish(self.out_topic, &staged),
            StagePolicy::EchoOnly => {
                echo(&staged);
                Ok(())
            }
        };

        // Park the cursor even when the publish was refused: the reset law
        // holds across failures.
        self.park()?;
        result
    }
}

fn echo(bytes: &[u8]) {
    match core::str::from_utf8(bytes) {
        Ok(text) => info!("staged {} bytes: {}", bytes.len(), text),
        Err(_) => info!("staged {} bytes: {:02x?}", bytes.len(), bytes),
    }
}

//! Heap-copy relay strategy.

use alloc::vec::Vec;

use super::{MessageRelay, PublishSink};
use crate::error::RelayError;
use crate::session::InboundMessage;

/// Relays each inbound payload through a private, exactly-sized heap block.
///
/// The block is reserved fallibly (`try_reserve_exact`), filled with a
/// byte-for-byte copy of the inbound payload, queued for publishing on the
/// outbound topic, and dropped before the callback returns, on the failure
/// paths too. The relay runs indefinitely, so a leaked block per message
/// would be a correctness defect, not a degradation.
///
/// The inbound buffer belongs to the MQTT driver and is reused as soon as
/// the callback returns, while the outbound publish may use shared I/O
/// buffers of its own; the payload must be copied out before either
/// happens.
pub struct HeapCopyRelay {
    out_topic: &'static str,
}

impl HeapCopyRelay {
    pub const fn new(out_topic: &'static str) -> Self {
        Self { out_topic }
    }
}

impl MessageRelay for HeapCopyRelay {
    fn on_message(
        &mut self,
        msg: &InboundMessage<'_>,
        out: &mut dyn PublishSink,
    ) -> Result<(), RelayError> {
        let len = msg.payload.len();
        let mut block: Vec<u8> = Vec::new();
        if len > 0 {
            block
                .try_reserve_exact(len)
                .map_err(|_| RelayError::AllocationFailed { len })?;
        }
        block.extend_from_slice(msg.payload);

        // The block is dropped when this frame unwinds, whether or not the
        // sink accepted the request.
        out.publish(self.out_topic, &block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::alloc_meter;
    use crate::testing::{CollectingSink, FailingSink};

    fn inbound(payload: &[u8]) -> InboundMessage<'_> {
        InboundMessage {
            topic: "inTopic",
            payload,
        }
    }

    #[test]
    fn test_relays_payload_byte_identical() {
        let mut relay = HeapCopyRelay::new("outTopic");
        let mut sink = CollectingSink::new();
        relay.on_message(&inbound(b"hello"), &mut sink).unwrap();

        assert_eq!(sink.published.len(), 1);
        assert_eq!(sink.published[0].0.as_str(), "outTopic");
        assert_eq!(sink.published[0].1.as_slice(), b"hello");
    }

    #[test]
    fn test_zero_length_payload_publishes_without_allocating() {
        let mut relay = HeapCopyRelay::new("outTopic");
        let mut sink = CollectingSink::new();

        alloc_meter::reset();
        relay.on_message(&inbound(b""), &mut sink).unwrap();
        assert_eq!(alloc_meter::allocs(), 0);

        assert_eq!(sink.published.len(), 1);
        assert!(sink.published[0].1.is_empty());
    }

    #[test]
    fn test_exactly_one_allocation_of_payload_size() {
        let mut relay = HeapCopyRelay::new("outTopic");
        let mut sink = CollectingSink::new();
        let payload = [0xAB_u8; 37];

        alloc_meter::reset();
        relay.on_message(&inbound(&payload), &mut sink).unwrap();

        assert_eq!(alloc_meter::allocs(), 1);
        assert_eq!(alloc_meter::last_alloc_size(), 37);
        assert_eq!(alloc_meter::deallocs(), 1, "block must be released");
    }

    #[test]
    fn test_block_is_released_when_publish_fails() {
        let mut relay = HeapCopyRelay::new("outTopic");
        let mut sink = FailingSink;

        alloc_meter::reset();
        let err = relay.on_message(&inbound(b"doomed"), &mut sink).unwrap_err();
        assert_eq!(err, RelayError::OutboxFull);

        assert_eq!(alloc_meter::allocs(), 1);
        assert_eq!(alloc_meter::deallocs(), 1, "block must be released on failure too");
    }

    #[test]
    fn test_consecutive_messages_do_not_share_buffers() {
        let mut relay = HeapCopyRelay::new("outTopic");
        let mut sink = CollectingSink::new();

        relay.on_message(&inbound(b"abc"), &mut sink).unwrap();
        relay.on_message(&inbound(b"123456789"), &mut sink).unwrap();

        assert_eq!(sink.published[0].1.as_slice(), b"abc");
        assert_eq!(sink.published[1].1.as_slice(), b"123456789");
    }
}

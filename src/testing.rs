//! Test doubles for the driver contracts.
//!
//! Everything here is host-only scaffolding: scripted fakes for the radio,
//! the MQTT driver, the staging store, and the transport link, plus a
//! per-thread allocation meter for the heap-copy strategy's accounting
//! guarantees.

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use crate::config::Credentials;
use crate::error::RelayError;
use crate::radio::{AddressRecord, FirmwareVersion, RadioDriver};
use crate::relay::{PublishSink, StageStore};
use crate::session::{InboundMessage, MqttDriver};
use crate::transport::TransportLink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FakeError(pub &'static str);

/// Scripted radio driver.
pub(crate) struct FakeRadio {
    pub begin_ok: bool,
    pub profiles_ok: bool,
    /// Fail this many `connect_to_ap` calls before succeeding.
    pub associate_failures: u8,
    /// DHCP reports complete after this many polls; `None` = never.
    pub dhcp_after_polls: Option<u32>,
    /// The address record appears after this many polls; `None` = never.
    pub record_after_polls: Option<u32>,
    /// Ordered log of the async bring-up calls issued.
    pub calls: Vec<&'static str>,
    dhcp_polls: u32,
    record_polls: u32,
}

impl FakeRadio {
    /// A radio where every stage succeeds promptly.
    pub fn healthy() -> Self {
        Self {
            begin_ok: true,
            profiles_ok: true,
            associate_failures: 0,
            dhcp_after_polls: Some(0),
            record_after_polls: Some(0),
            calls: Vec::new(),
            dhcp_polls: 0,
            record_polls: 0,
        }
    }

    pub fn record() -> AddressRecord {
        AddressRecord {
            ip: [192, 168, 1, 20],
            netmask: [255, 255, 255, 0],
            gateway: [192, 168, 1, 1],
            dhcp_server: [192, 168, 1, 1],
            dns_server: [8, 8, 8, 8],
        }
    }
}

impl RadioDriver for FakeRadio {
    type Error = FakeError;

    async fn begin(&mut self) -> Result<(), Self::Error> {
        self.calls.push("begin");
        if self.begin_ok {
            Ok(())
        } else {
            Err(FakeError("radio dead"))
        }
    }

    async fn delete_profiles(&mut self) -> Result<(), Self::Error> {
        self.calls.push("delete_profiles");
        if self.profiles_ok {
            Ok(())
        } else {
            Err(FakeError("profile flash busy"))
        }
    }

    async fn connect_to_ap(&mut self, _credentials: &Credentials) -> Result<(), Self::Error> {
        self.calls.push("connect_to_ap");
        if self.associate_failures > 0 {
            self.associate_failures -= 1;
            Err(FakeError("association refused"))
        } else {
            Ok(())
        }
    }

    fn dhcp_complete(&mut self) -> bool {
        self.dhcp_polls += 1;
        match self.dhcp_after_polls {
            Some(n) => self.dhcp_polls > n,
            None => false,
        }
    }

    fn address_record(&mut self) -> Option<AddressRecord> {
        self.record_polls += 1;
        match self.record_after_polls {
            Some(n) if self.record_polls > n => Some(Self::record()),
            _ => None,
        }
    }

    fn firmware_version(&mut self) -> Result<FirmwareVersion, Self::Error> {
        Ok(FirmwareVersion { major: 1, minor: 32 })
    }

    fn mac_address(&mut self) -> Result<[u8; 6], Self::Error> {
        Ok([0x02, 0x1A, 0x11, 0x00, 0x00, 0x01])
    }
}

/// Scripted MQTT driver.
///
/// Inbound messages are queued with [`push_inbound`](Self::push_inbound);
/// once the script is exhausted the pump fails (or pends forever with
/// `pend_when_empty`), which is how tests bound otherwise indefinite loops.
pub(crate) struct FakeMqtt {
    /// Fail this many `connect` calls before succeeding.
    pub connect_failures: u8,
    pub connected: bool,
    /// Mark the session disconnected after this many polls.
    pub disconnect_after_polls: Option<u32>,
    /// Pend instead of failing when the inbound script is exhausted.
    pub pend_when_empty: bool,
    pub connect_calls: u32,
    pub published: Vec<(String, Vec<u8>)>,
    pub subscribed: Vec<String>,
    inbound: VecDeque<(String, Vec<u8>)>,
    current: Option<(String, Vec<u8>)>,
    poll_count: u32,
}

impl FakeMqtt {
    pub fn new() -> Self {
        Self {
            connect_failures: 0,
            connected: false,
            disconnect_after_polls: None,
            pend_when_empty: false,
            connect_calls: 0,
            published: Vec::new(),
            subscribed: Vec::new(),
            inbound: VecDeque::new(),
            current: None,
            poll_count: 0,
        }
    }

    pub fn push_inbound(&mut self, topic: &str, payload: &[u8]) {
        self.inbound.push_back((topic.into(), payload.into()));
    }
}

impl MqttDriver for FakeMqtt {
    type Error = FakeError;

    async fn connect(&mut self, _client_id: &str) -> Result<(), Self::Error> {
        self.connect_calls += 1;
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(FakeError("handshake refused"));
        }
        self.connected = true;
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        self.published.push((topic.into(), payload.into()));
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.subscribed.push(topic.into());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn poll(&mut self) -> Result<Option<InboundMessage<'_>>, Self::Error> {
        self.poll_count += 1;
        if let Some(n) = self.disconnect_after_polls {
            if self.poll_count >= n {
                self.connected = false;
            }
        }
        if let Some(next) = self.inbound.pop_front() {
            self.current = Some(next);
            let (topic, payload) = self.current.as_ref().expect("just set");
            return Ok(Some(InboundMessage {
                topic: topic.as_str(),
                payload: payload.as_slice(),
            }));
        }
        if self.pend_when_empty {
            return core::future::pending().await;
        }
        Err(FakeError("pump exhausted"))
    }
}

/// In-memory staging store with a shared read/write cursor.
pub(crate) struct FakeStore {
    data: Vec<u8>,
    cursor: usize,
    /// Total bytes written over the store's lifetime.
    pub writes: u32,
}

impl FakeStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: std::vec![0; capacity],
            cursor: 0,
            writes: 0,
        }
    }

    pub fn bytes(&self, start: usize, len: usize) -> &[u8] {
        &self.data[start..start + len]
    }
}

impl StageStore for FakeStore {
    type Error = FakeError;

    fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    fn position(&self) -> u32 {
        self.cursor as u32
    }

    fn seek(&mut self, offset: u32) -> Result<(), Self::Error> {
        if offset as usize > self.data.len() {
            return Err(FakeError("seek out of range"));
        }
        self.cursor = offset as usize;
        Ok(())
    }

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        if self.cursor >= self.data.len() {
            return Err(FakeError("write past end"));
        }
        self.data[self.cursor] = byte;
        self.cursor += 1;
        self.writes += 1;
        Ok(())
    }

    fn read(&mut self) -> Result<u8, Self::Error> {
        if self.cursor >= self.data.len() {
            return Err(FakeError("read past end"));
        }
        let byte = self.data[self.cursor];
        self.cursor += 1;
        Ok(byte)
    }
}

/// Transport link that only tracks connect calls.
pub(crate) struct FakeLink {
    pub connected: bool,
    pub connect_calls: u32,
}

impl FakeLink {
    pub fn new() -> Self {
        Self {
            connected: false,
            connect_calls: 0,
        }
    }
}

impl TransportLink for FakeLink {
    type Error = FakeError;

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self, _endpoint: crate::config::Endpoint) -> Result<(), Self::Error> {
        self.connect_calls += 1;
        self.connected = true;
        Ok(())
    }
}

/// Publish sink that records requests without touching the heap, so the
/// allocation meter only sees the strategy under test.
pub(crate) struct CollectingSink {
    pub published: heapless::Vec<(heapless::String<64>, heapless::Vec<u8, 512>), 8>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            published: heapless::Vec::new(),
        }
    }
}

impl PublishSink for CollectingSink {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), RelayError> {
        let mut t = heapless::String::new();
        t.push_str(topic).map_err(|_| RelayError::TopicTooLong {
            len: topic.len(),
            capacity: 64,
        })?;
        let mut p = heapless::Vec::new();
        p.extend_from_slice(payload)
            .map_err(|_| RelayError::PayloadTooLarge {
                len: payload.len(),
                capacity: 512,
            })?;
        self.published
            .push((t, p))
            .map_err(|_| RelayError::OutboxFull)
    }
}

/// Publish sink that refuses everything.
pub(crate) struct FailingSink;

impl PublishSink for FailingSink {
    fn publish(&mut self, _topic: &str, _payload: &[u8]) -> Result<(), RelayError> {
        Err(RelayError::OutboxFull)
    }
}

/// Per-thread heap accounting.
///
/// Counters are thread-local so concurrently running tests cannot pollute
/// each other's numbers.
pub(crate) mod alloc_meter {
    use core::cell::Cell;
    use std::alloc::{GlobalAlloc, Layout, System};

    std::thread_local! {
        static ALLOCS: Cell<usize> = const { Cell::new(0) };
        static DEALLOCS: Cell<usize> = const { Cell::new(0) };
        static LAST_ALLOC_SIZE: Cell<usize> = const { Cell::new(0) };
    }

    struct MeteredAllocator;

    unsafe impl GlobalAlloc for MeteredAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let _ = ALLOCS.try_with(|c| c.set(c.get() + 1));
            let _ = LAST_ALLOC_SIZE.try_with(|c| c.set(layout.size()));
            unsafe { System.alloc(layout) }
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            let _ = DEALLOCS.try_with(|c| c.set(c.get() + 1));
            unsafe { System.dealloc(ptr, layout) }
        }
    }

    #[global_allocator]
    static GLOBAL: MeteredAllocator = MeteredAllocator;

    pub fn reset() {
        ALLOCS.with(|c| c.set(0));
        DEALLOCS.with(|c| c.set(0));
        LAST_ALLOC_SIZE.with(|c| c.set(0));
    }

    pub fn allocs() -> usize {
        ALLOCS.with(|c| c.get())
    }

    pub fn deallocs() -> usize {
        DEALLOCS.with(|c| c.get())
    }

    pub fn last_alloc_size() -> usize {
        LAST_ALLOC_SIZE.with(|c| c.get())
    }
}

//! Demo: relay through a persistent staging store instead of the heap.
//!
//! Same wiring as `heap_relay_bridge`, but each payload is streamed through
//! the single staging slot of an in-memory byte store before being
//! republished. Pass `--echo` to keep the staged bytes on the console
//! instead of republishing them:
//!
//! ```text
//! RUST_LOG=debug cargo run --example staged_relay_bridge -- --echo
//! ```

use std::collections::VecDeque;

use embassy_sync::channel::Channel;
use log::info;
use mqtt_relay::relay::{PublishRequestChannel, StageStore};
use mqtt_relay::{
    BrokerSession, InboundMessage, MqttDriver, SessionConfig, StagePolicy, StagedRelay,
};

/// Byte store backed by plain memory; stands in for an SPI flash stream.
struct DemoStore {
    data: Vec<u8>,
    cursor: usize,
}

impl DemoStore {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            cursor: 0,
        }
    }
}

impl StageStore for DemoStore {
    type Error = &'static str;

    fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    fn position(&self) -> u32 {
        self.cursor as u32
    }

    fn seek(&mut self, offset: u32) -> Result<(), Self::Error> {
        if offset as usize > self.data.len() {
            return Err("seek out of range");
        }
        self.cursor = offset as usize;
        Ok(())
    }

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        if self.cursor >= self.data.len() {
            return Err("write past end");
        }
        self.data[self.cursor] = byte;
        self.cursor += 1;
        Ok(())
    }

    fn read(&mut self) -> Result<u8, Self::Error> {
        if self.cursor >= self.data.len() {
            return Err("read past end");
        }
        let byte = self.data[self.cursor];
        self.cursor += 1;
        Ok(byte)
    }
}

/// MQTT driver that serves a scripted inbound queue, then pends.
#[derive(Default)]
struct DemoMqtt {
    connected: bool,
    inbound: VecDeque<(String, Vec<u8>)>,
    current: Option<(String, Vec<u8>)>,
}

impl DemoMqtt {
    fn push_inbound(&mut self, topic: &str, payload: &[u8]) {
        self.inbound.push_back((topic.into(), payload.into()));
    }
}

impl MqttDriver for DemoMqtt {
    type Error = &'static str;

    async fn connect(&mut self, client_id: &str) -> Result<(), Self::Error> {
        info!("[broker] CONNECT {}", client_id);
        self.connected = true;
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        info!(
            "[broker] PUBLISH {} <- {:?}",
            topic,
            String::from_utf8_lossy(payload)
        );
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        info!("[broker] SUBSCRIBE {}", topic);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn poll(&mut self) -> Result<Option<InboundMessage<'_>>, Self::Error> {
        if let Some(next) = self.inbound.pop_front() {
            self.current = Some(next);
            let (topic, payload) = self.current.as_ref().expect("just set");
            return Ok(Some(InboundMessage {
                topic: topic.as_str(),
                payload: payload.as_slice(),
            }));
        }
        std::future::pending().await
    }
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let policy = if std::env::args().any(|arg| arg == "--echo") {
        StagePolicy::EchoOnly
    } else {
        StagePolicy::Republish
    };

    embassy_futures::block_on(async {
        static CHANNEL: PublishRequestChannel<'static, 4> = Channel::new();

        let mut driver = DemoMqtt::default();
        driver.push_inbound("inTopic", b"staged through flash");
        driver.push_inbound("inTopic", b"second slot reuse");

        let mut session: BrokerSession<_, 4, 64, 256> =
            BrokerSession::new(driver, SessionConfig::default(), CHANNEL.receiver());
        if let Err(e) = session.connect().await {
            log::error!("broker connect failed: {}", e);
            return;
        }

        let mut relay: StagedRelay<_, 256> = StagedRelay::new(DemoStore::new(4096), "outTopic", policy);
        for _ in 0..2 {
            if let Err(e) = session.service(&mut relay).await {
                log::error!("service failed: {}", e);
                return;
            }
        }
        info!(
            "store cursor parked at offset {}",
            relay.store().position()
        );
    });
}

//! Demo: full bring-up and heap-copy relay over scripted drivers.
//!
//! Runs the real orchestration path (bootstrap, broker connect, announce,
//! subscribe, service loop) against in-memory stand-ins for the radio and
//! MQTT drivers, so the wiring can be watched on a host:
//!
//! ```text
//! RUST_LOG=debug cargo run --example heap_relay_bridge
//! ```

use std::collections::VecDeque;

use embassy_sync::channel::Channel;
use log::info;
use mqtt_relay::radio::{AddressRecord, FirmwareVersion, RadioDriver};
use mqtt_relay::relay::PublishRequestChannel;
use mqtt_relay::{
    BootstrapConfig, BrokerSession, Credentials, Endpoint, HeapCopyRelay, InboundMessage,
    MqttDriver, NetworkBootstrap, RelayPublisher, SessionConfig,
};

/// Radio whose DHCP lease lands after a couple of polls.
#[derive(Default)]
struct DemoRadio {
    dhcp_polls: u32,
}

impl RadioDriver for DemoRadio {
    type Error = &'static str;

    async fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn delete_profiles(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn connect_to_ap(&mut self, _credentials: &Credentials) -> Result<(), Self::Error> {
        Ok(())
    }

    fn dhcp_complete(&mut self) -> bool {
        self.dhcp_polls += 1;
        self.dhcp_polls > 2
    }

    fn address_record(&mut self) -> Option<AddressRecord> {
        Some(AddressRecord {
            ip: [192, 168, 1, 20],
            netmask: [255, 255, 255, 0],
            gateway: [192, 168, 1, 1],
            dhcp_server: [192, 168, 1, 1],
            dns_server: [8, 8, 8, 8],
        })
    }

    fn firmware_version(&mut self) -> Result<FirmwareVersion, Self::Error> {
        Ok(FirmwareVersion { major: 1, minor: 32 })
    }

    fn mac_address(&mut self) -> Result<[u8; 6], Self::Error> {
        Ok([0x02, 0x1A, 0x11, 0x00, 0x00, 0x01])
    }
}

/// MQTT driver that serves a scripted inbound queue, then pends.
#[derive(Default)]
struct DemoMqtt {
    connected: bool,
    inbound: VecDeque<(String, Vec<u8>)>,
    current: Option<(String, Vec<u8>)>,
    published: usize,
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
        self.published += 1;
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
        // Script exhausted: behave like a quiet broker.
        std::future::pending().await
    }
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    embassy_futures::block_on(async {
        let credentials = Credentials::wpa2("workshop-ap", "super secret");
        let broker = Endpoint::new([192, 168, 1, 2], Endpoint::DEFAULT_PORT);
        info!("bridging {} -> {}", credentials.ssid, broker);

        let mut bootstrap = NetworkBootstrap::new(DemoRadio::default(), BootstrapConfig::default());
        let record = match bootstrap.run(&credentials).await {
            Ok(record) => record,
            Err(e) => {
                log::error!("bring-up failed: {}", e);
                return;
            }
        };
        info!("bring-up complete: {}", record);

        // The publish handle exists (and queues) before the session does.
        static CHANNEL: PublishRequestChannel<'static, 4> = Channel::new();
        let publisher: RelayPublisher<'static, 4> = RelayPublisher::new(CHANNEL.sender());
        publisher.try_publish("outTopic", b"bridge online");

        let mut driver = DemoMqtt::default();
        driver.push_inbound("inTopic", b"hello");
        driver.push_inbound("inTopic", b"");
        driver.push_inbound("otherTopic", b"not for us");
        driver.push_inbound("inTopic", b"relay me");

        let mut session: BrokerSession<_, 4, 64, 256> =
            BrokerSession::new(driver, SessionConfig::default(), CHANNEL.receiver());
        if let Err(e) = session.connect().await {
            log::error!("broker connect failed: {}", e);
            return;
        }

        let mut relay = HeapCopyRelay::new("outTopic");
        // Four scripted messages, then one lap that drains the early publish.
        for _ in 0..5 {
            if let Err(e) = session.service(&mut relay).await {
                log::error!("service failed: {}", e);
                return;
            }
        }
        info!("done: {} broker publishes issued", session.driver().published);
    });
}

//! # WiFi-to-MQTT Relay Orchestration for Embedded Systems
//!
//! `mqtt-relay` is a `no_std` compatible orchestration layer for devices that
//! bridge a WiFi radio to an MQTT broker and relay messages between an
//! inbound and an outbound topic. It is built upon the
//! [Embassy](https://embassy.dev/) async ecosystem.
//!
//! The crate deliberately does **not** implement a WiFi stack, an MQTT
//! protocol codec, or a flash filesystem. Those are external collaborators,
//! consumed through narrow trait contracts (`RadioDriver`, `MqttDriver`,
//! `TransportLink`, `StageStore`). What it does implement is everything
//! around them:
//!
//! - **Bring-up**: the [`NetworkBootstrap`] state machine drives the radio
//!   from power-on to a DHCP-bound address record, with deadline-bounded
//!   polling and explicit fatal errors instead of in-component halts.
//! - **Broker session**: [`BrokerSession`] establishes the MQTT session
//!   (bounded connect retries with backoff), announces itself, subscribes to
//!   the inbound topic, and pumps a cooperative service loop.
//! - **Relay strategies**: [`HeapCopyRelay`] copies each payload through a
//!   private, exactly-sized heap block; [`StagedRelay`] streams it through a
//!   single-slot scratch region of a persistent byte store. Both guarantee
//!   the outbound publish never reads from the driver's receive buffer.
//!
//! ## Core Features
//!
//! - **`no_std`:** Designed to run on bare-metal microcontrollers. Bounded
//!   buffers are managed with `heapless`; only the heap-copy relay strategy
//!   touches the allocator, and it does so fallibly.
//! - **Fully Async:** Built with `async/await` on the Embassy ecosystem for
//!   timers and networking, with native `async fn` in traits (Rust 2024
//!   Edition, no `async-trait` needed).
//! - **Single thread of control:** No locks, no scheduler assumptions. All
//!   work happens inside calls the main loop makes; relay callbacks run
//!   synchronously to completion inside [`BrokerSession::service`].
//! - **Late-bound publishing:** Other parts of the firmware publish through a
//!   [`RelayPublisher`] channel handle that can exist before the session
//!   does, so nothing ever holds a reference to a half-constructed session.
//!
//! ## Usage
//!
//! ```ignore
//! use mqtt_relay::{
//!     BootstrapConfig, BrokerSession, Credentials, HeapCopyRelay,
//!     NetworkBootstrap, SessionConfig,
//! };
//!
//! let mut bootstrap = NetworkBootstrap::new(radio, BootstrapConfig::default());
//! let record = bootstrap.run(&Credentials::wpa2("ssid", "passphrase")).await?;
//!
//! link.ensure_connected(broker_endpoint).await?;
//!
//! let mut session: BrokerSession<_, 4, 64, 256> =
//!     BrokerSession::new(mqtt, SessionConfig::default(), channel.receiver());
//! session.connect().await?;
//!
//! let mut relay = HeapCopyRelay::new("outTopic");
//! session.run(&mut relay).await?;
//! ```
//!
//! The relay callback is wired to the session only at `run`/`service` time,
//! never at construction time, and it publishes through an owned outbox that
//! the session drains after the callback returns. The inbound message borrow
//! is therefore guaranteed to be dead before the first outbound byte moves.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod radio;
pub mod relay;
pub mod session;
pub mod state;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for easier access at the crate root.
pub use bootstrap::NetworkBootstrap;
pub use config::{
    BootstrapConfig, Credentials, Endpoint, SecurityMode, SessionConfig, StagePolicy,
};
pub use error::{BootstrapError, BootstrapStage, RelayError, SessionError};
pub use relay::{
    BufferedOutbox, HeapCopyRelay, MessageRelay, PublishSink, RelayPublisher, StagedRelay,
};
pub use session::{BrokerSession, InboundMessage, MqttDriver};
pub use state::ConnectionState;
pub use transport::{TcpLink, TransportLink};

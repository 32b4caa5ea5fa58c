//! # Broker Session
//!
//! `BrokerSession` owns the MQTT driver and takes the device from a bound
//! network to a live subscription, then pumps the cooperative service loop
//! the relay runs inside.
//!
//! # Service Model
//!
//! There is exactly one logical thread of control. [`BrokerSession::service`]
//! is the only point at which relay callbacks execute, and they execute
//! synchronously to completion before `service` returns. The main loop must
//! call `service` repeatedly and frequently (or hand control to
//! [`BrokerSession::run`], which does so forever and folds reconnects in).
//!
//! # Wiring Order
//!
//! The relay is passed to `service`/`run` as an argument, never stored at
//! construction time, and it publishes through an owned outbox drained by
//! the session afterwards. Cross-context publishers go through the
//! [`RelayPublisher`](crate::relay::RelayPublisher) channel. Neither path
//! ever holds a reference to the session itself, so there is no window in
//! which a callback could observe a half-constructed session.

use embassy_futures::select::{Either, select};
use embassy_time::Timer;
use log::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::relay::{BufferedOutbox, MessageRelay, PublishRequestReceiver};
use crate::state::ConnectionState;

/// A message handed to the relay callback.
///
/// Borrows the MQTT driver's receive buffer; the driver reuses or
/// invalidates that buffer as soon as the callback returns, so nothing may
/// retain these references past the callback.
#[derive(Debug, Clone, Copy)]
pub struct InboundMessage<'a> {
    /// Topic the message arrived on.
    pub topic: &'a str,
    /// Payload bytes, length determined at runtime.
    pub payload: &'a [u8],
}

/// A trait representing the MQTT driver.
///
/// The driver owns packet framing, keep-alive, and its transport handle;
/// the session only issues requests and pumps it.
#[allow(async_fn_in_trait)]
pub trait MqttDriver {
    /// The error type returned by the driver.
    type Error: core::fmt::Debug;

    /// Performs the MQTT-level handshake.
    async fn connect(&mut self, client_id: &str) -> Result<(), Self::Error>;

    /// Publishes a payload on a topic.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Subscribes to a topic.
    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Whether the MQTT session is currently established.
    fn is_connected(&self) -> bool;

    /// Pumps keep-alive and incoming-packet dispatch.
    ///
    /// Returns the next inbound publish, or `None` when the pump had
    /// nothing to deliver this round. The returned message borrows the
    /// driver's receive buffer.
    async fn poll(&mut self) -> Result<Option<InboundMessage<'_>>, Self::Error>;
}

/// MQTT session orchestration over an [`MqttDriver`].
///
/// # Type Parameters
///
/// - `DEPTH`: capacity of the publish outbox and the cross-context channel
/// - `TOPIC_SIZE`: maximum topic length in an outbox slot
/// - `PAYLOAD_SIZE`: maximum payload length in an outbox slot
pub struct BrokerSession<
    'ch,
    M: MqttDriver,
    const DEPTH: usize,
    const TOPIC_SIZE: usize,
    const PAYLOAD_SIZE: usize,
> {
    driver: M,
    config: SessionConfig,
    state: ConnectionState,
    requests: PublishRequestReceiver<'ch, DEPTH>,
}

impl<'ch, M, const DEPTH: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize>
    BrokerSession<'ch, M, DEPTH, TOPIC_SIZE, PAYLOAD_SIZE>
where
    M: MqttDriver,
{
    /// Creates a session over a driver whose transport is already
    /// established (see
    /// [`TransportLink::ensure_connected`](crate::transport::TransportLink::ensure_connected)).
    ///
    /// `requests` is the receiving end of the cross-context publish channel;
    /// hand its senders out as [`RelayPublisher`](crate::relay::RelayPublisher)
    /// handles.
    pub fn new(
        driver: M,
        config: SessionConfig,
        requests: PublishRequestReceiver<'ch, DEPTH>,
    ) -> Self {
        Self {
            driver,
            config,
            state: ConnectionState::DhcpBound,
            requests,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The underlying driver.
    pub fn driver(&self) -> &M {
        &self.driver
    }

    /// Performs the MQTT handshake, announces the device, and subscribes to
    /// the inbound topic.
    ///
    /// The handshake is retried up to `connect_attempts` times with a
    /// doubling backoff. When every attempt is refused, the announcement
    /// and subscription are not issued and the session stays unusable for
    /// this cycle.
    pub async fn connect(&mut self) -> Result<(), SessionError<M::Error>> {
        let attempts = self.config.connect_attempts.max(1);
        let mut backoff = self.config.connect_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.driver.connect(self.config.client_id).await {
                Ok(()) => break,
                Err(source) => {
                    warn!(
                        "broker connect attempt {}/{} failed: {:?}",
                        attempt, attempts, source
                    );
                    if attempt >= attempts {
                        return Err(SessionError::ConnectFailed { attempts, source });
                    }
                    Timer::after(backoff).await;
                    backoff = backoff * 2;
                }
            }
        }
        self.state.advance(ConnectionState::BrokerConnected);
        info!("connected to broker as {}", self.config.client_id);
        info!(
            "publish outbox: {} slots of {}+{} bytes",
            DEPTH, TOPIC_SIZE, PAYLOAD_SIZE
        );

        self.driver
            .publish(self.config.out_topic, self.config.announce)
            .await
            .map_err(SessionError::Publish)?;
        self.driver
            .subscribe(self.config.in_topic)
            .await
            .map_err(SessionError::Subscribe)?;
        self.state.advance(ConnectionState::Subscribed);
        info!("subscribed to {}", self.config.in_topic);
        Ok(())
    }

    /// Publishes a payload through the live session.
    ///
    /// Requires an established connection; without one the driver is not
    /// touched and [`SessionError::NotConnected`] is returned.
    pub async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), SessionError<M::Error>> {
        if !self.driver.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.driver
            .publish(topic, payload)
            .await
            .map_err(SessionError::Publish)
    }

    /// Subscribes to an additional topic on the live session.
    pub async fn subscribe(&mut self, topic: &str) -> Result<(), SessionError<M::Error>> {
        if !self.driver.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.driver
            .subscribe(topic)
            .await
            .map_err(SessionError::Subscribe)
    }

    /// One cooperative pump of the session.
    ///
    /// Races the driver pump against the cross-context publish channel.
    /// When an inbound message on the subscribed topic wins, the relay
    /// callback runs synchronously with a fresh outbox, and the outbox is
    /// drained through the driver after the callback (and the borrow of the
    /// driver's receive buffer) has ended.
    ///
    /// Call this repeatedly and frequently from the main loop.
    pub async fn service(
        &mut self,
        relay: &mut dyn MessageRelay,
    ) -> Result<(), SessionError<M::Error>> {
        if !self.driver.is_connected() {
            return Err(SessionError::NotConnected);
        }

        let mut outbox = BufferedOutbox::<DEPTH, TOPIC_SIZE, PAYLOAD_SIZE>::new();

        // Extract everything owned out of the race before touching the
        // driver again: the inbound message borrows the driver's receive
        // buffer, and that borrow must be dead before the drain below.
        let mut queued_request = None;
        {
            let pump = self.driver.poll();
            let incoming = self.requests.receive();
            match select(pump, incoming).await {
                Either::First(polled) => {
                    if let Some(msg) = polled.map_err(SessionError::Pump)? {
                        if msg.topic == self.config.in_topic {
                            relay.on_message(&msg, &mut outbox)?;
                        } else {
                            debug!("ignoring message on {}", msg.topic);
                        }
                    }
                }
                Either::Second(request) => queued_request = Some(request),
            }
        }

        if let Some(request) = queued_request {
            self.driver
                .publish(request.topic, request.payload)
                .await
                .map_err(SessionError::Publish)?;
        }

        for request in outbox.drain() {
            self.driver
                .publish(request.topic.as_str(), &request.payload)
                .await
                .map_err(SessionError::Publish)?;
        }
        Ok(())
    }

    /// Indefinite service loop with reconnect-on-loss.
    ///
    /// Each lap checks the MQTT session and re-runs [`connect`](Self::connect)
    /// (with its bounded retries) when it has been lost. Errors other than a
    /// detected disconnect propagate to the caller.
    pub async fn run(
        &mut self,
        relay: &mut dyn MessageRelay,
    ) -> Result<(), SessionError<M::Error>> {
        loop {
            if !self.driver.is_connected() {
                if self.state > ConnectionState::DhcpBound {
                    warn!("broker connection lost, reconnecting");
                    self.state.regress(ConnectionState::DhcpBound);
                }
                self.connect().await?;
            }
            match self.service(relay).await {
                Ok(()) => {}
                Err(SessionError::NotConnected) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

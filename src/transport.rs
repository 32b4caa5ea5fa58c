//! # Transport Link Abstraction
//!
//! This module defines the `TransportLink` trait, the narrow contract for
//! bringing up the byte pipe the MQTT driver rides on, plus a concrete
//! `embassy-net` TCP implementation. The driver owns the pipe once it is
//! established; this layer only opens it.
//!
//! The link is brought up idempotently: `ensure_connected` is a no-op when
//! the link is already established, so it is safe to call on every
//! reconnect cycle.

use embassy_net::tcp::{ConnectError, State, TcpSocket};
use embassy_net::{IpAddress, IpEndpoint};
use log::debug;

use crate::config::Endpoint;

/// A trait representing the transport the broker session rides on.
#[allow(async_fn_in_trait)]
pub trait TransportLink {
    /// The error type returned by the link.
    type Error: core::fmt::Debug;

    /// Whether the link is currently established.
    fn is_connected(&self) -> bool;

    /// Opens the link to the given endpoint.
    async fn connect(&mut self, endpoint: Endpoint) -> Result<(), Self::Error>;

    /// Idempotent bring-up: opens the link unless it is already established.
    async fn ensure_connected(&mut self, endpoint: Endpoint) -> Result<(), Self::Error> {
        if self.is_connected() {
            debug!("transport already connected, skipping");
            return Ok(());
        }
        self.connect(endpoint).await
    }
}

/// TCP link implementation using `embassy-net`.
///
/// The socket is handed to the MQTT driver after bring-up; the link itself
/// never reads or writes it.
pub struct TcpLink<'a> {
    socket: TcpSocket<'a>,
}

impl<'a> TcpLink<'a> {
    /// Creates a new `TcpLink` over the given socket.
    pub fn new(socket: TcpSocket<'a>) -> Self {
        Self { socket }
    }

    /// Releases the established socket, e.g. to construct the MQTT driver
    /// with it.
    pub fn into_socket(self) -> TcpSocket<'a> {
        self.socket
    }
}

impl TransportLink for TcpLink<'_> {
    type Error = ConnectError;

    fn is_connected(&self) -> bool {
        self.socket.state() == State::Established
    }

    async fn connect(&mut self, endpoint: Endpoint) -> Result<(), Self::Error> {
        let [a, b, c, d] = endpoint.addr;
        let remote = IpEndpoint::new(IpAddress::v4(a, b, c, d), endpoint.port);
        self.socket.connect(remote).await?;
        debug!("transport connected to {}", endpoint);
        Ok(())
    }
}

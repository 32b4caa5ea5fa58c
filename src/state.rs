//! Connection lifecycle states.

use log::debug;

/// Device connection lifecycle, from power-on to a live subscription.
///
/// The success path moves strictly forward through the variants in
/// declaration order, one step at a time. On a detected failure the state
/// regresses to an earlier variant (never partially), and the bring-up
/// sequence for the skipped stages runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Uninitialized,
    RadioReady,
    Associated,
    DhcpBound,
    BrokerConnected,
    Subscribed,
}

impl ConnectionState {
    /// The next state on the success path, or `None` from `Subscribed`.
    pub fn successor(self) -> Option<ConnectionState> {
        match self {
            Self::Uninitialized => Some(Self::RadioReady),
            Self::RadioReady => Some(Self::Associated),
            Self::Associated => Some(Self::DhcpBound),
            Self::DhcpBound => Some(Self::BrokerConnected),
            Self::BrokerConnected => Some(Self::Subscribed),
            Self::Subscribed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::RadioReady => "radio-ready",
            Self::Associated => "associated",
            Self::DhcpBound => "dhcp-bound",
            Self::BrokerConnected => "broker-connected",
            Self::Subscribed => "subscribed",
        }
    }

    /// Advance one step on the success path.
    ///
    /// Stages must not be skipped or reordered; in debug builds a transition
    /// that is not the immediate successor panics.
    pub fn advance(&mut self, next: ConnectionState) {
        debug_assert_eq!(
            self.successor(),
            Some(next),
            "connection state must advance one stage at a time"
        );
        debug!("connection state {} -> {}", self.as_str(), next.as_str());
        *self = next;
    }

    /// Fall back to an earlier state after a detected failure.
    pub fn regress(&mut self, to: ConnectionState) {
        debug_assert!(to < *self, "regression must move backwards");
        debug!("connection state {} -> {} (regress)", self.as_str(), to.as_str());
        *self = to;
    }
}

//! # Error Types
//!
//! This module defines the error types used throughout the relay
//! orchestration layer. Three kinds recur, mirrored in the enums below:
//! fatal bring-up failures the caller must not continue past, bounded waits
//! that elapsed, and broker-side failures surfaced so the caller can retry,
//! alert, or degrade instead of silently skipping the dependent step.

use core::fmt;

/// Bring-up stages, used to tag fatal and timeout errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootstrapStage {
    RadioInit,
    ProfileReset,
    Association,
    DhcpLease,
    AddressRecord,
}

impl BootstrapStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RadioInit => "radio init",
            Self::ProfileReset => "profile reset",
            Self::Association => "association",
            Self::DhcpLease => "DHCP lease",
            Self::AddressRecord => "address record",
        }
    }
}

/// Errors from [`NetworkBootstrap`](crate::NetworkBootstrap), generic over
/// the radio driver's error type.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootstrapError<E> {
    /// Bring-up cannot proceed and retrying the stage is unsafe: the radio
    /// failed to initialize, stored profiles could not be cleared, or
    /// association was refused. The caller decides whether to halt, reboot,
    /// or alert; it must not continue as if connected.
    Fatal { stage: BootstrapStage, source: E },
    /// A bounded poll wait elapsed without the driver reporting readiness.
    /// The stage can be retried once the caller has decided on a policy.
    Timeout { stage: BootstrapStage },
}

impl<E: fmt::Debug> fmt::Display for BootstrapError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal { stage, source } => {
                write!(f, "fatal {} failure: {:?}", stage.as_str(), source)
            }
            Self::Timeout { stage } => write!(f, "{} wait timed out", stage.as_str()),
        }
    }
}

/// Errors from [`BrokerSession`](crate::BrokerSession), generic over the
/// MQTT driver's error type.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError<E> {
    /// The MQTT handshake failed on every attempt of this cycle. The
    /// announcement publish and the inbound subscription were not issued.
    ConnectFailed { attempts: u8, source: E },
    /// The inbound-topic subscription was refused.
    Subscribe(E),
    /// An outbound publish was refused.
    Publish(E),
    /// The driver pump itself failed (transport-level fault).
    Pump(E),
    /// The session is not connected; the caller should re-run `connect`.
    NotConnected,
    /// The relay callback rejected the message.
    Relay(RelayError),
}

impl<E> From<RelayError> for SessionError<E> {
    fn from(err: RelayError) -> Self {
        Self::Relay(err)
    }
}

impl<E: fmt::Debug> fmt::Display for SessionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { attempts, source } => {
                write!(f, "broker connect failed after {} attempts: {:?}", attempts, source)
            }
            Self::Subscribe(e) => write!(f, "subscribe refused: {:?}", e),
            Self::Publish(e) => write!(f, "publish refused: {:?}", e),
            Self::Pump(e) => write!(f, "session pump failed: {:?}", e),
            Self::NotConnected => write!(f, "not connected to broker"),
            Self::Relay(e) => write!(f, "relay failed: {}", e),
        }
    }
}

/// Errors from the relay strategies.
///
/// A payload the chosen strategy cannot hold is an explicit failure, never a
/// silent truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayError {
    /// The heap-copy strategy could not reserve a block of the payload size.
    AllocationFailed { len: usize },
    /// The payload exceeds the staging capacity of the chosen strategy.
    PayloadTooLarge { len: usize, capacity: usize },
    /// The topic does not fit an outbox slot.
    TopicTooLong { len: usize, capacity: usize },
    /// The outbox has no free slot for another publish request.
    OutboxFull,
    /// The staging store reported a fault; details are logged at the fault
    /// site.
    Store,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { len } => {
                write!(f, "could not allocate {} byte relay block", len)
            }
            Self::PayloadTooLarge { len, capacity } => {
                write!(f, "payload of {} bytes exceeds staging capacity {}", len, capacity)
            }
            Self::TopicTooLong { len, capacity } => {
                write!(f, "topic of {} bytes exceeds slot capacity {}", len, capacity)
            }
            Self::OutboxFull => write!(f, "publish outbox full"),
            Self::Store => write!(f, "staging store fault"),
        }
    }
}

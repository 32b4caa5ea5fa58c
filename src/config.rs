//! Build-time configuration surface.
//!
//! Everything here is fixed for the lifetime of the process: access point
//! credentials, the broker endpoint, topic names, and the timing knobs for
//! bring-up polling and connect retries. There is no runtime configuration
//! channel; firmware images are built for one deployment.

use core::fmt;

use embassy_time::Duration;

/// Wireless security mode of the configured access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityMode {
    Open,
    Wep,
    Wpa,
    Wpa2,
}

/// Access point credentials, supplied at build time.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Credentials {
    pub ssid: &'static str,
    pub passphrase: &'static str,
    pub security: SecurityMode,
}

impl Credentials {
    pub const fn new(ssid: &'static str, passphrase: &'static str, security: SecurityMode) -> Self {
        Self {
            ssid,
            passphrase,
            security,
        }
    }

    /// Shorthand for the common WPA2 case.
    pub const fn wpa2(ssid: &'static str, passphrase: &'static str) -> Self {
        Self::new(ssid, passphrase, SecurityMode::Wpa2)
    }
}

/// Broker endpoint: a 4-octet IPv4 address plus a port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Endpoint {
    pub addr: [u8; 4],
    pub port: u16,
}

impl Endpoint {
    /// Standard unencrypted MQTT port.
    pub const DEFAULT_PORT: u16 = 1883;

    pub const fn new(addr: [u8; 4], port: u16) -> Self {
        Self { addr, port }
    }

    /// The address packed into a `u32`, big-endian: `[192, 168, 0, 1]`
    /// becomes `0xC0A8_0001`.
    pub const fn addr_u32(&self) -> u32 {
        u32::from_be_bytes(self.addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}:{}",
            self.addr[0], self.addr[1], self.addr[2], self.addr[3], self.port
        )
    }
}

/// Poll intervals, deadlines, and retry bounds for the bring-up sequence.
///
/// Every wait in the bootstrap is bounded: a stage that does not become
/// ready before its deadline produces a timeout error instead of blocking
/// the device forever.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootstrapConfig {
    /// Interval between DHCP-completion polls.
    pub dhcp_poll_interval: Duration,
    /// Deadline for the DHCP lease to appear.
    pub dhcp_deadline: Duration,
    /// Interval between address-record polls.
    pub address_poll_interval: Duration,
    /// Deadline for the full address record to appear.
    pub address_deadline: Duration,
    /// Association attempts before the failure is treated as fatal.
    ///
    /// The default of `1` keeps the strict policy of treating a failed join
    /// as a configuration error that must be made visible rather than
    /// papered over; raise it for deployments with flaky access points.
    pub association_attempts: u8,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            dhcp_poll_interval: Duration::from_millis(100),
            dhcp_deadline: Duration::from_secs(30),
            address_poll_interval: Duration::from_millis(100),
            address_deadline: Duration::from_secs(10),
            association_attempts: 1,
        }
    }
}

/// Broker session identity, topics, and connect retry policy.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionConfig {
    /// Client identifier presented in the MQTT handshake.
    pub client_id: &'static str,
    /// Topic the session subscribes to; messages arriving here are relayed.
    pub in_topic: &'static str,
    /// Topic relayed messages are published on.
    pub out_topic: &'static str,
    /// Payload published on the outbound topic right after connecting.
    pub announce: &'static [u8],
    /// Connect attempts before giving up on this cycle.
    pub connect_attempts: u8,
    /// Backoff before the first connect retry; doubles on each retry.
    pub connect_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: "arduinoClient",
            in_topic: "inTopic",
            out_topic: "outTopic",
            announce: b"hello world",
            connect_attempts: 3,
            connect_backoff: Duration::from_secs(1),
        }
    }
}

/// What the staged relay does with a payload after reading it back from the
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StagePolicy {
    /// Publish the staged payload on the outbound topic.
    Republish,
    /// Emit the staged payload on the diagnostic stream only. Useful when
    /// the store tap is being verified on the bench without a broker
    /// round-trip.
    EchoOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_packs_big_endian() {
        let endpoint = Endpoint::new([192, 168, 0, 1], Endpoint::DEFAULT_PORT);
        assert_eq!(endpoint.addr_u32(), 0xC0A8_0001);
    }

    #[test]
    fn test_endpoint_display() {
        let endpoint = Endpoint::new([10, 0, 1, 7], 1883);
        let text = std::format!("{}", endpoint);
        assert_eq!(text, "10.0.1.7:1883");
    }

    #[test]
    fn test_session_defaults_match_firmware_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.client_id, "arduinoClient");
        assert_eq!(config.in_topic, "inTopic");
        assert_eq!(config.out_topic, "outTopic");
        assert_eq!(config.announce, b"hello world");
    }

    #[test]
    fn test_bootstrap_defaults_are_bounded() {
        let config = BootstrapConfig::default();
        assert!(config.dhcp_deadline > config.dhcp_poll_interval);
        assert!(config.address_deadline > config.address_poll_interval);
        assert_eq!(config.association_attempts, 1);
    }
}

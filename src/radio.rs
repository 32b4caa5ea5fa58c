//! # Radio Driver Abstraction
//!
//! This module defines the `RadioDriver` trait, the narrow contract the
//! bring-up sequence consumes from the WiFi radio driver. Association,
//! profile storage, and DHCP are the driver's business; this crate only
//! issues the calls and polls for completion.
//!
//! With the Rust 2024 Edition, this trait uses native `async fn`, removing
//! the need for the `#[async_trait]` macro.

use core::fmt;

use crate::config::Credentials;

/// The full address record the driver reports once DHCP has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressRecord {
    pub ip: [u8; 4],
    pub netmask: [u8; 4],
    pub gateway: [u8; 4],
    pub dhcp_server: [u8; 4],
    pub dns_server: [u8; 4],
}

struct Dotted([u8; 4]);

impl fmt::Display for Dotted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl fmt::Display for AddressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ip={} netmask={} gateway={} dhcp={} dns={}",
            Dotted(self.ip),
            Dotted(self.netmask),
            Dotted(self.gateway),
            Dotted(self.dhcp_server),
            Dotted(self.dns_server)
        )
    }
}

/// Radio firmware revision, reported for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A trait representing the WiFi radio driver.
///
/// The driver is fallible, synchronous in spirit, and polling-oriented:
/// `begin`, `delete_profiles`, and `connect_to_ap` complete (or fail) in one
/// call, while DHCP and the address record are observed by repeated polling.
#[allow(async_fn_in_trait)]
pub trait RadioDriver {
    /// The error type returned by the driver.
    type Error: core::fmt::Debug;

    /// Powers up and resets the radio.
    async fn begin(&mut self) -> Result<(), Self::Error>;

    /// Removes any persisted association profiles, so the credentials passed
    /// to [`connect_to_ap`](Self::connect_to_ap) are authoritative.
    async fn delete_profiles(&mut self) -> Result<(), Self::Error>;

    /// Joins the configured access point.
    async fn connect_to_ap(&mut self, credentials: &Credentials) -> Result<(), Self::Error>;

    /// Whether the DHCP lease has been obtained. Polled.
    fn dhcp_complete(&mut self) -> bool;

    /// The full address record, once the driver can report all of it. Polled.
    fn address_record(&mut self) -> Option<AddressRecord>;

    /// Radio firmware revision, for the diagnostic stream.
    fn firmware_version(&mut self) -> Result<FirmwareVersion, Self::Error>;

    /// Radio MAC address, for the diagnostic stream.
    fn mac_address(&mut self) -> Result<[u8; 6], Self::Error>;
}

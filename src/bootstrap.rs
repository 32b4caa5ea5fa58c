//! # Network Bring-up
//!
//! `NetworkBootstrap` drives the radio from power-on to a DHCP-bound address
//! record, one guarded stage at a time:
//!
//! ```text
//! Uninitialized -> RadioReady -> Associated -> DhcpBound
//! ```
//!
//! Stage failures fall into two classes. Radio init, profile reset, and
//! association failures are fatal: nothing network-shaped can work after
//! them, so the component reports [`BootstrapError::Fatal`] and the caller
//! turns that into a halt, a reboot, or an alert. DHCP and the address
//! record are pending states resolved by polling; each poll loop is bounded
//! by a deadline and reports [`BootstrapError::Timeout`] when it elapses,
//! leaving the retry policy to the caller.
//!
//! Bring-up blocks its caller by design: nothing useful can happen on this
//! class of device before the network is up.

use embassy_time::{Duration, Instant, Timer};
use log::{info, warn};

use crate::config::{BootstrapConfig, Credentials};
use crate::error::{BootstrapError, BootstrapStage};
use crate::radio::{AddressRecord, RadioDriver};
use crate::state::ConnectionState;

/// Bring-up state machine over a [`RadioDriver`].
pub struct NetworkBootstrap<R: RadioDriver> {
    radio: R,
    config: BootstrapConfig,
    state: ConnectionState,
}

impl<R: RadioDriver> NetworkBootstrap<R> {
    pub fn new(radio: R, config: BootstrapConfig) -> Self {
        Self {
            radio,
            config,
            state: ConnectionState::Uninitialized,
        }
    }

    /// The stage bring-up has reached so far.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Releases the radio driver, e.g. to hand it to a transport layer.
    pub fn into_radio(self) -> R {
        self.radio
    }

    /// Runs the full bring-up chain and returns the resolved address record.
    ///
    /// On failure the state is left at the last stage reached and no further
    /// driver calls are issued.
    pub async fn run(
        &mut self,
        credentials: &Credentials,
    ) -> Result<AddressRecord, BootstrapError<R::Error>> {
        self.init_radio().await?;
        self.clear_stored_profiles().await?;
        self.associate(credentials).await?;
        self.await_dhcp().await?;
        let record = self.await_address_record().await?;
        info!("network ready: {}", record);
        Ok(record)
    }

    /// Powers up and resets the radio. Fatal on failure.
    pub async fn init_radio(&mut self) -> Result<(), BootstrapError<R::Error>> {
        self.radio.begin().await.map_err(|source| BootstrapError::Fatal {
            stage: BootstrapStage::RadioInit,
            source,
        })?;
        match self.radio.firmware_version() {
            Ok(version) => info!("radio firmware {}", version),
            Err(e) => warn!("firmware version unavailable: {:?}", e),
        }
        match self.radio.mac_address() {
            Ok(mac) => info!(
                "radio MAC {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
            ),
            Err(e) => warn!("MAC address unavailable: {:?}", e),
        }
        self.state.advance(ConnectionState::RadioReady);
        Ok(())
    }

    /// Clears persisted association profiles so the explicit credentials are
    /// authoritative. Fatal on failure.
    pub async fn clear_stored_profiles(&mut self) -> Result<(), BootstrapError<R::Error>> {
        self.radio
            .delete_profiles()
            .await
            .map_err(|source| BootstrapError::Fatal {
                stage: BootstrapStage::ProfileReset,
                source,
            })
    }

    /// Joins the configured access point.
    ///
    /// With the default single attempt a refused join is immediately fatal;
    /// `BootstrapConfig::association_attempts` bounds how often the join is
    /// retried before that verdict.
    pub async fn associate(
        &mut self,
        credentials: &Credentials,
    ) -> Result<(), BootstrapError<R::Error>> {
        let attempts = self.config.association_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.radio.connect_to_ap(credentials).await {
                Ok(()) => {
                    info!("associated with {}", credentials.ssid);
                    self.state.advance(ConnectionState::Associated);
                    return Ok(());
                }
                Err(source) if attempt >= attempts => {
                    return Err(BootstrapError::Fatal {
                        stage: BootstrapStage::Association,
                        source,
                    });
                }
                Err(e) => {
                    warn!("association attempt {}/{} failed: {:?}", attempt, attempts, e);
                }
            }
        }
    }

    /// Polls the driver until the DHCP lease is reported, bounded by
    /// `dhcp_deadline`.
    pub async fn await_dhcp(&mut self) -> Result<(), BootstrapError<R::Error>> {
        let interval = self.config.dhcp_poll_interval;
        let deadline = self.config.dhcp_deadline;
        self.poll_stage(BootstrapStage::DhcpLease, interval, deadline, |radio| {
            radio.dhcp_complete().then_some(())
        })
        .await?;
        self.state.advance(ConnectionState::DhcpBound);
        Ok(())
    }

    /// Polls the driver until it reports the full address record, bounded by
    /// `address_deadline`.
    pub async fn await_address_record(
        &mut self,
    ) -> Result<AddressRecord, BootstrapError<R::Error>> {
        let interval = self.config.address_poll_interval;
        let deadline = self.config.address_deadline;
        self.poll_stage(BootstrapStage::AddressRecord, interval, deadline, |radio| {
            radio.address_record()
        })
        .await
    }

    async fn poll_stage<T>(
        &mut self,
        stage: BootstrapStage,
        interval: Duration,
        deadline: Duration,
        mut probe: impl FnMut(&mut R) -> Option<T>,
    ) -> Result<T, BootstrapError<R::Error>> {
        let started = Instant::now();
        loop {
            if let Some(value) = probe(&mut self.radio) {
                return Ok(value);
            }
            if started.elapsed() >= deadline {
                warn!("{} still pending after {} ms", stage.as_str(), deadline.as_millis());
                return Err(BootstrapError::Timeout { stage });
            }
            Timer::after(interval).await;
        }
    }
}

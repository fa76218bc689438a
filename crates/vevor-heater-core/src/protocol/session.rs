//! Command session
//!
//! Serializes commands over the half-duplex control characteristic and
//! pairs each one with the status notification that answers it.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    decode_status, encode_command, Command, OutgoingFrame, RequestType, SessionError, Transport,
    TransportError,
};
use crate::config::SessionConfig;
use crate::heater::{HeaterStatus, OperationalMode};

#[derive(Debug, Clone)]
struct Snapshot {
    status: HeaterStatus,
    received_at: DateTime<Utc>,
}

/// A heater reachable through a [`Transport`].
///
/// At most one command is in flight at a time. Callers that arrive while a
/// command is pending wait their turn (in arrival order) rather than
/// interleaving writes on the characteristic.
pub struct HeaterSession<T: Transport> {
    transport: T,
    /// Address the session expects the transport to be connected to
    address: String,
    config: SessionConfig,
    command_lock: tokio::sync::Mutex<()>,
    latest: Mutex<Option<Snapshot>>,
}

impl<T: Transport> HeaterSession<T> {
    /// Create a session. Without an address in `config` the transport's
    /// current address is adopted.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let address = config
            .address
            .clone()
            .unwrap_or_else(|| transport.address().to_string());

        Self {
            transport,
            address,
            config,
            command_lock: tokio::sync::Mutex::new(()),
            latest: Mutex::new(None),
        }
    }

    /// Address commands are checked against
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Session settings
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Control characteristic a transport implementation should open.
    /// Taken from [`SessionConfig::characteristic`].
    pub fn characteristic(&self) -> Uuid {
        self.config.characteristic
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Status from the most recent successful command
    pub fn latest_status(&self) -> Option<HeaterStatus> {
        self.snapshot().as_ref().map(|s| s.status.clone())
    }

    /// When the latest status was received
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshot().as_ref().map(|s| s.received_at)
    }

    /// Query the current status
    pub async fn refresh_status(&self) -> Result<HeaterStatus, SessionError> {
        self.send(Command::ReadStatus).await
    }

    /// Start the heater
    pub async fn turn_on(&self) -> Result<HeaterStatus, SessionError> {
        self.send(Command::TurnOn).await
    }

    /// Stop the heater. It reports a shutdown phase before powering off.
    pub async fn turn_off(&self) -> Result<HeaterStatus, SessionError> {
        self.send(Command::TurnOff).await
    }

    /// Switch to thermostat mode and set the target temperature (8-36 °C).
    ///
    /// Issued as two separate commands; another caller may get a command in
    /// between them.
    pub async fn set_target_temperature(&self, celsius: u8) -> Result<HeaterStatus, SessionError> {
        self.set_mode_and_target(OperationalMode::TargetTemperature, celsius)
            .await
    }

    /// Switch to power level mode and set the level (1-10).
    ///
    /// Issued as two separate commands, like [`Self::set_target_temperature`].
    pub async fn set_target_power_level(&self, level: u8) -> Result<HeaterStatus, SessionError> {
        self.set_mode_and_target(OperationalMode::PowerLevel, level)
            .await
    }

    async fn set_mode_and_target(
        &self,
        mode: OperationalMode,
        target: u8,
    ) -> Result<HeaterStatus, SessionError> {
        let range = mode.target_range();
        if !range.contains(&target) {
            return Err(SessionError::InvalidTarget {
                value: target,
                min: *range.start(),
                max: *range.end(),
            });
        }

        self.send(Command::SetOperationalMode(mode)).await?;
        self.send(Command::SetTarget(target)).await
    }

    /// Send a command and wait for the status notification answering it.
    ///
    /// Notifications that fail to decode, or that answer a different request
    /// type, are logged and skipped. The write and the wait together are
    /// bounded by [`SessionConfig::response_timeout`].
    pub async fn send(&self, command: Command) -> Result<HeaterStatus, SessionError> {
        self.check_address()?;

        let _guard = self.command_lock.lock().await;

        let frame = encode_command(command);
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        self.transport
            .subscribe(Box::new(move |data: &[u8]| {
                // Receiver is gone once the exchange has finished
                let _ = tx.send(data.to_vec());
            }))
            .await?;

        let outcome = self.exchange(command, &frame, &mut rx).await;

        if let Err(e) = self.transport.unsubscribe().await {
            warn!(address = %self.address, error = %e, "Failed to unsubscribe from notifications");
        }

        let status = outcome?;
        debug!(address = %self.address, ?command, ?status, "Command acknowledged");

        *self.snapshot() = Some(Snapshot {
            status: status.clone(),
            received_at: Utc::now(),
        });

        Ok(status)
    }

    async fn exchange(
        &self,
        command: Command,
        frame: &OutgoingFrame,
        rx: &mut UnboundedReceiver<Vec<u8>>,
    ) -> Result<HeaterStatus, SessionError> {
        let request_type = command.request_type();
        // Covers the write as well as the wait for the reply
        let round_trip = self.round_trip(command, frame, rx);

        match tokio::time::timeout(self.config.response_timeout(), round_trip).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    address = %self.address,
                    ?command,
                    timeout_ms = self.config.response_timeout_ms,
                    "No response from heater"
                );
                Err(SessionError::Timeout(request_type))
            }
        }
    }

    async fn round_trip(
        &self,
        command: Command,
        frame: &OutgoingFrame,
        rx: &mut UnboundedReceiver<Vec<u8>>,
    ) -> Result<HeaterStatus, SessionError> {
        debug!(
            address = %self.address,
            characteristic = %self.config.characteristic,
            ?command,
            frame = ?frame.as_bytes(),
            "Writing command frame"
        );
        self.transport.write(frame.as_ref()).await?;
        await_response(command.request_type(), rx).await
    }

    fn check_address(&self) -> Result<(), SessionError> {
        let actual = self.transport.address();
        if actual != self.address {
            return Err(SessionError::AddressMismatch {
                expected: self.address.clone(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    fn snapshot(&self) -> MutexGuard<'_, Option<Snapshot>> {
        // The snapshot is replaced wholesale, so a poisoned lock still holds
        // a consistent value
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Wait for the first valid notification answering `request_type`
async fn await_response(
    request_type: RequestType,
    rx: &mut UnboundedReceiver<Vec<u8>>,
) -> Result<HeaterStatus, SessionError> {
    loop {
        let data = rx.recv().await.ok_or(TransportError::Disconnected)?;

        match decode_status(&data) {
            Err(e) => {
                warn!(error = %e, data = ?data, "Discarding invalid status notification");
            }
            Ok(response) if !response.answers(request_type) => {
                warn!(
                    expected = request_type.as_raw(),
                    actual = response.request_type,
                    "Discarding response for a different request"
                );
            }
            Ok(response) => return Ok(response.status),
        }
    }
}

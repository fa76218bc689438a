//! Protocol errors

use std::fmt;

use thiserror::Error;

use super::commands::RequestType;

/// Status frame fields that are range-checked during decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusField {
    /// `request_type`, 1-4
    RequestType,
    /// `power_status`, 0-2
    PowerStatus,
    /// `error`, 0-10
    Error,
    /// `operational_status`, 0-4
    OperationalStatus,
    /// `operational_mode`, 0-2
    OperationalMode,
    /// `target_temperature_or_level`, range depends on the mode
    TargetTemperatureOrLevel,
    /// `current_power_level`, 0-9 in thermostat mode
    CurrentPowerLevel,
    /// `display_error`, 0-10
    DisplayError,
}

impl StatusField {
    /// Wire name of the field
    pub fn name(&self) -> &'static str {
        match self {
            StatusField::RequestType => "request_type",
            StatusField::PowerStatus => "power_status",
            StatusField::Error => "error",
            StatusField::OperationalStatus => "operational_status",
            StatusField::OperationalMode => "operational_mode",
            StatusField::TargetTemperatureOrLevel => "target_temperature_or_level",
            StatusField::CurrentPowerLevel => "current_power_level",
            StatusField::DisplayError => "display_error",
        }
    }
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while decoding a frame received from (or destined for) the heater
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is not the size its kind requires
    #[error("Bad frame length: expected {expected} bytes, got {actual}")]
    BadLength {
        /// Required length
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// Command frame does not start with the fixed header
    #[error("Bad frame header: {0:02X?}")]
    BadHeader([u8; 4]),

    /// A field failed its range check
    #[error("Field out of range: {0}")]
    FieldOutOfRange(StatusField),

    /// Carried checksum differs from the computed one
    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Computed checksum
        expected: u8,
        /// Checksum found in the frame
        actual: u8,
    },

    /// Command frame carries an unknown request type
    #[error("Unknown request type: {0}")]
    UnknownRequestType(u8),

    /// Mode command carries an unknown mode
    #[error("Unknown operational mode: {0}")]
    UnknownMode(u8),
}

/// Errors reported by a [`Transport`](super::Transport) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No link to the heater
    #[error("Not connected to heater")]
    NotConnected,

    /// Writing the command frame failed
    #[error("Characteristic write failed: {0}")]
    Write(String),

    /// Enabling notifications failed
    #[error("Failed to subscribe to notifications: {0}")]
    Subscribe(String),

    /// Disabling notifications failed
    #[error("Failed to unsubscribe from notifications: {0}")]
    Unsubscribe(String),

    /// Notifications stopped while a reply was awaited
    #[error("Notification stream closed")]
    Disconnected,
}

/// Errors surfaced to callers of [`HeaterSession`](super::HeaterSession)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The transport reported an error
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// No matching reply arrived in time
    #[error("Timed out waiting for a response to {0:?}")]
    Timeout(RequestType),

    /// Transport is connected to a different heater
    #[error("Device address mismatch: expected '{expected}', got '{actual}'")]
    AddressMismatch {
        /// Address the session was configured for
        expected: String,
        /// Address the transport reports
        actual: String,
    },

    /// Requested target is outside the mode's range
    #[error("Target {value} out of range {min}..={max}")]
    InvalidTarget {
        /// Requested value
        value: u8,
        /// Lowest accepted value
        min: u8,
        /// Highest accepted value
        max: u8,
    },
}

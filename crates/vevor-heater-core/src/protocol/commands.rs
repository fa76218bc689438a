//! Protocol commands
//!
//! Defines the commands understood by the heater's control characteristic.

use serde::{Deserialize, Serialize};

use crate::heater::OperationalMode;

/// Request type tag carried by both command and status frames.
///
/// The heater echoes the tag of the command it is answering, which is how
/// a notification is matched to the request that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestType {
    /// Status query
    ReadStatus = 1,
    /// Regulation mode change
    SetOperationalMode = 2,
    /// Start or stop, distinguished by the parameter byte
    TurnOnOff = 3,
    /// Target temperature or power level
    SetTarget = 4,
}

impl RequestType {
    /// Convert from the wire value
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(RequestType::ReadStatus),
            2 => Some(RequestType::SetOperationalMode),
            3 => Some(RequestType::TurnOnOff),
            4 => Some(RequestType::SetTarget),
            _ => None,
        }
    }

    /// Convert to the wire value
    pub fn as_raw(&self) -> u8 {
        *self as u8
    }
}

/// Commands that can be sent to the heater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Query current status
    ReadStatus,

    /// Switch between power level and thermostat regulation
    SetOperationalMode(OperationalMode),

    /// Set the target for the current mode (power level or °C)
    SetTarget(u8),

    /// Start the heater
    TurnOn,

    /// Stop the heater
    TurnOff,
}

impl Command {
    /// Request type tag for this command
    pub fn request_type(&self) -> RequestType {
        match self {
            Command::ReadStatus => RequestType::ReadStatus,
            Command::SetOperationalMode(_) => RequestType::SetOperationalMode,
            Command::TurnOn | Command::TurnOff => RequestType::TurnOnOff,
            Command::SetTarget(_) => RequestType::SetTarget,
        }
    }

    /// Parameter byte for this command
    pub fn param(&self) -> u8 {
        match self {
            Command::ReadStatus => 0,
            Command::SetOperationalMode(mode) => mode.as_raw(),
            Command::TurnOn => 1,
            Command::TurnOff => 0,
            Command::SetTarget(value) => *value,
        }
    }
}

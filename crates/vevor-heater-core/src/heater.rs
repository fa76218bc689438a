//! Heater domain model
//!
//! Validated, typed view of the heater state. Values here are only ever
//! produced by [`decode_status`](crate::protocol::decode_status), so every
//! enum is closed: raw bytes that do not map onto a variant are rejected at
//! decode time instead of being coerced.

use serde::{Deserialize, Serialize};

/// Whether the heater is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerStatus {
    /// Powered off; no other fields are reported
    Off,
    /// Running normally
    Running,
    /// Stopped on a fault
    Error,
}

impl PowerStatus {
    /// Convert from the wire value
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(PowerStatus::Off),
            1 => Some(PowerStatus::Running),
            2 => Some(PowerStatus::Error),
            _ => None,
        }
    }
}

/// Phase of the combustion cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationalStatus {
    /// Glow plug preheating
    Warmup,
    /// Startup self test
    SelfTestRunning,
    /// Igniting the fuel
    Ignition,
    /// Steady combustion
    Heating,
    /// Cooling down after a stop
    ShuttingDown,
}

impl OperationalStatus {
    /// Convert from the wire value
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(OperationalStatus::Warmup),
            1 => Some(OperationalStatus::SelfTestRunning),
            2 => Some(OperationalStatus::Ignition),
            3 => Some(OperationalStatus::Heating),
            4 => Some(OperationalStatus::ShuttingDown),
            _ => None,
        }
    }

    /// Convert to the wire value
    pub fn as_raw(&self) -> u8 {
        *self as u8
    }
}

/// How the heater output is regulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperationalMode {
    /// Fixed power level, 1-10
    PowerLevel = 1,
    /// Thermostat, 8-36 °C
    TargetTemperature = 2,
}

impl OperationalMode {
    /// Map a wire value to a mode. `0` ("no mode") maps to `None` as well,
    /// callers that need to distinguish it check the raw value first.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(OperationalMode::PowerLevel),
            2 => Some(OperationalMode::TargetTemperature),
            _ => None,
        }
    }

    /// Convert to the wire value
    pub fn as_raw(&self) -> u8 {
        *self as u8
    }

    /// Accepted range for the target value in this mode
    pub fn target_range(&self) -> std::ops::RangeInclusive<u8> {
        match self {
            OperationalMode::PowerLevel => 1..=10,
            OperationalMode::TargetTemperature => 8..=36,
        }
    }
}

/// Fault reported on the heater's display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaterError {
    /// No fault
    NoError,
    /// E01
    PowerSupplyUndervoltage,
    /// E02
    PowerSupplyOvervoltage,
    /// E03
    IgnitionCoilFailure,
    /// E04
    FuelPumpFailure,
    /// E05
    HighTemperatureAlarm,
    /// E06
    FanFailure,
    /// E07
    CableDamage,
    /// E08
    CombustionFailure,
    /// E09
    SensorFailure,
    /// E10
    IgnitionFailure,
}

impl HeaterError {
    /// Convert from the display error code
    pub fn from_raw(raw: u8) -> Option<Self> {
        let error = match raw {
            0 => HeaterError::NoError,
            1 => HeaterError::PowerSupplyUndervoltage,
            2 => HeaterError::PowerSupplyOvervoltage,
            3 => HeaterError::IgnitionCoilFailure,
            4 => HeaterError::FuelPumpFailure,
            5 => HeaterError::HighTemperatureAlarm,
            6 => HeaterError::FanFailure,
            7 => HeaterError::CableDamage,
            8 => HeaterError::CombustionFailure,
            9 => HeaterError::SensorFailure,
            10 => HeaterError::IgnitionFailure,
            _ => return None,
        };
        Some(error)
    }

    /// Display error code
    pub fn as_raw(&self) -> u8 {
        *self as u8
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            HeaterError::NoError => "No error",
            HeaterError::PowerSupplyUndervoltage => "Power supply undervoltage",
            HeaterError::PowerSupplyOvervoltage => "Power supply overvoltage",
            HeaterError::IgnitionCoilFailure => "Ignition coil failure",
            HeaterError::FuelPumpFailure => "Fuel pump failure",
            HeaterError::HighTemperatureAlarm => "High temperature alarm",
            HeaterError::FanFailure => "Fan failure",
            HeaterError::CableDamage => "Cable damage",
            HeaterError::CombustionFailure => "Combustion failure",
            HeaterError::SensorFailure => "Sensor failure",
            HeaterError::IgnitionFailure => "Ignition failure",
        }
    }
}

/// Last known state of the heater.
///
/// Either fully populated from a validated status frame, or the
/// [`HeaterStatus::off`] sentinel where only `power_status` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaterStatus {
    /// Always set, including for the off sentinel
    pub power_status: PowerStatus,
    /// `None` when powered off or when the heater reports no mode
    pub operational_mode: Option<OperationalMode>,
    /// Start/stop phase
    pub operational_status: Option<OperationalStatus>,
    /// Meters above sea level
    pub elevation: Option<f32>,
    /// °C, only set in [`OperationalMode::TargetTemperature`]
    pub target_temperature: Option<u8>,
    /// Only set in [`OperationalMode::PowerLevel`]
    pub target_power_level: Option<u8>,
    /// Level the heater is burning at, 1-10
    pub current_power_level: Option<u8>,
    /// Volts
    pub input_voltage: Option<f32>,
    /// Raw device units
    pub combustion_temperature: Option<u16>,
    /// Raw device units
    pub room_temperature: Option<u16>,
    /// Fault shown on the display
    pub error: Option<HeaterError>,
}

impl HeaterStatus {
    /// The powered-off sentinel
    pub fn off() -> Self {
        Self {
            power_status: PowerStatus::Off,
            operational_mode: None,
            operational_status: None,
            elevation: None,
            target_temperature: None,
            target_power_level: None,
            current_power_level: None,
            input_voltage: None,
            combustion_temperature: None,
            room_temperature: None,
            error: None,
        }
    }

    /// Whether the heater reported itself powered off
    pub fn is_off(&self) -> bool {
        self.power_status == PowerStatus::Off
    }

    /// Whether the heater is running without a fault
    pub fn is_running(&self) -> bool {
        self.power_status == PowerStatus::Running
    }
}

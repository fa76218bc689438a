//! Status frame decoding
//!
//! Every command is answered with a status notification (20 bytes,
//! little-endian):
//!
//! ```text
//! off  size field
//!  0    2   magic (AA 55)
//!  2    1   request_type
//!  3    1   power_status
//!  4    1   error
//!  5    1   operational_status
//!  6    2   elevation
//!  8    1   operational_mode
//!  9    1   target_temperature_or_level
//! 10    1   current_power_level
//! 11    2   input_voltage_decivolts
//! 13    2   combustion_temperature
//! 15    2   room_temperature
//! 17    1   display_error
//! 18    1   padding
//! 19    1   checksum
//! ```
//!
//! The checksum is the sum of the integer values of every field from
//! `power_status` through `display_error`, mod 256.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::{DecodeError, RequestType, StatusField, STATUS_FRAME_LEN, STATUS_MAGIC};
use crate::heater::{HeaterError, HeaterStatus, OperationalMode, OperationalStatus, PowerStatus};

/// Status frame fields exactly as they appear on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawStatusFrame {
    /// Frame marker, `AA 55` on the wire
    pub magic: u16,
    /// Tag of the command being answered
    pub request_type: u8,
    /// 0 off, 1 running, 2 error
    pub power_status: u8,
    /// Raw error byte; the reported error comes from `display_error`
    pub error: u8,
    /// Start/stop phase
    pub operational_status: u8,
    /// Elevation in meters
    pub elevation: u16,
    /// 1 power level, 2 thermostat
    pub operational_mode: u8,
    /// Target for the current mode
    pub target_temperature_or_level: u8,
    /// 0-based level, meaningful in thermostat mode only
    pub current_power_level: u8,
    /// Supply voltage in tenths of a volt
    pub input_voltage_decivolts: u16,
    /// Raw device units
    pub combustion_temperature: u16,
    /// Raw device units
    pub room_temperature: u16,
    /// Error code shown on the heater panel
    pub display_error: u8,
    /// Unused, excluded from the checksum
    pub padding: u8,
    /// Sum of the field values mod 256
    pub checksum: u8,
}

impl RawStatusFrame {
    /// Split a notification payload into fields. Only the length is checked.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() != STATUS_FRAME_LEN {
            return Err(DecodeError::BadLength {
                expected: STATUS_FRAME_LEN,
                actual: data.len(),
            });
        }

        Ok(Self {
            magic: LittleEndian::read_u16(&data[0..2]),
            request_type: data[2],
            power_status: data[3],
            error: data[4],
            operational_status: data[5],
            elevation: LittleEndian::read_u16(&data[6..8]),
            operational_mode: data[8],
            target_temperature_or_level: data[9],
            current_power_level: data[10],
            input_voltage_decivolts: LittleEndian::read_u16(&data[11..13]),
            combustion_temperature: LittleEndian::read_u16(&data[13..15]),
            room_temperature: LittleEndian::read_u16(&data[15..17]),
            display_error: data[17],
            padding: data[18],
            checksum: data[19],
        })
    }

    /// Serialize the fields, including whatever checksum is currently set
    pub fn to_bytes(&self) -> [u8; STATUS_FRAME_LEN] {
        let mut data = [0u8; STATUS_FRAME_LEN];
        LittleEndian::write_u16(&mut data[0..2], self.magic);
        data[2] = self.request_type;
        data[3] = self.power_status;
        data[4] = self.error;
        data[5] = self.operational_status;
        LittleEndian::write_u16(&mut data[6..8], self.elevation);
        data[8] = self.operational_mode;
        data[9] = self.target_temperature_or_level;
        data[10] = self.current_power_level;
        LittleEndian::write_u16(&mut data[11..13], self.input_voltage_decivolts);
        LittleEndian::write_u16(&mut data[13..15], self.combustion_temperature);
        LittleEndian::write_u16(&mut data[15..17], self.room_temperature);
        data[17] = self.display_error;
        data[18] = self.padding;
        data[19] = self.checksum;
        data
    }

    /// Copy of this frame with the magic and checksum filled in
    pub fn sealed(mut self) -> Self {
        self.magic = STATUS_MAGIC;
        self.checksum = self.calculate_checksum();
        self
    }

    /// Checksum over the field values, as the heater computes it
    pub fn calculate_checksum(&self) -> u8 {
        let sum: u32 = [
            self.power_status as u32,
            self.error as u32,
            self.operational_status as u32,
            self.elevation as u32,
            self.operational_mode as u32,
            self.target_temperature_or_level as u32,
            self.current_power_level as u32,
            self.input_voltage_decivolts as u32,
            self.combustion_temperature as u32,
            self.room_temperature as u32,
            self.display_error as u32,
        ]
        .iter()
        .sum();
        (sum % 256) as u8
    }

    /// Compare the carried checksum with [`Self::calculate_checksum`]
    pub fn verify_checksum(&self) -> Result<(), DecodeError> {
        let expected = self.calculate_checksum();
        if expected != self.checksum {
            return Err(DecodeError::ChecksumMismatch {
                expected,
                actual: self.checksum,
            });
        }
        Ok(())
    }

    /// Range-check fields against known firmware limits, stopping at the
    /// first violation.
    pub fn validate(&self) -> Result<(), DecodeError> {
        check(
            (1..=4).contains(&self.request_type),
            StatusField::RequestType,
        )?;
        check(self.power_status <= 2, StatusField::PowerStatus)?;
        check(self.error <= 10, StatusField::Error)?;
        check(self.operational_status <= 4, StatusField::OperationalStatus)?;
        check(self.operational_mode <= 2, StatusField::OperationalMode)?;

        let target_ok = match OperationalMode::from_raw(self.operational_mode) {
            Some(mode) => mode.target_range().contains(&self.target_temperature_or_level),
            None => self.target_temperature_or_level == 0,
        };
        check(target_ok, StatusField::TargetTemperatureOrLevel)?;

        if self.operational_mode == OperationalMode::TargetTemperature.as_raw() {
            check(self.current_power_level <= 9, StatusField::CurrentPowerLevel)?;
        }
        check(self.display_error <= 10, StatusField::DisplayError)?;

        Ok(())
    }

    /// Map onto the domain model. Powered-off frames become the
    /// [`HeaterStatus::off`] sentinel without looking at the other fields.
    fn to_status(&self) -> Result<HeaterStatus, DecodeError> {
        if self.power_status == 0 {
            return Ok(HeaterStatus::off());
        }

        // Only reached after validate(), so these mappings always succeed
        let power_status = PowerStatus::from_raw(self.power_status)
            .ok_or(DecodeError::FieldOutOfRange(StatusField::PowerStatus))?;
        let operational_status = OperationalStatus::from_raw(self.operational_status)
            .ok_or(DecodeError::FieldOutOfRange(StatusField::OperationalStatus))?;
        let error = HeaterError::from_raw(self.display_error)
            .ok_or(DecodeError::FieldOutOfRange(StatusField::DisplayError))?;

        let mode = OperationalMode::from_raw(self.operational_mode);
        let target = self.target_temperature_or_level;

        // The heater reports a 0-based level in thermostat mode only; in
        // power level mode the commanded level is reported back instead.
        let current_power_level = match mode {
            Some(OperationalMode::TargetTemperature) => self.current_power_level + 1,
            _ => target,
        };

        Ok(HeaterStatus {
            power_status,
            operational_mode: mode,
            operational_status: Some(operational_status),
            elevation: Some(self.elevation as f32),
            target_temperature: (mode == Some(OperationalMode::TargetTemperature))
                .then_some(target),
            target_power_level: (mode == Some(OperationalMode::PowerLevel)).then_some(target),
            current_power_level: Some(current_power_level),
            input_voltage: Some(self.input_voltage_decivolts as f32 / 10.0),
            combustion_temperature: Some(self.combustion_temperature),
            room_temperature: Some(self.room_temperature),
            error: Some(error),
        })
    }
}

fn check(ok: bool, field: StatusField) -> Result<(), DecodeError> {
    if ok {
        Ok(())
    } else {
        Err(DecodeError::FieldOutOfRange(field))
    }
}

/// A decoded status notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Request type echoed by the heater. Not range-checked for powered-off frames.
    pub request_type: u8,
    /// Decoded status, or the off sentinel
    pub status: HeaterStatus,
}

impl StatusResponse {
    /// Whether this notification answers a request of the given type
    pub fn answers(&self, request_type: RequestType) -> bool {
        self.request_type == request_type.as_raw()
    }
}

/// Decode and validate a status notification.
///
/// Powered-off frames skip the range checks (the heater leaves stale bytes
/// in them), but the checksum is always verified.
pub fn decode_status(data: &[u8]) -> Result<StatusResponse, DecodeError> {
    let raw = RawStatusFrame::from_bytes(data)?;

    if raw.power_status != 0 {
        raw.validate()?;
    }
    raw.verify_checksum()?;

    Ok(StatusResponse {
        request_type: raw.request_type,
        status: raw.to_status()?,
    })
}

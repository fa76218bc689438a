//! Command frame encoding/decoding
//!
//! Frame format (8 bytes, host to heater):
//! - 4 bytes: header `AA 55 0C 22`
//! - 1 byte: request type
//! - 1 byte: parameter
//! - 1 byte: reserved, always 0
//! - 1 byte: checksum, sum of bytes 2..7 mod 256

use super::{Command, DecodeError, RequestType, COMMAND_FRAME_LEN, FRAME_HEADER};
use crate::heater::OperationalMode;

/// An encoded command frame, ready to be written to the characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutgoingFrame {
    bytes: [u8; COMMAND_FRAME_LEN],
}

impl OutgoingFrame {
    /// Build a frame from a raw request type and parameter
    pub fn new(request_type: u8, param: u8) -> Self {
        let mut bytes = [0u8; COMMAND_FRAME_LEN];
        bytes[..4].copy_from_slice(&FRAME_HEADER);
        bytes[4] = request_type;
        bytes[5] = param;
        bytes[7] = command_checksum(&bytes);
        Self { bytes }
    }

    /// Decode a command frame back into the command it carries
    pub fn parse(data: &[u8]) -> Result<Command, DecodeError> {
        if data.len() != COMMAND_FRAME_LEN {
            return Err(DecodeError::BadLength {
                expected: COMMAND_FRAME_LEN,
                actual: data.len(),
            });
        }

        let mut header = [0u8; 4];
        header.copy_from_slice(&data[..4]);
        if header != FRAME_HEADER {
            return Err(DecodeError::BadHeader(header));
        }

        let expected = command_checksum(data);
        if data[7] != expected {
            return Err(DecodeError::ChecksumMismatch {
                expected,
                actual: data[7],
            });
        }

        let param = data[5];
        let command = match RequestType::from_raw(data[4]) {
            Some(RequestType::ReadStatus) => Command::ReadStatus,
            Some(RequestType::SetOperationalMode) => Command::SetOperationalMode(
                OperationalMode::from_raw(param).ok_or(DecodeError::UnknownMode(param))?,
            ),
            Some(RequestType::TurnOnOff) if param == 0 => Command::TurnOff,
            Some(RequestType::TurnOnOff) => Command::TurnOn,
            Some(RequestType::SetTarget) => Command::SetTarget(param),
            None => return Err(DecodeError::UnknownRequestType(data[4])),
        };

        Ok(command)
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8; COMMAND_FRAME_LEN] {
        &self.bytes
    }

    /// Request type byte
    pub fn request_type(&self) -> u8 {
        self.bytes[4]
    }

    /// Parameter byte
    pub fn param(&self) -> u8 {
        self.bytes[5]
    }

    /// Checksum byte
    pub fn checksum(&self) -> u8 {
        self.bytes[7]
    }
}

impl AsRef<[u8]> for OutgoingFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encode a command into its wire frame
pub fn encode_command(command: Command) -> OutgoingFrame {
    OutgoingFrame::new(command.request_type().as_raw(), command.param())
}

/// Sum of bytes 2..7 mod 256
fn command_checksum(bytes: &[u8]) -> u8 {
    bytes[2..7].iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

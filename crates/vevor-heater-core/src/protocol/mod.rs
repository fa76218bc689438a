//! BLE Protocol Communication
//!
//! Implements the command/status protocol spoken over the heater's control
//! characteristic: 8-byte command frames out, 20-byte status notifications
//! back, both protected by a mod-256 checksum.

pub mod commands;
mod error;
mod packet;
mod session;
mod status;
mod transport;

use uuid::Uuid;

pub use commands::{Command, RequestType};
pub use error::{DecodeError, SessionError, StatusField, TransportError};
pub use packet::{encode_command, OutgoingFrame};
pub use session::HeaterSession;
pub use status::{decode_status, RawStatusFrame, StatusResponse};
pub use transport::{NotificationHandler, Transport};

/// GATT characteristic used for both command writes and status notifications
pub const HEATER_CONTROL_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x0000ffe1_0000_1000_8000_00805f9b34fb);

/// Leading bytes of every command frame
pub const FRAME_HEADER: [u8; 4] = [0xAA, 0x55, 0x0C, 0x22];

/// Size of a command frame
pub const COMMAND_FRAME_LEN: usize = 8;

/// Size of a status notification
pub const STATUS_FRAME_LEN: usize = 20;

/// Leading `AA 55` of a status notification, read little-endian
pub const STATUS_MAGIC: u16 = 0x55AA;

/// Default time to wait for a matching status notification, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

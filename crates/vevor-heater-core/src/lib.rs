//! # Vevor Heater Core Library
//!
//! Protocol engine for diesel air heaters controlled over Bluetooth Low Energy.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Command frame encoding and status frame decoding/validation
//! - A command session that serializes commands over the shared GATT
//!   characteristic and matches each one to its status notification
//! - Session configuration
//! - A simulated heater for demos and tests
//!
//! BLE discovery and connection handling are left to the caller, who plugs
//! a connected characteristic in through [`protocol::Transport`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use vevor_heater_core::{config::SessionConfig, protocol::HeaterSession};
//!
//! // `transport` is any connected protocol::Transport implementation
//! let session = HeaterSession::new(transport, SessionConfig::for_address("AA:BB:CC:DD:EE:FF"));
//!
//! session.turn_on().await?;
//! let status = session.set_target_temperature(21).await?;
//! println!("Room: {:?}", status.room_temperature);
//! ```

pub mod config;
pub mod demo;
pub mod heater;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::heater::{
        HeaterError, HeaterStatus, OperationalMode, OperationalStatus, PowerStatus,
    };
    pub use crate::protocol::{
        decode_status, encode_command, Command, DecodeError, HeaterSession, SessionError,
        Transport, TransportError,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

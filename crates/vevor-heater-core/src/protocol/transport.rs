//! Transport abstraction
//!
//! The heater is driven through a single GATT characteristic that accepts
//! writes and emits notifications. Discovery, connection setup and
//! reconnects belong to whoever implements this trait; the session only
//! writes frames and listens for replies.

use std::future::Future;

use super::TransportError;

/// Callback invoked with the payload of every notification
pub type NotificationHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Write/notify access to the heater's control characteristic
pub trait Transport: Send + Sync {
    /// Address of the device this transport is connected to
    fn address(&self) -> &str;

    /// Write a command frame to the characteristic
    fn write(&self, frame: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Start delivering notifications to `handler`, replacing any previous handler
    fn subscribe(
        &self,
        handler: NotificationHandler,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Stop delivering notifications and drop the current handler
    fn unsubscribe(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

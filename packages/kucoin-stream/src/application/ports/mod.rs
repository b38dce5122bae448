//! Port Interfaces
//!
//! Contracts between this crate and the external socket-client collaborator
//! that owns the connection lifecycle (transport, authentication signing,
//! heartbeats, reconnection/backoff).
//!
//! ## Driven Port (Outbound)
//!
//! - [`StreamTransport`]: delivery of subscribe/unsubscribe requests.
//!
//! ## Driver Side (Inbound)
//!
//! The transport integration feeds frames and connection-state changes back
//! through `KucoinStreamClient::handle_frame` and
//! `KucoinStreamClient::handle_connection_event`; there is no trait to
//! implement for the inbound direction.

use async_trait::async_trait;

use crate::domain::subscription::SubscribeRequest;

/// Transport-level failures reported by the external collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The transport is not currently connected.
    #[error("transport not connected")]
    NotConnected,

    /// The request could not be delivered.
    #[error("transport send failed: {0}")]
    SendFailed(String),
}

/// Outbound port for subscribe/unsubscribe requests.
///
/// Implementations serialize the request onto the socket and report delivery
/// failure; acknowledgement arrives asynchronously as an inbound frame.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Deliver one request to the exchange.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when delivery fails; the caller rolls
    /// back any registration tied to the request.
    async fn send(&self, request: SubscribeRequest) -> Result<(), TransportError>;
}

/// Connection-state notifications from the external transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Initial connection established.
    Connected,
    /// Connection lost; the transport will attempt to reconnect.
    Disconnected,
    /// Connection re-established; active subscriptions must be re-issued.
    Reconnected,
}

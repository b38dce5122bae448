#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! KuCoin Stream - Typed Subscription SDK
//!
//! Translates KuCoin's spot and futures WebSocket push messages into
//! strongly-typed events and routes them to caller-supplied handlers. The
//! connection lifecycle (socket transport, authentication signing,
//! heartbeats, reconnection/backoff) belongs to an external collaborator
//! behind the [`application::ports::StreamTransport`] port; this crate owns
//! the subscribe/dispatch mapping and nothing below it.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Topics, the subscription registry, and dispatch tables
//!   - `topic`: stream keys and wire-topic composition
//!   - `subscription`: registry, correlation ids, subscribe requests
//!   - `event`: push envelopes, typed events, discriminator routing
//!
//! - **Application**: Ports and services
//!   - `ports`: the outbound transport contract
//!   - `services`: the typed dispatcher and the spot/futures facades
//!
//! - **Infrastructure**: Exchange wire formats and configuration
//!   - `kucoin`: frame decoding and typed push message models
//!   - `config`: credentials and client options
//!
//! # Data Flow
//!
//! ```text
//! caller ──► facade ──► registry ──► subscribe request ──► transport
//!                                                             │
//! handler ◄── dispatch table ◄── dispatcher ◄── decoder ◄── frames
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Topics, subscriptions, and dispatch tables.
pub mod domain;

/// Application layer - Ports and subscription services.
pub mod application;

/// Infrastructure layer - Wire formats and configuration.
pub mod infrastructure;

/// The stream client and subscription handles.
pub mod client;

// =============================================================================
// Re-exports
// =============================================================================

// Client surface
pub use client::{KucoinStreamClient, SubscribeError, SubscriptionHandle};

// Domain types
pub use domain::event::{DispatchTable, PushEnvelope, StreamEvent};
pub use domain::subscription::{
    RegistryError, RequestAction, SubscribeRequest, SubscriptionId, SubscriptionRegistry,
};
pub use domain::topic::Topic;

// Ports
pub use application::ports::{ConnectionEvent, StreamTransport, TransportError};

// Facades
pub use application::services::{FuturesStreams, PARTIAL_DEPTH_LIMITS, SpotStreams};

// Configuration
pub use infrastructure::config::{ClientOptions, ConfigError, Credentials};

//! Application layer - Ports and subscription services.

/// Port definitions for the external transport collaborator.
pub mod ports;

/// Dispatcher and subscription facades.
pub mod services;

//! HTTP-to-message relay for the avatar API.
//!
//! Inbound gateway events are routed by method and resource segment to an
//! operation, which either answers directly or produces a message that is
//! published to the bus.

pub mod api_connector;
pub mod config;
pub mod error_handler;
pub mod services;

//! The transport-facing protocol layer.
//!
//! The engine is transport-agnostic: it consumes [`messages::ClientEvent`]s
//! and emits [`messages::ServerEvent`]s, and a front end (WebSocket, TCP,
//! an in-process test harness) moves them. Hidden-card masking is already
//! applied by the time a snapshot reaches this layer.

/// Message types for client-server communication.
pub mod messages;

//! Encoder sessions: configuration, staging-buffer lifetimes and the encode loop.

/// Session and engine configuration.
pub mod config;
/// The encoder session state machine.
pub mod encoder_session;

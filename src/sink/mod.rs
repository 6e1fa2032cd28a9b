//! Output side of an encoder session.
//!
//! The engine streams compressed bytes into a [`BitstreamSink`](bitstream::BitstreamSink) through
//! the [`WriteCallback`](crate::engine::WriteCallback) interface, seeking back whenever a container
//! header has to be patched.

/// Growable, seekable in-memory bitstream store.
pub mod bitstream;

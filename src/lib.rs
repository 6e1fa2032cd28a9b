//! Host-side runtime for pixel-to-bitstream video encoders.
//!
//! The crate owns everything around an encoder engine except the compression itself:
//!
//! - a growable, seekable [`BitstreamSink`] the engine streams its container into
//! - an [`EncoderSession`] that tracks the engine's staging buffers and lifecycle
//! - a [`PipelineCoordinator`] that moves frames from a capture thread to an encode thread
//!   without copying them
//!
//! [`ReferenceEngine`] is a small lossless engine written in Rust, so all of the above can be
//! used and tested without a native codec.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Engine boundary, engine memory and the reference engine.
pub mod engine;
/// Cross-thread capture/encode pipeline.
pub mod pipeline;
/// Encoder sessions and configuration.
pub mod session;
/// Encoded output storage.
pub mod sink;
/// Frame sources.
pub mod source;

pub use crate::foundation::error::{EncoderError, EncoderResult};

pub use crate::engine::memory::{LentRegion, LinearMemory, MemPtr};
pub use crate::engine::reference::{ReferenceContainer, ReferenceEngine, StreamHeader};
pub use crate::engine::{EncoderHandle, Engine, WriteCallback};
pub use crate::pipeline::{PipelineCoordinator, PipelineOpts, TransferMode};
pub use crate::session::config::{EncoderConfig, EngineConfig};
pub use crate::session::encoder_session::{EncoderSession, SessionState, SessionStats};
pub use crate::sink::bitstream::BitstreamSink;
pub use crate::source::sequence::ImageSequence;
pub use crate::source::sketch::RadialSketch;
pub use crate::source::{FrameSource, encode_with_pipeline, encode_with_session};

//! Cross-thread encode pipeline.
//!
//! A producer (frame capture) and a consumer (encoding) run on separate threads and talk only
//! through two typed channels. The handshake is:
//!
//! ```text
//! producer                              consumer
//!                       <- Ready         engine initialized
//! Start { config, mode } ->
//!                       <- Started       shared mode: carries the frame region
//! Frame { index, .. }   ->               encode synchronously
//!                       <- Consumed      shared mode only: hands the region back
//!   ... one Frame per captured frame ...
//! Finish                ->
//!                       <- End(bytes)    session ended; bytes now belong to the producer
//! ```
//!
//! In [`TransferMode::Shared`] the staging region itself travels inside the messages, so the
//! producer cannot touch it while the consumer is encoding from it. Any consumer-side error is
//! reported as [`ConsumerMsg::Failed`] and stops the consumer.

/// Consumer side: owns the session and answers producer messages.
pub mod consumer;
/// Producer side: spawns the consumer and drives the handshake.
pub mod coordinator;
/// Message types and transfer modes.
pub mod protocol;

pub use coordinator::{PipelineCoordinator, PipelineOpts};
pub use protocol::{ConsumerMsg, FramePayload, ProducerMsg, TransferMode};

use crate::engine::memory::LentRegion;
use crate::foundation::error::EncoderError;
use crate::session::config::EncoderConfig;

/// How frame bytes reach the consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferMode {
    /// One staging region in engine memory is passed back and forth; no per-frame allocation
    /// and no copy between threads.
    #[default]
    Shared,
    /// Every frame is a freshly allocated buffer; the consumer never acknowledges.
    Owned,
}

/// Frame bytes attached to [`ProducerMsg::Frame`].
#[derive(Debug)]
pub enum FramePayload {
    /// The session's RGB staging region, filled in place.
    Shared(LentRegion),
    /// A standalone copy of the frame.
    Owned(Vec<u8>),
}

/// Messages sent by the producer.
#[derive(Debug)]
pub enum ProducerMsg {
    /// Create the session. Only valid once, after `Ready`.
    Start {
        /// Session configuration.
        config: EncoderConfig,
        /// Transfer mode for every following frame.
        mode: TransferMode,
    },
    /// Encode one frame. Indices start at 0 and increase by one.
    Frame {
        /// Frame index.
        index: u64,
        /// Frame bytes.
        payload: FramePayload,
    },
    /// End the session. In shared mode the region is handed back here.
    Finish {
        /// The staging region, when the producer holds it.
        region: Option<LentRegion>,
    },
}

/// Messages sent by the consumer.
#[derive(Debug)]
pub enum ConsumerMsg {
    /// Engine is initialized.
    Ready,
    /// Session exists; shared mode attaches the frame region.
    Started {
        /// The staging region to fill, in shared mode.
        region: Option<LentRegion>,
    },
    /// Frame `index` was encoded and the region may be refilled.
    Consumed {
        /// Index of the encoded frame.
        index: u64,
        /// The staging region, handed back to the producer.
        region: Option<LentRegion>,
    },
    /// Session ended; the encoded stream.
    End(Vec<u8>),
    /// The consumer hit an error and stopped.
    Failed(EncoderError),
}

impl ProducerMsg {
    /// Short name used in logs and protocol errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Frame { .. } => "frame",
            Self::Finish { .. } => "finish",
        }
    }
}

impl ConsumerMsg {
    /// Short name used in logs and protocol errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Started { .. } => "started",
            Self::Consumed { .. } => "consumed",
            Self::End(_) => "end",
            Self::Failed(_) => "failed",
        }
    }
}

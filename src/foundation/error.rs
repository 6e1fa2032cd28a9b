/// Convenience result type used across the crate.
pub type EncoderResult<T> = Result<T, EncoderError>;

/// Top-level error taxonomy for sinks, sessions and pipelines.
///
/// Nothing in this crate retries on error: encoding is deterministic, so a retry would only
/// duplicate output.
#[derive(thiserror::Error, Debug)]
pub enum EncoderError {
    /// Invalid configuration detected before any resource was created.
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller broke an API contract (buffer size, lifecycle order, protocol order).
    #[error("contract violation: {0}")]
    Contract(String),

    /// Engine memory could not satisfy an allocation.
    #[error("resource exhaustion: {0}")]
    Resource(String),

    /// Opaque failure reported by the encoder engine.
    #[error("engine error: {0}")]
    Engine(String),

    /// The producer/consumer channel broke down.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EncoderError {
    /// Build a [`EncoderError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`EncoderError::Contract`] value.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Build a [`EncoderError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`EncoderError::Engine`] value.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Build a [`EncoderError::Pipeline`] value.
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Return `true` for [`EncoderError::Contract`].
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

/// Error taxonomy and result alias.
pub mod error;

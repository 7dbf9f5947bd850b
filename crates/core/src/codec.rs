//! bincode wire codec shared by commands, responses, and snapshots.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while encoding or decoding wire records.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encoding failed: {0}")]
    Encode(bincode::Error),

    #[error("decoding failed: {0}")]
    Decode(bincode::Error),

    #[error("empty payload")]
    Empty,
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Fixed-width little-endian integers, trailing bytes rejected.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Serialize a value into its wire bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    options().serialize(value).map_err(CodecError::Encode)
}

/// Deserialize a value from wire bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    options().deserialize(bytes).map_err(CodecError::Decode)
}

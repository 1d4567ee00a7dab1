//! Errors signalling misuse of the API.
//!
//! Defects of an untrusted proof are never reported here: verifiers describe them with a status
//! on the checked proof ([`ListProofStatus`], [`MapProofStatus`]). A [`ProofError`] means the
//! caller or the deserializer feeding it broke a contract.

use crate::proof::{ListProofStatus, MapProofStatus};

/// Reasons a [`crate::path_key::PathKey`] could not be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidKey {
    /// Branch keys have between 0 and 255 significant bits.
    #[error("branch key length {0} is out of range [0, 255]")]
    BranchLength(u16),
    /// The key buffer is not 32 bytes long.
    #[error("key buffer must be 32 bytes, got {0}")]
    BufferLength(usize),
    /// A branch key has set bits after its significant prefix.
    #[error("branch key has set bits after its {0} significant bits")]
    TrailingBits(u16),
}

/// Errors produced when the API is used against its contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    /// A path key could not be constructed.
    #[error("invalid path key: {0}")]
    InvalidKey(#[from] InvalidKey),
    /// A digest is not exactly 32 bytes long.
    #[error("digest must be 32 bytes, got {actual}")]
    InvalidDigestLength { actual: usize },
    /// The root hash or the elements of a list proof were requested, but it is not valid.
    #[error("list proof is not valid: {0:?}")]
    InvalidListProof(ListProofStatus),
    /// The root hash or the entries of a map proof were requested, but it is not valid.
    #[error("map proof is not valid: {0:?}")]
    InvalidMapProof(MapProofStatus),
    /// A checked map proof was asked about a key it neither discloses nor proves absent.
    #[error("key {0} was not among the requested keys")]
    KeyNotRequested(String),
}

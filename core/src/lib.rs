//! Verification of Merkle proofs for lists and maps, for light clients.
//!
//! This crate checks proofs produced by a full node against a root hash obtained from a trusted
//! source. Nothing here needs access to the underlying storage.
//!
//! Lists are Merkle trees with all elements at the same depth; maps are binary Merkle-Patricia
//! tries keyed by the digests of user keys. See the [`proof`] module for the proof formats and
//! [`hasher`] for the hashing schema.

pub mod error;
pub mod hasher;
pub mod options;
pub mod path_key;
pub mod proof;

pub use error::{InvalidKey, ProofError};
pub use options::VerifierOptions;
pub use path_key::{KeyPath, NodeKind, PathKey};

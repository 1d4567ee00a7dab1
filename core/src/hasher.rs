//! Hashers (feature-gated) and utilities for implementing them.
//!
//! Verification only ever talks to a [`ProofHasher`], which domain-separates every kind of hash
//! input it produces. The provided [`PrefixedHasher`] builds one out of any plain
//! [`BinaryHash`] by prepending a one-byte tag to each preimage.

use crate::{error::ProofError, path_key::PathKey};

/// The output of a hash function. In this schema, it is always 256 bits.
pub type Digest = [u8; 32];

/// The width of a [`Digest`] in bytes.
pub const DIGEST_SIZE: usize = 32;

/// The root digest of an empty map, and the tree root of an empty list.
pub const EMPTY_DIGEST: Digest = [0u8; 32];

/// Tag of list elements and map values.
pub const LEAF_PREFIX: u8 = 0x00;
/// Tag of list tree branches.
pub const LIST_BRANCH_PREFIX: u8 = 0x01;
/// Tag of the list index hash, which binds the list size to the tree root.
pub const LIST_ROOT_PREFIX: u8 = 0x02;
/// Tag of the root of a map holding a single entry.
pub const MAP_SINGLE_ENTRY_PREFIX: u8 = 0x03;
/// Tag of map trie branches.
pub const MAP_BRANCH_PREFIX: u8 = 0x04;

/// Interpret a byte slice as a digest.
///
/// Fails if the slice is not exactly [`DIGEST_SIZE`] bytes long.
pub fn digest_from_slice(bytes: &[u8]) -> Result<Digest, ProofError> {
    bytes
        .try_into()
        .map_err(|_| ProofError::InvalidDigestLength {
            actual: bytes.len(),
        })
}

/// A domain-separated hash function for proof verification.
///
/// Each method corresponds to one kind of node. An implementation must make sure that no
/// preimage of one kind can be mistaken for the preimage of another, otherwise a leaf payload
/// could be crafted to look like a branch.
pub trait ProofHasher {
    /// Hash a list element or a map value.
    fn hash_leaf(data: &[u8]) -> Digest;

    /// Hash a branch of a list tree. `right` is absent for the last node of an odd-sized level.
    fn hash_list_node(left: &Digest, right: Option<&Digest>) -> Digest;

    /// Bind the size of a list to the root of its tree.
    fn hash_list_index(size: u64, root: &Digest) -> Digest;

    /// Hash the root of a map holding exactly one entry.
    fn hash_single_entry_map(key: &PathKey, value_hash: &Digest) -> Digest;

    /// Hash a branch of a map trie from both children and their keys.
    fn hash_map_node(
        left_key: &PathKey,
        left: &Digest,
        right_key: &PathKey,
        right: &Digest,
    ) -> Digest;
}

/// A simple trait for representing binary hash functions.
pub trait BinaryHash {
    /// Given a bit-string, produce a 32-byte hash.
    fn hash(input: &[u8]) -> Digest;

    /// An optional specialization of `hash` over the concatenation of several chunks.
    fn hash_chunks(chunks: &[&[u8]]) -> Digest {
        Self::hash(&chunks.concat())
    }
}

/// A proof hasher constructed from a simple binary hasher.
///
/// Every preimage starts with a one-byte tag naming the kind of node being hashed:
/// [`LEAF_PREFIX`], [`LIST_BRANCH_PREFIX`], [`LIST_ROOT_PREFIX`], [`MAP_SINGLE_ENTRY_PREFIX`] or
/// [`MAP_BRANCH_PREFIX`]. Keys are mixed in using their canonical encoding
/// ([`PathKey::encode_for_hashing`]).
///
/// The binary hash wrapped by this structure must be collision resistant over its whole
/// input space. Sha2 and Blake3 both meet this criterion.
pub struct PrefixedHasher<H>(core::marker::PhantomData<H>);

impl<H: BinaryHash> ProofHasher for PrefixedHasher<H> {
    fn hash_leaf(data: &[u8]) -> Digest {
        H::hash_chunks(&[&[LEAF_PREFIX], data])
    }

    fn hash_list_node(left: &Digest, right: Option<&Digest>) -> Digest {
        match right {
            Some(right) => H::hash_chunks(&[&[LIST_BRANCH_PREFIX], left, right]),
            None => H::hash_chunks(&[&[LIST_BRANCH_PREFIX], left]),
        }
    }

    fn hash_list_index(size: u64, root: &Digest) -> Digest {
        H::hash_chunks(&[&[LIST_ROOT_PREFIX], &size.to_le_bytes(), root])
    }

    fn hash_single_entry_map(key: &PathKey, value_hash: &Digest) -> Digest {
        let key = key.encoded();
        H::hash_chunks(&[&[MAP_SINGLE_ENTRY_PREFIX], key.as_slice(), value_hash])
    }

    fn hash_map_node(
        left_key: &PathKey,
        left: &Digest,
        right_key: &PathKey,
        right: &Digest,
    ) -> Digest {
        let left_key = left_key.encoded();
        let right_key = right_key.encoded();
        H::hash_chunks(&[
            &[MAP_BRANCH_PREFIX],
            left,
            right,
            left_key.as_slice(),
            right_key.as_slice(),
        ])
    }
}

#[cfg(any(feature = "blake3-hasher", test))]
pub use blake3::Blake3Hasher;

/// A proof hasher making use of blake3.
#[cfg(any(feature = "blake3-hasher", test))]
pub mod blake3 {
    use super::{BinaryHash, Digest, PrefixedHasher};

    /// A [`BinaryHash`] implementation for Blake3.
    pub struct Blake3BinaryHasher;

    /// A wrapper around Blake3 for use in proof verification.
    pub type Blake3Hasher = PrefixedHasher<Blake3BinaryHasher>;

    impl BinaryHash for Blake3BinaryHasher {
        fn hash(value: &[u8]) -> Digest {
            blake3::hash(value).into()
        }

        fn hash_chunks(chunks: &[&[u8]]) -> Digest {
            let mut hasher = blake3::Hasher::new();
            for chunk in chunks {
                hasher.update(chunk);
            }
            hasher.finalize().into()
        }
    }
}

#[cfg(feature = "sha2-hasher")]
pub use sha2::Sha2Hasher;

/// A proof hasher making use of sha2-256. This is the default configuration.
#[cfg(feature = "sha2-hasher")]
pub mod sha2 {
    use super::{BinaryHash, Digest, PrefixedHasher};
    use sha2::{Digest as _, Sha256};

    /// A [`BinaryHash`] implementation for Sha2.
    pub struct Sha2BinaryHasher;

    /// A wrapper around sha2-256 for use in proof verification.
    pub type Sha2Hasher = PrefixedHasher<Sha2BinaryHasher>;

    impl BinaryHash for Sha2BinaryHasher {
        fn hash(value: &[u8]) -> Digest {
            let mut hasher = Sha256::new();
            hasher.update(value);
            hasher.finalize().into()
        }

        fn hash_chunks(chunks: &[&[u8]]) -> Digest {
            let mut hasher = Sha256::new();
            for chunk in chunks {
                hasher.update(chunk);
            }
            hasher.finalize().into()
        }
    }
}

//! Proofs and proof verification.
//!
//! Lists and maps are authenticated data structures: a prover can disclose part of one together
//! with enough digests to recompute its root. This module exposes the proof types and the
//! routines which check them against an untrusted root.
//!
//! Lists can be proven with a recursive tree ([`ListProofNode`]) or with positioned entries
//! ([`FlatListProof`]); both produce a [`CheckedListProof`]. Maps are proven with a sorted trie
//! frontier ([`MapProof`]), producing a [`CheckedMapProof`].
//!
//! Checking never fails on a malformed proof. The checked proof carries a status instead, and
//! only a valid one gives access to its root and contents.

pub use flat_list::{tree_height, FlatListProof, ListProofElementEntry, ListProofHashedEntry};
pub use list::{CheckedListProof, ListProofNode, ListProofStatus};
pub use map::{CheckedMapProof, MapProof, MapProofEntry, MapProofStatus};

mod flat_list;
mod list;
mod map;

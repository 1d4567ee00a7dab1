//! Flat list proofs: the disclosed elements and the digests needed to compute the root, each
//! tagged with its position in the tree.
//!
//! A position is a `(height, index)` pair. Elements are at height 0 and the root is at height
//! [`tree_height`]; the index counts nodes from the left within a level. The tree shape is the one
//! described in [`super::list`].

use std::collections::BTreeMap;

use crate::{
    hasher::{Digest, ProofHasher, EMPTY_DIGEST},
    options::VerifierOptions,
};

use super::list::{CheckedListProof, ListProofStatus};

/// A disclosed element of a flat list proof.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListProofElementEntry {
    /// The index of the element in the list.
    pub index: u64,
    /// The element.
    pub element: Vec<u8>,
}

/// The digest of a tree node needed to compute the root of a flat list proof.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListProofHashedEntry {
    /// The index of the node within its level.
    pub index: u64,
    /// The height of the node, with elements at height 0.
    pub height: u8,
    /// The digest of the node.
    pub hash: Digest,
}

/// A list proof giving the list size, the disclosed elements and the digests of the pruned
/// subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatListProof {
    elements: Vec<ListProofElementEntry>,
    proof: Vec<ListProofHashedEntry>,
    size: u64,
}

/// The height of the tree of a list with `size` elements: the number of levels above the
/// elements.
pub fn tree_height(size: u64) -> u8 {
    if size <= 1 {
        0
    } else {
        (u64::BITS - (size - 1).leading_zeros()) as u8
    }
}

// The number of nodes at `height` in the tree of a list of `size` elements.
fn level_size(size: u64, height: u8) -> u64 {
    let span = 1u64 << height;
    (size + span - 1) >> height
}

impl FlatListProof {
    /// Create a proof out of its parts.
    pub fn new(
        elements: Vec<ListProofElementEntry>,
        proof: Vec<ListProofHashedEntry>,
        size: u64,
    ) -> Self {
        FlatListProof {
            elements,
            proof,
            size,
        }
    }

    /// The disclosed elements.
    pub fn elements(&self) -> &[ListProofElementEntry] {
        &self.elements
    }

    /// The digests of pruned subtrees.
    pub fn proof(&self) -> &[ListProofHashedEntry] {
        &self.proof
    }

    /// The claimed size of the list.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Verify the proof with the default options. See [`FlatListProof::verify_with`].
    pub fn verify<H: ProofHasher>(&self) -> CheckedListProof {
        self.verify_with::<H>(&VerifierOptions::default())
    }

    /// Verify the proof, computing the tree root level by level.
    ///
    /// On success the checked proof also carries the index hash, binding the list size to the
    /// root. A proof of an empty list has no entries and the root [`EMPTY_DIGEST`].
    pub fn verify_with<H: ProofHasher>(&self, options: &VerifierOptions) -> CheckedListProof {
        match self.compute_root::<H>(options) {
            Ok(root) => {
                let elements: BTreeMap<u64, Vec<u8>> = self
                    .elements
                    .iter()
                    .map(|entry| (entry.index, entry.element.clone()))
                    .collect();
                let index_hash = H::hash_list_index(self.size, &root);
                tracing::trace!(
                    size = self.size,
                    elements = elements.len(),
                    root = %hex::encode(root),
                    "flat list proof verified"
                );
                CheckedListProof::valid(root, elements, Some(index_hash))
            }
            Err(status) => {
                tracing::debug!(?status, size = self.size, "flat list proof rejected");
                CheckedListProof::invalid(status)
            }
        }
    }

    fn compute_root<H: ProofHasher>(
        &self,
        options: &VerifierOptions,
    ) -> Result<Digest, ListProofStatus> {
        if self.size > options.max_list_size {
            return Err(ListProofStatus::InvalidSize);
        }
        if self.size == 0 {
            return if self.elements.is_empty() && self.proof.is_empty() {
                Ok(EMPTY_DIGEST)
            } else {
                Err(ListProofStatus::InvalidEmptyListProof)
            };
        }

        let height = tree_height(self.size);
        if self.elements.is_empty() {
            return self.pruned_root(height);
        }

        let mut proof_by_height = vec![BTreeMap::new(); height as usize];
        for entry in &self.proof {
            if entry.height >= height {
                return Err(ListProofStatus::InvalidHeight);
            }
            if entry.index >= level_size(self.size, entry.height) {
                return Err(ListProofStatus::InvalidIndex);
            }
            if proof_by_height[entry.height as usize]
                .insert(entry.index, entry.hash)
                .is_some()
            {
                return Err(ListProofStatus::DuplicateEntry);
            }
        }

        let mut calculated = BTreeMap::new();
        for entry in &self.elements {
            if entry.index >= self.size {
                return Err(ListProofStatus::InvalidIndex);
            }
            if calculated
                .insert(entry.index, H::hash_leaf(&entry.element))
                .is_some()
            {
                return Err(ListProofStatus::DuplicateEntry);
            }
        }

        for (level_height, level_proof) in proof_by_height.into_iter().enumerate() {
            let level_len = level_size(self.size, level_height as u8);
            calculated = fold_level::<H>(calculated, level_proof, level_len)?;
        }

        calculated
            .get(&0)
            .copied()
            .ok_or(ListProofStatus::IncompleteProof)
    }

    // A proof disclosing no elements is the root digest itself.
    fn pruned_root(&self, height: u8) -> Result<Digest, ListProofStatus> {
        match self.proof.as_slice() {
            [] => Err(ListProofStatus::IncompleteProof),
            [root] if root.height != height => Err(ListProofStatus::InvalidHeight),
            [root] if root.index != 0 => Err(ListProofStatus::InvalidIndex),
            [root] => Ok(root.hash),
            _ => Err(ListProofStatus::RedundantEntry),
        }
    }
}

// Compute the next level up from the nodes computed so far and the digests supplied for this
// level.
fn fold_level<H: ProofHasher>(
    calculated: BTreeMap<u64, Digest>,
    supplied: BTreeMap<u64, Digest>,
    level_len: u64,
) -> Result<BTreeMap<u64, Digest>, ListProofStatus> {
    for &index in calculated.keys() {
        let lone_last = index + 1 == level_len && index % 2 == 0;
        let sibling = index ^ 1;
        if !lone_last && !calculated.contains_key(&sibling) && !supplied.contains_key(&sibling) {
            return Err(ListProofStatus::IncompleteProof);
        }
    }
    for &index in supplied.keys() {
        if calculated.contains_key(&index) || !calculated.contains_key(&(index ^ 1)) {
            return Err(ListProofStatus::RedundantEntry);
        }
    }

    let mut level = calculated;
    level.extend(supplied);

    let mut next = BTreeMap::new();
    let mut nodes = level.into_iter().peekable();
    while let Some((index, left)) = nodes.next() {
        let right = match nodes.peek() {
            Some(&(right_index, _)) if index % 2 == 0 && right_index == index + 1 => {
                nodes.next().map(|(_, right)| right)
            }
            _ => None,
        };
        next.insert(index / 2, H::hash_list_node(&left, right.as_ref()));
    }
    Ok(next)
}

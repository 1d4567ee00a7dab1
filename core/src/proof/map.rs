//! Proofs of entries of a map, authenticated by a binary Merkle-Patricia trie.
//!
//! The trie is keyed by the 256-bit digests of user keys. A fork is addressed by the longest
//! prefix shared by every key below it, so each branch has exactly two children and every node
//! has a [`PathKey`]. A branch is hashed from both children and their keys; a map with a single
//! entry is hashed from that entry's key and value hash instead.
//!
//! A proof is the frontier of the subtrie spanning the requested keys: the disclosed leaves
//! together with the digests of the subtrees which hold no requested key, each under its key. The
//! frontier must be sorted by key. It can also show that some requested keys are absent, when no
//! frontier entry could contain them.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::ProofError,
    hasher::{Digest, ProofHasher, EMPTY_DIGEST},
    path_key::{KeyPath, PathKey},
};

/// An entry of a map proof frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MapProofEntry {
    /// A disclosed leaf: the digest of the user key and the value.
    Leaf { key: KeyPath, value: Vec<u8> },
    /// A pruned subtree: its key and its digest. The key may be a branch or a leaf key.
    Hash { key: PathKey, hash: Digest },
}

impl MapProofEntry {
    /// Create an entry disclosing a leaf.
    pub fn leaf(key: KeyPath, value: impl Into<Vec<u8>>) -> Self {
        MapProofEntry::Leaf {
            key,
            value: value.into(),
        }
    }

    /// Create an entry standing in for a pruned subtree.
    pub fn hash(key: PathKey, hash: Digest) -> Self {
        MapProofEntry::Hash { key, hash }
    }

    /// The trie key of the entry.
    pub fn key(&self) -> PathKey {
        match self {
            MapProofEntry::Leaf { key, .. } => PathKey::from_leaf_digest(*key),
            MapProofEntry::Hash { key, .. } => *key,
        }
    }

    // The key and digest of the trie node this entry stands for. A leaf's digest is its value
    // hash.
    fn node<H: ProofHasher>(&self) -> (PathKey, Digest) {
        match self {
            MapProofEntry::Leaf { key, value } => {
                (PathKey::from_leaf_digest(*key), H::hash_leaf(value))
            }
            MapProofEntry::Hash { key, hash } => (*key, *hash),
        }
    }
}

/// The outcome of checking a map proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapProofStatus {
    /// The proof is well-formed.
    Correct,
    /// The frontier is not sorted by key.
    InvalidOrder,
    /// Two frontier entries have the same key.
    DuplicatePath,
    /// A frontier key is a prefix of another frontier key or of a missing key.
    EmbeddedPath,
    /// The only frontier entry is a branch, which cannot exist on its own.
    NonTerminalNode,
}

/// A map proof: the frontier of the requested part of the trie, and the requested keys shown
/// to be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapProof {
    entries: Vec<MapProofEntry>,
    missing_keys: Vec<KeyPath>,
}

impl MapProof {
    /// Create a proof out of a sorted frontier and the requested keys missing from the map.
    pub fn new(entries: Vec<MapProofEntry>, missing_keys: Vec<KeyPath>) -> Self {
        MapProof {
            entries,
            missing_keys,
        }
    }

    /// The frontier entries, in proof order.
    pub fn entries(&self) -> &[MapProofEntry] {
        &self.entries
    }

    /// The requested keys claimed to be absent.
    pub fn missing_keys(&self) -> &[KeyPath] {
        &self.missing_keys
    }

    /// Check the proof, computing the map root.
    ///
    /// The empty proof is the proof of an empty map, with root [`EMPTY_DIGEST`].
    pub fn check<H: ProofHasher>(&self) -> CheckedMapProof {
        let status = self.check_structure();
        if status != MapProofStatus::Correct {
            tracing::debug!(
                ?status,
                entries = self.entries.len(),
                missing = self.missing_keys.len(),
                "map proof rejected"
            );
            return CheckedMapProof::invalid(status);
        }

        let root = self.compute_root::<H>();
        let entries: BTreeMap<KeyPath, Vec<u8>> = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                MapProofEntry::Leaf { key, value } => Some((*key, value.clone())),
                MapProofEntry::Hash { .. } => None,
            })
            .collect();
        tracing::trace!(
            entries = entries.len(),
            missing = self.missing_keys.len(),
            root = %hex::encode(root),
            "map proof checked"
        );
        CheckedMapProof {
            status,
            root_hash: root,
            entries,
            missing_keys: self.missing_keys.iter().copied().collect(),
        }
    }

    fn check_structure(&self) -> MapProofStatus {
        let mut keys: Vec<PathKey> = self.entries.iter().map(MapProofEntry::key).collect();

        // Duplicates and embedded keys are detected wherever they appear, so look at them in
        // sorted order where they are adjacent.
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
            return MapProofStatus::DuplicatePath;
        }
        if sorted.windows(2).any(|pair| pair[0].is_prefix_of(&pair[1])) {
            return MapProofStatus::EmbeddedPath;
        }
        if keys.windows(2).any(|pair| pair[0] > pair[1]) {
            return MapProofStatus::InvalidOrder;
        }
        // the frontier is sorted from here on.
        keys = sorted;

        for missing in &self.missing_keys {
            let missing = PathKey::from_leaf_digest(*missing);
            // Only the greatest key not above `missing` may be its prefix.
            let position = keys.partition_point(|key| key <= &missing);
            if position > 0 && keys[position - 1].is_prefix_of(&missing) {
                return MapProofStatus::EmbeddedPath;
            }
        }

        if let [MapProofEntry::Hash { key, .. }] = self.entries.as_slice() {
            if !key.is_leaf() {
                return MapProofStatus::NonTerminalNode;
            }
        }

        MapProofStatus::Correct
    }

    fn compute_root<H: ProofHasher>(&self) -> Digest {
        match self.entries.as_slice() {
            [] => EMPTY_DIGEST,
            [entry] => {
                let (key, digest) = entry.node::<H>();
                H::hash_single_entry_map(&key, &digest)
            }
            entries => fold_contour::<H>(entries.iter().map(MapProofEntry::node::<H>)),
        }
    }
}

// Rebuild the trie above a sorted frontier of at least two nodes, keeping the right edge of the
// part built so far on a stack. Two stacked nodes are joined once the next node forks off above
// the fork between them.
fn fold_contour<H: ProofHasher>(nodes: impl Iterator<Item = (PathKey, Digest)>) -> Digest {
    let mut contour: Vec<(PathKey, Digest)> = Vec::new();
    for node in nodes {
        while let [.., left, right] = contour.as_slice() {
            let fork_len = left.0.common_prefix_len(&right.0);
            if right.0.common_prefix_len(&node.0) >= fork_len {
                break;
            }
            join_top::<H>(&mut contour);
        }
        contour.push(node);
    }
    while contour.len() > 1 {
        join_top::<H>(&mut contour);
    }
    contour.pop().map_or(EMPTY_DIGEST, |(_, digest)| digest)
}

fn join_top<H: ProofHasher>(contour: &mut Vec<(PathKey, Digest)>) {
    let (Some((right_key, right)), Some((left_key, left))) = (contour.pop(), contour.pop()) else {
        return;
    };
    let fork = left_key.common_prefix(&right_key);
    contour.push((fork, H::hash_map_node(&left_key, &left, &right_key, &right)));
}

/// The result of checking a map proof.
///
/// Only a correct proof gives access to its root hash and entries. Asking an incorrect one is
/// an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedMapProof {
    status: MapProofStatus,
    root_hash: Digest,
    entries: BTreeMap<KeyPath, Vec<u8>>,
    missing_keys: BTreeSet<KeyPath>,
}

impl CheckedMapProof {
    fn invalid(status: MapProofStatus) -> Self {
        CheckedMapProof {
            status,
            root_hash: EMPTY_DIGEST,
            entries: BTreeMap::new(),
            missing_keys: BTreeSet::new(),
        }
    }

    /// The status of the proof.
    pub fn status(&self) -> MapProofStatus {
        self.status
    }

    /// Whether the proof is correct.
    pub fn is_valid(&self) -> bool {
        self.status == MapProofStatus::Correct
    }

    /// The root of the map.
    pub fn root_hash(&self) -> Result<Digest, ProofError> {
        self.check_valid()?;
        Ok(self.root_hash)
    }

    /// The disclosed entries, by key.
    pub fn entries(&self) -> Result<&BTreeMap<KeyPath, Vec<u8>>, ProofError> {
        self.check_valid()?;
        Ok(&self.entries)
    }

    /// The requested keys proven absent.
    pub fn missing_keys(&self) -> Result<&BTreeSet<KeyPath>, ProofError> {
        self.check_valid()?;
        Ok(&self.missing_keys)
    }

    /// Whether the map contains `key`.
    ///
    /// Fails if the proof neither discloses `key` nor shows it is absent.
    pub fn contains_key(&self, key: &KeyPath) -> Result<bool, ProofError> {
        Ok(self.get(key)?.is_some())
    }

    /// The value under `key`, or `None` if the proof shows it is absent.
    ///
    /// Fails if the proof neither discloses `key` nor shows it is absent.
    pub fn get(&self, key: &KeyPath) -> Result<Option<&[u8]>, ProofError> {
        self.check_valid()?;
        if let Some(value) = self.entries.get(key) {
            Ok(Some(value.as_slice()))
        } else if self.missing_keys.contains(key) {
            Ok(None)
        } else {
            Err(ProofError::KeyNotRequested(hex::encode(key)))
        }
    }

    /// Whether the proof is correct and has the expected root.
    pub fn compare_with_root_hash(&self, expected: &Digest) -> Result<bool, ProofError> {
        self.check_valid()?;
        Ok(&self.root_hash == expected)
    }

    fn check_valid(&self) -> Result<(), ProofError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ProofError::InvalidMapProof(self.status))
        }
    }
}

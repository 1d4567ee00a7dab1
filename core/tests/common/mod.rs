#![allow(dead_code)]

use lightproof_core::{
    hasher::{Digest, ProofHasher, EMPTY_DIGEST},
    proof::{
        FlatListProof, ListProofElementEntry, ListProofHashedEntry, ListProofNode, MapProof,
        MapProofEntry,
    },
    KeyPath, PathKey,
};
use std::collections::{BTreeMap, BTreeSet};

pub use lightproof_core::hasher::Blake3Hasher as Hasher;

pub fn key_path(id: u64) -> KeyPath {
    // KeyPaths must be uniformly distributed, a PRNG seeded with the id is good enough.
    use rand::{RngCore as _, SeedableRng as _};
    let mut seed = [0; 16];
    seed[0..8].copy_from_slice(&id.to_le_bytes());
    let mut rng = rand_pcg::Lcg64Xsh32::from_seed(seed);
    let mut path = KeyPath::default();
    rng.fill_bytes(&mut path);
    path
}

pub fn list_values(size: u64) -> Vec<Vec<u8>> {
    (0..size).map(|i| format!("element {i}").into_bytes()).collect()
}

/// Every level of the tree of a list, from the elements up to the root.
pub struct ListTree {
    values: Vec<Vec<u8>>,
    levels: Vec<Vec<Digest>>,
}

impl ListTree {
    pub fn new<H: ProofHasher>(values: Vec<Vec<u8>>) -> Self {
        let mut levels = vec![values.iter().map(|v| H::hash_leaf(v)).collect::<Vec<_>>()];
        while levels.last().map_or(false, |level| level.len() > 1) {
            let next = levels
                .last()
                .unwrap()
                .chunks(2)
                .map(|pair| H::hash_list_node(&pair[0], pair.get(1)))
                .collect();
            levels.push(next);
        }
        ListTree { values, levels }
    }

    pub fn size(&self) -> u64 {
        self.values.len() as u64
    }

    pub fn root(&self) -> Digest {
        match self.levels.last() {
            Some(level) if !level.is_empty() => level[0],
            _ => EMPTY_DIGEST,
        }
    }

    fn height(&self) -> usize {
        self.levels.len() - 1
    }

    fn discloses(&self, height: usize, index: u64, disclosed: &BTreeSet<u64>) -> bool {
        let start = index << height;
        let end = (index + 1) << height;
        disclosed.range(start..end).next().is_some()
    }

    /// A recursive proof of the `disclosed` indices.
    pub fn recursive_proof(&self, disclosed: &BTreeSet<u64>) -> ListProofNode {
        self.recursive_node(self.height(), 0, disclosed)
    }

    fn recursive_node(
        &self,
        height: usize,
        index: u64,
        disclosed: &BTreeSet<u64>,
    ) -> ListProofNode {
        if !self.discloses(height, index, disclosed) {
            return ListProofNode::HashOnly(self.levels[height][index as usize]);
        }
        if height == 0 {
            return ListProofNode::element(self.values[index as usize].clone());
        }
        let left = self.recursive_node(height - 1, index * 2, disclosed);
        let right = ((index * 2 + 1) < self.levels[height - 1].len() as u64)
            .then(|| self.recursive_node(height - 1, index * 2 + 1, disclosed));
        ListProofNode::branch(left, right)
    }

    /// A flat proof of the `disclosed` indices.
    pub fn flat_proof(&self, disclosed: &BTreeSet<u64>) -> FlatListProof {
        let elements = disclosed
            .iter()
            .map(|&index| ListProofElementEntry {
                index,
                element: self.values[index as usize].clone(),
            })
            .collect();
        let mut proof = Vec::new();
        if disclosed.is_empty() {
            if self.size() > 0 {
                proof.push(ListProofHashedEntry {
                    index: 0,
                    height: self.height() as u8,
                    hash: self.root(),
                });
            }
        } else {
            self.collect_pruned(self.height(), 0, disclosed, &mut proof);
        }
        FlatListProof::new(elements, proof, self.size())
    }

    fn collect_pruned(
        &self,
        height: usize,
        index: u64,
        disclosed: &BTreeSet<u64>,
        proof: &mut Vec<ListProofHashedEntry>,
    ) {
        if !self.discloses(height, index, disclosed) {
            proof.push(ListProofHashedEntry {
                index,
                height: height as u8,
                hash: self.levels[height][index as usize],
            });
            return;
        }
        if height == 0 {
            return;
        }
        for child in [index * 2, index * 2 + 1] {
            if child < self.levels[height - 1].len() as u64 {
                self.collect_pruned(height - 1, child, disclosed, proof);
            }
        }
    }
}

/// A map with its trie computed on demand.
pub struct MapTrie {
    leaves: BTreeMap<KeyPath, Vec<u8>>,
}

impl MapTrie {
    pub fn new(leaves: BTreeMap<KeyPath, Vec<u8>>) -> Self {
        MapTrie { leaves }
    }

    pub fn leaves(&self) -> &BTreeMap<KeyPath, Vec<u8>> {
        &self.leaves
    }

    pub fn root<H: ProofHasher>(&self) -> Digest {
        let nodes = self.nodes::<H>();
        match nodes.as_slice() {
            [] => EMPTY_DIGEST,
            [(key, value_hash)] => H::hash_single_entry_map(key, value_hash),
            nodes => subtrie::<H>(nodes).1,
        }
    }

    /// A proof for `requested`, listing the requested keys absent from the map as missing.
    pub fn proof<H: ProofHasher>(&self, requested: &BTreeSet<KeyPath>) -> MapProof {
        let requested_keys: Vec<PathKey> =
            requested.iter().copied().map(PathKey::from_leaf_digest).collect();
        let mut entries = Vec::new();
        let nodes = self.nodes::<H>();
        if !nodes.is_empty() {
            self.frontier::<H>(&nodes, &requested_keys, &mut entries);
        }
        let missing = requested
            .iter()
            .filter(|key| !self.leaves.contains_key(*key))
            .copied()
            .collect();
        MapProof::new(entries, missing)
    }

    fn nodes<H: ProofHasher>(&self) -> Vec<(PathKey, Digest)> {
        self.leaves
            .iter()
            .map(|(key, value)| (PathKey::from_leaf_digest(*key), H::hash_leaf(value)))
            .collect()
    }

    fn frontier<H: ProofHasher>(
        &self,
        nodes: &[(PathKey, Digest)],
        requested: &[PathKey],
        entries: &mut Vec<MapProofEntry>,
    ) {
        let (key, digest) = subtrie::<H>(nodes);
        if !requested.iter().any(|r| key.is_prefix_of(r)) {
            entries.push(MapProofEntry::hash(key, digest));
            return;
        }
        if let [(leaf, _)] = nodes {
            let leaf = *leaf.raw();
            entries.push(MapProofEntry::leaf(leaf, self.leaves[&leaf].clone()));
            return;
        }
        let split = fork_split(nodes);
        self.frontier::<H>(&nodes[..split], requested, entries);
        self.frontier::<H>(&nodes[split..], requested, entries);
    }
}

// The index of the first node going right at the fork shared by all nodes.
fn fork_split(nodes: &[(PathKey, Digest)]) -> usize {
    let first = &nodes[0].0;
    let last = &nodes[nodes.len() - 1].0;
    let fork_len = first.common_prefix_len(last) as usize;
    nodes.partition_point(|(key, _)| key.bit(fork_len) == Some(false))
}

fn subtrie<H: ProofHasher>(nodes: &[(PathKey, Digest)]) -> (PathKey, Digest) {
    if let [node] = nodes {
        return *node;
    }
    let fork = nodes[0].0.common_prefix(&nodes[nodes.len() - 1].0);
    let split = fork_split(nodes);
    let (left_key, left) = subtrie::<H>(&nodes[..split]);
    let (right_key, right) = subtrie::<H>(&nodes[split..]);
    (
        fork,
        H::hash_map_node(&left_key, &left, &right_key, &right),
    )
}

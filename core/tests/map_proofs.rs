mod common;

use common::{key_path, Hasher, MapTrie};
use lightproof_core::{
    hasher::EMPTY_DIGEST,
    proof::{MapProof, MapProofEntry, MapProofStatus},
    KeyPath, PathKey,
};
use quickcheck::{Arbitrary, Gen, QuickCheck};
use rand::{seq::SliceRandom, SeedableRng};
use rand_pcg::Lcg64Xsh32;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
struct Lookup {
    map: BTreeMap<KeyPath, Vec<u8>>,
    requested: BTreeSet<KeyPath>,
}

impl Arbitrary for Lookup {
    fn arbitrary(g: &mut Gen) -> Self {
        let size = u64::arbitrary(g) % 40;
        let map: BTreeMap<_, _> = (0..size)
            .map(|id| (key_path(id), id.to_le_bytes().to_vec()))
            .collect();
        // ids past the map size are absent.
        let requested = (0..size + 8)
            .filter(|_| u8::arbitrary(g) % 3 == 0)
            .map(key_path)
            .collect();
        Lookup { map, requested }
    }
}

impl Lookup {
    fn trie(&self) -> MapTrie {
        MapTrie::new(self.map.clone())
    }
}

fn sample_trie() -> (MapTrie, BTreeSet<KeyPath>) {
    let map = (0..20).map(|id| (key_path(id), vec![id as u8; 3])).collect();
    let requested = [1, 4, 9, 13, 21, 22].into_iter().map(key_path).collect();
    (MapTrie::new(map), requested)
}

#[test]
fn proofs_check_against_trie_root() {
    fn prop(lookup: Lookup) -> bool {
        let trie = lookup.trie();
        let checked = trie.proof::<Hasher>(&lookup.requested).check::<Hasher>();
        if checked.root_hash() != Ok(trie.root::<Hasher>()) {
            return false;
        }
        lookup.requested.iter().all(|key| {
            checked.get(key).ok() == Some(lookup.map.get(key).map(Vec::as_slice))
        })
    }

    QuickCheck::new()
        .tests(300)
        .quickcheck(prop as fn(Lookup) -> bool);
}

#[test]
fn checking_is_idempotent() {
    fn prop(lookup: Lookup) -> bool {
        let proof = lookup.trie().proof::<Hasher>(&lookup.requested);
        proof.check::<Hasher>() == proof.check::<Hasher>()
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Lookup) -> bool);
}

#[test]
fn shuffled_entries_are_out_of_order() {
    fn prop(lookup: Lookup, seed: u64) -> bool {
        let trie = lookup.trie();
        let proof = trie.proof::<Hasher>(&lookup.requested);
        let entries = proof.entries();
        if entries.len() < 2 {
            return true;
        }

        let mut shuffled = entries.to_vec();
        shuffled.shuffle(&mut Lcg64Xsh32::seed_from_u64(seed));
        let expected = if shuffled == entries {
            MapProofStatus::Correct
        } else {
            MapProofStatus::InvalidOrder
        };
        let missing = proof.missing_keys().to_vec();
        let checked = MapProof::new(shuffled.clone(), missing.clone()).check::<Hasher>();
        if checked.status() != expected {
            return false;
        }

        shuffled.sort_by_key(MapProofEntry::key);
        let checked = MapProof::new(shuffled, missing).check::<Hasher>();
        checked.status() == MapProofStatus::Correct
            && checked.root_hash() == Ok(trie.root::<Hasher>())
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(Lookup, u64) -> bool);
}

#[test]
fn reversed_entries_are_out_of_order() {
    let (trie, requested) = sample_trie();
    let proof = trie.proof::<Hasher>(&requested);
    let mut reversed = proof.entries().to_vec();
    assert!(reversed.len() > 2);
    reversed.reverse();
    let proof = MapProof::new(reversed, vec![]);
    assert_eq!(proof.check::<Hasher>().status(), MapProofStatus::InvalidOrder);
}

#[test]
fn duplicates_anywhere_are_detected() {
    let (trie, requested) = sample_trie();
    let proof = trie.proof::<Hasher>(&requested);
    let entries = proof.entries();

    for (source, entry) in entries.iter().enumerate() {
        for position in 0..=entries.len() {
            let mut duplicated = entries.to_vec();
            duplicated.insert(position, entry.clone());
            let proof = MapProof::new(duplicated, vec![]);
            assert_eq!(
                proof.check::<Hasher>().status(),
                MapProofStatus::DuplicatePath,
                "entry {source} copied to {position}",
            );
        }
    }
}

#[test]
fn embedded_keys_anywhere_are_detected() {
    let (trie, requested) = sample_trie();
    let proof = trie.proof::<Hasher>(&requested);
    let entries = proof.entries();

    for (source, entry) in entries.iter().enumerate() {
        let key = entry.key();
        let bits = key.bits();
        let prefix = PathKey::from_bits(&bits[..bits.len() - 1]).unwrap();
        for position in 0..=entries.len() {
            let mut embedded = entries.to_vec();
            embedded.insert(position, MapProofEntry::hash(prefix, [0xAA; 32]));
            let proof = MapProof::new(embedded, vec![]);
            assert_eq!(
                proof.check::<Hasher>().status(),
                MapProofStatus::EmbeddedPath,
                "prefix of entry {source} inserted at {position}",
            );
        }
    }
}

#[test]
fn missing_key_under_pruned_subtree_is_rejected() {
    let (trie, requested) = sample_trie();
    let proof = trie.proof::<Hasher>(&requested);
    // key 15 is in the map but was not requested, so some entry of the frontier covers it.
    let mut missing = proof.missing_keys().to_vec();
    missing.push(key_path(15));
    let proof = MapProof::new(proof.entries().to_vec(), missing);
    assert_eq!(proof.check::<Hasher>().status(), MapProofStatus::EmbeddedPath);
}

#[test]
fn tampered_value_changes_root() {
    let (trie, requested) = sample_trie();
    let root = trie.root::<Hasher>();
    let proof = trie.proof::<Hasher>(&requested);
    assert_eq!(proof.check::<Hasher>().compare_with_root_hash(&root), Ok(true));

    let entries = proof
        .entries()
        .iter()
        .map(|entry| match entry {
            MapProofEntry::Leaf { key, .. } => MapProofEntry::leaf(*key, b"forged".to_vec()),
            other => other.clone(),
        })
        .collect();
    let forged = MapProof::new(entries, proof.missing_keys().to_vec()).check::<Hasher>();
    assert!(forged.is_valid());
    assert_eq!(forged.compare_with_root_hash(&root), Ok(false));
}

#[test]
fn unrequested_keys_are_errors() {
    let (trie, requested) = sample_trie();
    let checked = trie.proof::<Hasher>(&requested).check::<Hasher>();
    assert_eq!(checked.contains_key(&key_path(4)), Ok(true));
    assert_eq!(checked.contains_key(&key_path(21)), Ok(false));
    assert!(checked.contains_key(&key_path(5)).is_err());
    assert_eq!(checked.entries().unwrap().len(), 4);
    assert_eq!(checked.missing_keys().unwrap().len(), 2);
}

#[test]
fn single_entry_maps() {
    let key = key_path(0);
    let trie = MapTrie::new([(key, b"only".to_vec())].into_iter().collect());
    let root = trie.root::<Hasher>();

    let requested: BTreeSet<_> = [key].into_iter().collect();
    let checked = trie.proof::<Hasher>(&requested).check::<Hasher>();
    assert_eq!(checked.root_hash(), Ok(root));
    assert_eq!(checked.get(&key), Ok(Some(&b"only"[..])));

    // the proof of absence of another key is the pruned leaf.
    let other: BTreeSet<_> = [key_path(1)].into_iter().collect();
    let proof = trie.proof::<Hasher>(&other);
    assert!(matches!(proof.entries(), [MapProofEntry::Hash { .. }]));
    let checked = proof.check::<Hasher>();
    assert_eq!(checked.root_hash(), Ok(root));
    assert_eq!(checked.contains_key(&key_path(1)), Ok(false));
}

#[test]
fn empty_map() {
    let trie = MapTrie::new(BTreeMap::new());
    assert_eq!(trie.root::<Hasher>(), EMPTY_DIGEST);
    let requested: BTreeSet<_> = [key_path(3)].into_iter().collect();
    let checked = trie.proof::<Hasher>(&requested).check::<Hasher>();
    assert_eq!(checked.root_hash(), Ok(EMPTY_DIGEST));
    assert_eq!(checked.get(&key_path(3)), Ok(None));
}

use anyhow::{bail, ensure, Result};
use lightproof_core::{
    hasher::{Blake3Hasher, Digest, ProofHasher},
    proof::{
        FlatListProof, ListProofElementEntry, ListProofHashedEntry, ListProofNode, MapProof,
        MapProofEntry,
    },
    KeyPath, PathKey,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const ENV_NAME: &str = "LIGHTPROOF_LOG";

fn init_logging() -> Result<()> {
    let env = std::env::var(ENV_NAME).unwrap_or_default();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse(env)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

// The user keys of a map are hashed with blake3 to get their position in the trie. This must
// match the hashing done by the node which produced the proof.
fn key_path(key: &str) -> KeyPath {
    blake3::hash(key.as_bytes()).into()
}

fn main() -> Result<()> {
    init_logging()?;

    // A list of three elements, as a full node would hash it:
    //
    //        root
    //       /    \
    //     b01     b2
    //    /  \      |
    //   e0   e1    e2
    let elements: [&[u8]; 3] = [&b"alpha"[..], &b"beta"[..], &b"gamma"[..]];
    let leaves: Vec<Digest> = elements.iter().map(|e| Blake3Hasher::hash_leaf(e)).collect();
    let b01 = Blake3Hasher::hash_list_node(&leaves[0], Some(&leaves[1]));
    let b2 = Blake3Hasher::hash_list_node(&leaves[2], None);
    let root = Blake3Hasher::hash_list_node(&b01, Some(&b2));
    let trusted_index_hash = Blake3Hasher::hash_list_index(3, &root);

    // The proof of element 1, in both formats.
    let recursive = ListProofNode::branch(
        ListProofNode::branch(
            ListProofNode::HashOnly(leaves[0]),
            Some(ListProofNode::element(elements[1])),
        ),
        Some(ListProofNode::HashOnly(b2)),
    );
    let flat = FlatListProof::new(
        vec![ListProofElementEntry {
            index: 1,
            element: elements[1].to_vec(),
        }],
        vec![
            ListProofHashedEntry {
                index: 0,
                height: 0,
                hash: leaves[0],
            },
            ListProofHashedEntry {
                index: 1,
                height: 1,
                hash: b2,
            },
        ],
        3,
    );

    let checked = recursive.verify::<Blake3Hasher>();
    ensure!(checked.compare_with_root_hash(&root)?, "recursive proof root mismatch");
    tracing::info!(elements = ?checked.elements()?, "recursive list proof verified");

    let checked = flat.verify::<Blake3Hasher>();
    ensure!(
        checked.compare_with_root_hash(&trusted_index_hash)?,
        "flat proof index hash mismatch"
    );
    tracing::info!(elements = ?checked.elements()?, "flat list proof verified");

    // A map of two entries. Its root is a single branch over both leaves.
    let mut entries = vec![
        (key_path("alice"), b"100".to_vec()),
        (key_path("bob"), b"42".to_vec()),
    ];
    entries.sort();
    let [(first_key, first_value), (second_key, second_value)] = entries.as_slice() else {
        bail!("expected two map entries");
    };
    let first = PathKey::from_leaf_digest(*first_key);
    let second = PathKey::from_leaf_digest(*second_key);
    let second_hash = Blake3Hasher::hash_leaf(second_value);
    let map_root = Blake3Hasher::hash_map_node(
        &first,
        &Blake3Hasher::hash_leaf(first_value),
        &second,
        &second_hash,
    );

    // Disclose the first entry, prune the second and prove "carol" is absent.
    let proof = MapProof::new(
        vec![
            MapProofEntry::leaf(*first_key, first_value.clone()),
            MapProofEntry::hash(second, second_hash),
        ],
        vec![key_path("carol")],
    );
    let checked = proof.check::<Blake3Hasher>();
    ensure!(checked.compare_with_root_hash(&map_root)?, "map proof root mismatch");
    ensure!(checked.get(first_key)?.is_some(), "disclosed entry not found");
    ensure!(!checked.contains_key(&key_path("carol"))?, "carol should be absent");
    tracing::info!(
        disclosed = checked.entries()?.len(),
        missing = checked.missing_keys()?.len(),
        "map proof verified"
    );

    Ok(())
}

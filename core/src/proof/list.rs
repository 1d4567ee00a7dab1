//! Proofs of list elements, in the shape of a sparse Merkle tree.
//!
//! A list of `n` elements is hashed as a binary tree with all elements at the same depth. Each
//! level is paired left to right; the last node of an odd-sized level gets a branch with no right
//! child:
//!
//! ```text
//!            root
//!          /      \
//!       b(0,1)    b(2)
//!       /   \       |
//!     e0     e1    e2
//! ```
//!
//! A proof discloses some elements and replaces every subtree without disclosed elements with its
//! digest.

use std::{collections::BTreeMap, mem};

use crate::{
    error::ProofError,
    hasher::{Digest, ProofHasher, EMPTY_DIGEST},
    options::VerifierOptions,
};

/// A node of a recursive list proof.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ListProofNode {
    /// An interior node of the tree. The right child is absent only for the last node of an
    /// odd-sized level.
    Branch {
        left: Box<ListProofNode>,
        right: Option<Box<ListProofNode>>,
    },
    /// A pruned subtree, given by its digest.
    HashOnly(Digest),
    /// A disclosed element.
    Element(Vec<u8>),
}

/// The outcome of checking a list proof, recursive or flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListProofStatus {
    /// The proof is well-formed.
    Valid,
    /// An element is deeper than allowed.
    InvalidElementNodeDepth,
    /// A pruned subtree is deeper than allowed.
    InvalidHashNodeDepth,
    /// A branch is deeper than allowed.
    InvalidBranchNodeDepth,
    /// Elements appear at different depths.
    InvalidNodeDepth,
    /// The tree has branches, but discloses no elements.
    InvalidTreeNoElements,
    /// A branch has two pruned children, so it should have been pruned itself.
    InvalidHashNodesCount,
    /// A flat proof claims a size over the configured maximum.
    InvalidSize,
    /// A flat proof of an empty list carries entries.
    InvalidEmptyListProof,
    /// A flat proof entry has a height which does not exist in a list of the claimed size.
    InvalidHeight,
    /// A flat proof entry has an index past the end of its level.
    InvalidIndex,
    /// A flat proof has two entries at the same position.
    DuplicateEntry,
    /// A flat proof has a digest for a node which is either computable or unneeded.
    RedundantEntry,
    /// A flat proof lacks a digest needed to compute the root.
    IncompleteProof,
}

/// The result of verifying a list proof.
///
/// The root hash and the elements can only be accessed if the proof is valid. Accessing them
/// otherwise is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedListProof {
    status: ListProofStatus,
    root_hash: Digest,
    index_hash: Option<Digest>,
    elements: BTreeMap<u64, Vec<u8>>,
}

impl CheckedListProof {
    pub(crate) fn valid(
        root_hash: Digest,
        elements: BTreeMap<u64, Vec<u8>>,
        index_hash: Option<Digest>,
    ) -> Self {
        CheckedListProof {
            status: ListProofStatus::Valid,
            root_hash,
            index_hash,
            elements,
        }
    }

    pub(crate) fn invalid(status: ListProofStatus) -> Self {
        CheckedListProof {
            status,
            root_hash: [0; 32],
            index_hash: None,
            elements: BTreeMap::new(),
        }
    }

    /// The status of the proof.
    pub fn status(&self) -> ListProofStatus {
        self.status
    }

    /// Whether the proof is valid.
    pub fn is_valid(&self) -> bool {
        self.status == ListProofStatus::Valid
    }

    /// The root of the list tree.
    pub fn root_hash(&self) -> Result<Digest, ProofError> {
        self.check_valid()?;
        Ok(self.root_hash)
    }

    /// The hash binding the list size to the tree root.
    ///
    /// Only flat proofs know the size of the list, so this is `None` for recursive proofs.
    pub fn index_hash(&self) -> Result<Option<Digest>, ProofError> {
        self.check_valid()?;
        Ok(self.index_hash)
    }

    /// The disclosed elements, by index.
    pub fn elements(&self) -> Result<&BTreeMap<u64, Vec<u8>>, ProofError> {
        self.check_valid()?;
        Ok(&self.elements)
    }

    /// Whether the proof is valid and has the expected root.
    ///
    /// Flat proofs are compared by their index hash, recursive proofs by their tree root.
    pub fn compare_with_root_hash(&self, expected: &Digest) -> Result<bool, ProofError> {
        self.check_valid()?;
        Ok(self.index_hash.as_ref().unwrap_or(&self.root_hash) == expected)
    }

    fn check_valid(&self) -> Result<(), ProofError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ProofError::InvalidListProof(self.status))
        }
    }
}

impl ListProofNode {
    /// Create a branch node.
    pub fn branch(left: ListProofNode, right: Option<ListProofNode>) -> Self {
        ListProofNode::Branch {
            left: Box::new(left),
            right: right.map(Box::new),
        }
    }

    /// Create an element node.
    pub fn element(value: impl Into<Vec<u8>>) -> Self {
        ListProofNode::Element(value.into())
    }

    /// Verify the proof with the default options. See [`ListProofNode::verify_with`].
    pub fn verify<H: ProofHasher>(&self) -> CheckedListProof {
        self.verify_with::<H>(&VerifierOptions::default())
    }

    /// Verify the proof, computing the tree root and collecting the disclosed elements by index.
    ///
    /// A bare digest discloses nothing and verifies to itself, with no elements.
    pub fn verify_with<H: ProofHasher>(&self, options: &VerifierOptions) -> CheckedListProof {
        let status = check_structure(self, options.max_list_depth as usize);
        if status != ListProofStatus::Valid {
            tracing::debug!(?status, "list proof rejected");
            return CheckedListProof::invalid(status);
        }

        let mut elements = BTreeMap::new();
        let root = fold::<H>(self, 0, &mut elements);
        tracing::trace!(
            elements = elements.len(),
            root = %hex::encode(root),
            "list proof verified"
        );
        CheckedListProof::valid(root, elements, None)
    }
}

// Tears the tree down with a worklist, so dropping a deep chain does not recurse.
impl Drop for ListProofNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_children(self, &mut pending);
        while let Some(mut node) = pending.pop() {
            take_children(&mut node, &mut pending);
        }
    }
}

fn take_children(node: &mut ListProofNode, pending: &mut Vec<ListProofNode>) {
    if let ListProofNode::Branch { left, right } = node {
        pending.push(mem::replace(&mut **left, ListProofNode::HashOnly(EMPTY_DIGEST)));
        if let Some(right) = right.take() {
            pending.push(*right);
        }
    }
}

// Walks the tree without recursion, never going deeper than one level past `max_depth`.
fn check_structure(root: &ListProofNode, max_depth: usize) -> ListProofStatus {
    let mut element_too_deep = false;
    let mut hash_too_deep = false;
    let mut branch_too_deep = false;
    let mut element_depth = None;
    let mut mixed_depths = false;
    let mut branches = 0usize;
    let mut elements = 0usize;
    let mut pruned_pair = false;

    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        match node {
            ListProofNode::Branch { left, right } => {
                branches += 1;
                if depth > max_depth {
                    branch_too_deep = true;
                    continue;
                }
                if let (ListProofNode::HashOnly(_), Some(ListProofNode::HashOnly(_))) =
                    (&**left, right.as_deref())
                {
                    pruned_pair = true;
                }
                if let Some(right) = right.as_deref() {
                    stack.push((right, depth + 1));
                }
                stack.push((&**left, depth + 1));
            }
            ListProofNode::HashOnly(_) => {
                if depth > max_depth {
                    hash_too_deep = true;
                }
            }
            ListProofNode::Element(_) => {
                elements += 1;
                if depth > max_depth {
                    element_too_deep = true;
                }
                match element_depth {
                    None => element_depth = Some(depth),
                    Some(seen) if seen != depth => mixed_depths = true,
                    Some(_) => {}
                }
            }
        }
    }

    if element_too_deep {
        ListProofStatus::InvalidElementNodeDepth
    } else if hash_too_deep {
        ListProofStatus::InvalidHashNodeDepth
    } else if branch_too_deep {
        ListProofStatus::InvalidBranchNodeDepth
    } else if mixed_depths {
        ListProofStatus::InvalidNodeDepth
    } else if branches > 0 && elements == 0 {
        ListProofStatus::InvalidTreeNoElements
    } else if pruned_pair {
        ListProofStatus::InvalidHashNodesCount
    } else {
        ListProofStatus::Valid
    }
}

// Only called on trees which passed `check_structure`, so the recursion is bounded by the
// maximum depth.
fn fold<H: ProofHasher>(
    node: &ListProofNode,
    index: u64,
    elements: &mut BTreeMap<u64, Vec<u8>>,
) -> Digest {
    match node {
        ListProofNode::Branch { left, right } => {
            let left = fold::<H>(left, index * 2, elements);
            let right = right
                .as_deref()
                .map(|right| fold::<H>(right, index * 2 + 1, elements));
            H::hash_list_node(&left, right.as_ref())
        }
        ListProofNode::HashOnly(digest) => *digest,
        ListProofNode::Element(value) => {
            elements.insert(index, value.clone());
            H::hash_leaf(value)
        }
    }
}

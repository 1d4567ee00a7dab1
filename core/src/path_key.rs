//! Keys addressing nodes of the binary Merkle-Patricia trie behind map proofs.
//!
//! A [`PathKey`] is a bit-string of up to 256 bits. Keys shorter than 256 bits identify a fork
//! of the trie (a branch); keys of exactly 256 bits are the digests of user keys and identify
//! terminal entries (leaves). Bits are read most-significant-bit first within each byte.

use crate::error::InvalidKey;
use arrayvec::ArrayVec;
use bitvec::prelude::*;
use core::{cmp::Ordering, fmt};
use integer_encoding::VarInt;

/// The size of a full key in bytes.
pub const KEY_SIZE: usize = 32;

/// The digest of a user key, locating its entry in the trie. All key paths have a 256 bit fixed
/// length.
pub type KeyPath = [u8; KEY_SIZE];

/// The size of a full key in bits. Only leaf keys have this length.
pub const KEY_SIZE_BITS: u16 = 256;

/// The largest possible size of [`PathKey::encoded`]: two bytes of length prefix, followed by
/// the whole key.
pub const MAX_ENCODED_LEN: usize = 2 + KEY_SIZE;

/// The kind of trie node a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A fork of the trie, addressed by a prefix shorter than a full key.
    Branch,
    /// A terminal entry, addressed by a full key.
    Leaf,
}

/// An immutable bit-string identifying a position in the trie.
///
/// # Ordering
///
/// Keys are ordered by their significant bits, compared lexicographically over the length of
/// the shorter key. When one key is a prefix of the other, the shorter key is the lesser.
///
/// Bits after `bit_len` are always unset, which makes structural equality agree with the
/// ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawPathKey", into = "RawPathKey")
)]
pub struct PathKey {
    bits: [u8; KEY_SIZE],
    bit_len: u16,
}

impl PathKey {
    /// The key of the root branch: zero significant bits.
    pub const fn root() -> Self {
        PathKey {
            bits: [0; KEY_SIZE],
            bit_len: 0,
        }
    }

    /// Create a leaf key from the digest of a user key.
    pub const fn from_leaf_digest(key: KeyPath) -> Self {
        PathKey {
            bits: key,
            bit_len: KEY_SIZE_BITS,
        }
    }

    /// Create a leaf key from a 32-byte buffer.
    pub fn leaf(key: &[u8]) -> Result<Self, InvalidKey> {
        let bits = key
            .try_into()
            .map_err(|_| InvalidKey::BufferLength(key.len()))?;
        Ok(Self::from_leaf_digest(bits))
    }

    /// Create a branch key from a 32-byte buffer whose first `bit_len` bits are significant.
    ///
    /// Fails if `bit_len` is not in `[0, 255]` or if any bit after the prefix is set.
    pub fn branch(prefix: &[u8], bit_len: u16) -> Result<Self, InvalidKey> {
        let bits: [u8; KEY_SIZE] = prefix
            .try_into()
            .map_err(|_| InvalidKey::BufferLength(prefix.len()))?;
        if bit_len >= KEY_SIZE_BITS {
            return Err(InvalidKey::BranchLength(bit_len));
        }
        if bits.view_bits::<Msb0>()[bit_len as usize..].any() {
            return Err(InvalidKey::TrailingBits(bit_len));
        }
        Ok(PathKey { bits, bit_len })
    }

    /// Create a key out of a bit-string: a leaf if it holds 256 bits, a branch otherwise.
    pub fn from_bits(bits: &BitSlice<u8, Msb0>) -> Result<Self, InvalidKey> {
        if bits.len() > KEY_SIZE_BITS as usize {
            return Err(InvalidKey::BranchLength(
                u16::try_from(bits.len()).unwrap_or(u16::MAX),
            ));
        }
        let mut key = PathKey::root();
        key.bits.view_bits_mut::<Msb0>()[..bits.len()].copy_from_bitslice(bits);
        key.bit_len = bits.len() as u16;
        Ok(key)
    }

    /// The kind of node this key refers to.
    pub fn kind(&self) -> NodeKind {
        if self.bit_len == KEY_SIZE_BITS {
            NodeKind::Leaf
        } else {
            NodeKind::Branch
        }
    }

    /// Whether this is a leaf key.
    pub fn is_leaf(&self) -> bool {
        self.kind() == NodeKind::Leaf
    }

    /// The number of significant bits.
    pub fn bit_len(&self) -> u16 {
        self.bit_len
    }

    /// The significant bits of the key.
    pub fn bits(&self) -> &BitSlice<u8, Msb0> {
        &self.bits.view_bits::<Msb0>()[..self.bit_len as usize]
    }

    /// Get the bit at `index`, or `None` past the significant bits.
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.bits().get(index).map(|bit| *bit)
    }

    /// The whole backing buffer. Bits after [`PathKey::bit_len`] are unset.
    pub fn raw(&self) -> &[u8; KEY_SIZE] {
        &self.bits
    }

    /// The minimal byte slice covering the significant bits.
    pub fn significant_bytes(&self) -> &[u8] {
        &self.bits[..(self.bit_len as usize + 7) / 8]
    }

    /// The number of leading bits shared by both keys.
    pub fn common_prefix_len(&self, other: &PathKey) -> u16 {
        let max = core::cmp::min(self.bit_len, other.bit_len);
        let mut len = 0u16;
        for (a, b) in self.bits.iter().zip(other.bits.iter()) {
            let diff = a ^ b;
            if diff != 0 {
                len += diff.leading_zeros() as u16;
                break;
            }
            len += 8;
        }
        core::cmp::min(len, max)
    }

    /// The longest key which is a prefix of both keys.
    ///
    /// This is the key itself when both keys are equal, and a branch key otherwise.
    pub fn common_prefix(&self, other: &PathKey) -> PathKey {
        if self == other {
            return *self;
        }
        let len = self.common_prefix_len(other);
        let mut bits = self.bits;
        bits.view_bits_mut::<Msb0>()[len as usize..].fill(false);
        PathKey { bits, bit_len: len }
    }

    /// Whether this key is a prefix of `other`. Every key is a prefix of itself.
    pub fn is_prefix_of(&self, other: &PathKey) -> bool {
        self.bit_len <= other.bit_len && self.common_prefix_len(other) == self.bit_len
    }

    /// The canonical hash input of the key: `LEB128(bit_len)` followed by exactly
    /// `ceil(bit_len / 8)` bytes of the key.
    ///
    /// Keys of different lengths never share an encoding, even if their buffers are equal.
    pub fn encoded(&self) -> ArrayVec<u8, MAX_ENCODED_LEN> {
        let mut len_prefix = [0u8; 3];
        let prefix_len = self.bit_len.encode_var(&mut len_prefix);

        let mut out = ArrayVec::new();
        out.extend(len_prefix[..prefix_len].iter().copied());
        out.extend(self.significant_bytes().iter().copied());
        out
    }

    /// Write the canonical hash input of the key into `sink`. See [`PathKey::encoded`].
    pub fn encode_for_hashing(&self, sink: &mut impl Extend<u8>) {
        sink.extend(self.encoded());
    }
}

impl Default for PathKey {
    fn default() -> Self {
        PathKey::root()
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let common = core::cmp::min(self.bit_len, other.bit_len) as usize;
        let lhs = &self.bits.view_bits::<Msb0>()[..common];
        let rhs = &other.bits.view_bits::<Msb0>()[..common];
        lhs.cmp(rhs).then(self.bit_len.cmp(&other.bit_len))
    }
}

impl fmt::Debug for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bit_len == 0 {
            write!(f, "PathKey(root)")
        } else {
            write!(
                f,
                "PathKey({}/{})",
                hex::encode(self.significant_bytes()),
                self.bit_len
            )
        }
    }
}

impl From<KeyPath> for PathKey {
    fn from(key: KeyPath) -> Self {
        PathKey::from_leaf_digest(key)
    }
}

/// The unchecked shape of a [`PathKey`], validated when deserializing.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawPathKey {
    bits: [u8; KEY_SIZE],
    bit_len: u16,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPathKey> for PathKey {
    type Error = InvalidKey;

    fn try_from(raw: RawPathKey) -> Result<Self, Self::Error> {
        if raw.bit_len == KEY_SIZE_BITS {
            Ok(PathKey::from_leaf_digest(raw.bits))
        } else {
            PathKey::branch(&raw.bits, raw.bit_len)
        }
    }
}

#[cfg(feature = "serde")]
impl From<PathKey> for RawPathKey {
    fn from(key: PathKey) -> Self {
        RawPathKey {
            bits: key.bits,
            bit_len: key.bit_len,
        }
    }
}

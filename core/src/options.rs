/// The deepest level at which a node of a recursive list proof may appear, by default.
pub const DEFAULT_MAX_LIST_DEPTH: u8 = 63;

/// The largest size a flat list proof may claim, by default: 2^56.
pub const DEFAULT_MAX_LIST_SIZE: u64 = 1 << 56;

/// Limits applied when verifying proofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOptions {
    /// The deepest level, with the root at 0, where a node of a recursive list proof may appear.
    pub(crate) max_list_depth: u8,
    /// The largest size a flat list proof may claim.
    pub(crate) max_list_size: u64,
}

impl VerifierOptions {
    /// Create a new `VerifierOptions` instance with the default values.
    pub fn new() -> Self {
        Self {
            max_list_depth: DEFAULT_MAX_LIST_DEPTH,
            max_list_size: DEFAULT_MAX_LIST_SIZE,
        }
    }

    /// Set the deepest level at which a list proof node may appear.
    ///
    /// Values above 63 are rounded down to 63, so that element indices fit in 64 bits.
    ///
    /// Default: 63.
    pub fn max_list_depth(&mut self, max_list_depth: u8) {
        self.max_list_depth = core::cmp::min(max_list_depth, DEFAULT_MAX_LIST_DEPTH);
    }

    /// Set the largest size a flat list proof may claim.
    ///
    /// Values above 2^56 are rounded down to 2^56.
    ///
    /// Default: 2^56.
    pub fn max_list_size(&mut self, max_list_size: u64) {
        self.max_list_size = core::cmp::min(max_list_size, DEFAULT_MAX_LIST_SIZE);
    }
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self::new()
    }
}

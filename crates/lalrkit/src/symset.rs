//! Dense symbol bitsets.
//!
//! Construction works over dense integer symbol ids, so sets of terminals
//! (first sets, lookahead sets, Read/Follow sets) are stored as bit vectors
//! rather than hash sets. Unions report whether they changed anything, which
//! is what the fixpoint loops in grammar analysis and the lookahead solver
//! key on.

use smallvec::SmallVec;

const BLOCK_BITS: usize = 64;

/// A growable set of dense symbol ids backed by `u64` blocks.
#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolSet {
    blocks: SmallVec<[u64; 2]>,
}

impl SymbolSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symbol, returning `true` if it was not already present.
    pub fn insert(&mut self, symbol: usize) -> bool {
        let (block, bit) = (symbol / BLOCK_BITS, symbol % BLOCK_BITS);
        if block >= self.blocks.len() {
            self.blocks.resize(block + 1, 0);
        }
        let mask = 1u64 << bit;
        let was_absent = self.blocks[block] & mask == 0;
        self.blocks[block] |= mask;
        was_absent
    }

    #[must_use]
    pub fn contains(&self, symbol: usize) -> bool {
        let (block, bit) = (symbol / BLOCK_BITS, symbol % BLOCK_BITS);
        self.blocks
            .get(block)
            .is_some_and(|b| b & (1u64 << bit) != 0)
    }

    /// Union `other` into `self`, returning `true` if any bit was added.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if other.blocks.len() > self.blocks.len() {
            self.blocks.resize(other.blocks.len(), 0);
        }
        let mut changed = false;
        for (dst, src) in self.blocks.iter_mut().zip(&other.blocks) {
            let before = *dst;
            *dst |= src;
            changed |= *dst != before;
        }
        changed
    }

    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.blocks
            .iter()
            .enumerate()
            .all(|(i, b)| b & !other.blocks.get(i).copied().unwrap_or(0) == 0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| *b == 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Iterate the contained symbols in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().enumerate().flat_map(|(i, &block)| {
            (0..BLOCK_BITS)
                .filter(move |bit| block & (1u64 << bit) != 0)
                .map(move |bit| i * BLOCK_BITS + bit)
        })
    }
}

impl FromIterator<usize> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}

impl Extend<usize> for SymbolSet {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        for symbol in iter {
            self.insert(symbol);
        }
    }
}

impl std::fmt::Debug for SymbolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

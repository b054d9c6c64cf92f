//! LR(0) items.

use crate::grammar::{Grammar, ProductionId, Symbol};

/// A production paired with a dot position marking parse progress.
///
/// Equality and ordering are by `(production, dot)` only; items are plain
/// values with no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item {
    production: ProductionId,
    dot: usize,
}

impl Item {
    #[must_use]
    pub const fn new(production: ProductionId, dot: usize) -> Self {
        Self { production, dot }
    }

    #[must_use]
    pub const fn production(&self) -> ProductionId {
        self.production
    }

    #[must_use]
    pub const fn dot(&self) -> usize {
        self.dot
    }

    /// The symbol immediately after the dot, or `None` for a reduce item.
    #[must_use]
    pub fn next_symbol(&self, grammar: &Grammar) -> Option<Symbol> {
        grammar.production(self.production).rhs().get(self.dot).copied()
    }

    /// The item with the dot advanced one position.
    #[must_use]
    pub const fn advanced(&self) -> Self {
        Self::new(self.production, self.dot + 1)
    }

    /// True once the dot has passed the whole right-hand side.
    #[must_use]
    pub fn is_reduce(&self, grammar: &Grammar) -> bool {
        self.dot == grammar.production(self.production).len()
    }
}

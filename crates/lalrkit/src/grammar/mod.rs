//! # Grammar Model
//!
//! Symbols, productions, and the derived per-symbol indices the automaton
//! builder and lookahead solver work from.
//!
//! ## Overview
//!
//! - Symbols are dense integer ids. Terminals and nonterminals share one id
//!   space; a symbol is a terminal iff no production has it as left-hand side.
//!   The pseudo-terminal [`Grammar::eof`] (`= symbol_count`) marks end of
//!   input and never appears in any production.
//! - Productions are addressed by dense index. Production 0 is the wrapped
//!   top production: its left-hand side is the start symbol and that symbol
//!   appears on no right-hand side.
//! - The grammar caches, per symbol, the productions having it as LHS
//!   ("alternatives") and the `(production, offset)` pairs referencing it on
//!   a RHS ("users"). The cache is invalidated by any production add/remove
//!   and rebuilt lazily.
//!
//! A grammar is mutated while it is being assembled and frozen before
//! automaton construction begins; nothing in the construction pipeline
//! mutates it.

mod analysis;
mod builder;

pub use builder::GrammarBuilder;

use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::OnceLock;
use thiserror::Error;

/// Dense symbol id. Terminals and nonterminals share the id space.
pub type Symbol = usize;

/// Dense production index into [`Grammar::production`].
pub type ProductionId = usize;

/// A production `lhs -> rhs[0] .. rhs[n-1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Production {
    lhs: Symbol,
    rhs: SmallVec<[Symbol; 4]>,
}

impl Production {
    #[must_use]
    pub fn new(lhs: Symbol, rhs: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            lhs,
            rhs: rhs.into_iter().collect(),
        }
    }

    #[must_use]
    pub const fn lhs(&self) -> Symbol {
        self.lhs
    }

    #[must_use]
    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    /// Right-hand side length, i.e. how many stack entries a reduce pops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }
}

/// Maps symbol ids to display names, used for diagnostics only.
///
/// Passed explicitly wherever names are needed; construction never consults
/// process-wide state.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: Vec<CompactString>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a name, returning the symbol id it was assigned.
    pub fn add(&mut self, name: impl AsRef<str>) -> Symbol {
        let id = self.names.len();
        self.names.push(CompactString::new(name.as_ref()));
        id
    }

    /// Look up an already-registered name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn name(&self, symbol: Symbol) -> &str {
        self.names
            .get(symbol)
            .map_or("<unknown>", CompactString::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Fatal grammar defects, reported by [`Grammar::check`] before any automaton
/// work begins.
#[derive(Debug, Clone, Error)]
pub enum GrammarError {
    /// All unproductive and unreachable symbols, collected into one report.
    #[error(
        "unusable symbols in grammar: unproductive [{}], unreachable [{}]",
        .unproductive.join(", "),
        .unreachable.join(", ")
    )]
    UnusableSymbols {
        unproductive: Vec<String>,
        unreachable: Vec<String>,
    },
}

/// Derived per-symbol indices, rebuilt lazily after mutation.
#[derive(Debug)]
struct SymbolIndex {
    /// Productions with the symbol as LHS.
    alternatives: Vec<Vec<ProductionId>>,
    /// `(production, offset)` pairs with the symbol on the RHS.
    users: Vec<Vec<(ProductionId, usize)>>,
}

impl SymbolIndex {
    fn build(symbol_count: usize, productions: &[Production]) -> Self {
        let mut alternatives = vec![Vec::new(); symbol_count];
        let mut users = vec![Vec::new(); symbol_count];
        for (id, production) in productions.iter().enumerate() {
            alternatives[production.lhs].push(id);
            for (offset, &symbol) in production.rhs.iter().enumerate() {
                users[symbol].push((id, offset));
            }
        }
        Self {
            alternatives,
            users,
        }
    }
}

/// A context-free grammar over dense symbol ids.
#[derive(Debug)]
pub struct Grammar {
    symbol_count: usize,
    productions: Vec<Production>,
    index: OnceLock<SymbolIndex>,
}

impl Grammar {
    /// Create an empty grammar over `symbol_count` symbols.
    #[must_use]
    pub fn new(symbol_count: usize) -> Self {
        Self {
            symbol_count,
            productions: Vec::new(),
            index: OnceLock::new(),
        }
    }

    #[must_use]
    pub const fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// The end-of-input pseudo-terminal, one past the last real symbol.
    #[must_use]
    pub const fn eof(&self) -> Symbol {
        self.symbol_count
    }

    /// The start symbol: production 0's left-hand side.
    ///
    /// # Panics
    ///
    /// Panics if the grammar has no productions.
    #[must_use]
    pub fn start_symbol(&self) -> Symbol {
        self.productions[0].lhs
    }

    #[must_use]
    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    #[must_use]
    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id]
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> {
        self.productions.iter()
    }

    /// Append a production, invalidating the derived indices.
    pub fn add_production(&mut self, production: Production) -> ProductionId {
        debug_assert!(production.lhs < self.symbol_count);
        debug_assert!(production.rhs.iter().all(|&s| s < self.symbol_count));
        self.index = OnceLock::new();
        self.productions.push(production);
        self.productions.len() - 1
    }

    /// Remove a production, invalidating the derived indices. Later
    /// production ids shift down by one.
    pub fn remove_production(&mut self, id: ProductionId) -> Production {
        self.index = OnceLock::new();
        self.productions.remove(id)
    }

    fn index(&self) -> &SymbolIndex {
        self.index
            .get_or_init(|| SymbolIndex::build(self.symbol_count, &self.productions))
    }

    /// A symbol is a terminal iff it has no alternatives.
    #[must_use]
    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        symbol == self.eof() || self.index().alternatives[symbol].is_empty()
    }

    #[must_use]
    pub fn alternative_count(&self, symbol: Symbol) -> usize {
        self.index().alternatives[symbol].len()
    }

    /// The `i`-th production with `symbol` as left-hand side.
    #[must_use]
    pub fn alternative(&self, symbol: Symbol, i: usize) -> ProductionId {
        self.index().alternatives[symbol][i]
    }

    /// All productions with `symbol` as left-hand side.
    #[must_use]
    pub fn alternatives(&self, symbol: Symbol) -> &[ProductionId] {
        &self.index().alternatives[symbol]
    }

    #[must_use]
    pub fn user_count(&self, symbol: Symbol) -> usize {
        self.index().users[symbol].len()
    }

    /// The `i`-th production referencing `symbol` on its right-hand side.
    #[must_use]
    pub fn user(&self, symbol: Symbol, i: usize) -> ProductionId {
        self.index().users[symbol][i].0
    }

    /// The RHS offset at which the `i`-th user references `symbol`.
    #[must_use]
    pub fn user_offset(&self, symbol: Symbol, i: usize) -> usize {
        self.index().users[symbol][i].1
    }
}

//! States, shifts, and reduces of the LR(0) automaton.

use super::item::Item;
use crate::grammar::{Grammar, ProductionId, Symbol};
use crate::symset::SymbolSet;
use hashbrown::{HashMap, HashSet};

/// Index of a state in its [`Automaton`](super::Automaton).
pub type StateId = usize;

/// A labeled edge `(symbol, target)` out of a state.
///
/// The Read/Follow sets used during lookahead computation are not stored
/// here; the solver keeps them in side tables keyed by a dense shift index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub symbol: Symbol,
    pub target: StateId,
}

/// A reduction attached to a state. The lookahead set is empty until the
/// lookahead solver fills it in.
#[derive(Debug, Clone)]
pub struct Reduce {
    pub production: ProductionId,
    pub lookahead: SymbolSet,
}

/// A set of items, identified by its core.
///
/// The core is the minimal generating subset (sorted, duplicate-free);
/// closure is core plus everything added by nonterminal expansion. Two
/// states are the same state iff their cores are set-equal, and the builders
/// intern states by exactly that equality.
#[derive(Debug)]
pub struct State {
    core: Box<[Item]>,
    closure: Vec<Item>,
    shifts: Vec<Shift>,
    reduces: Vec<Reduce>,
}

impl State {
    /// The initial state: one item at dot 0 per alternative of the start
    /// symbol (production 0's LHS, wrapped so it appears on no RHS).
    #[must_use]
    pub fn create(grammar: &Grammar, start: Symbol) -> Self {
        let core: Vec<Item> = grammar
            .alternatives(start)
            .iter()
            .map(|&id| Item::new(id, 0))
            .collect();
        Self::from_core(core)
    }

    pub(crate) fn from_core(mut core: Vec<Item>) -> Self {
        core.sort_unstable();
        core.dedup();
        Self {
            core: core.into_boxed_slice(),
            closure: Vec::new(),
            shifts: Vec::new(),
            reduces: Vec::new(),
        }
    }

    pub(crate) fn install(&mut self, closure: Vec<Item>, shifts: Vec<Shift>, reduces: Vec<Reduce>) {
        self.closure = closure;
        self.shifts = shifts;
        self.reduces = reduces;
    }

    #[must_use]
    pub fn core(&self) -> &[Item] {
        &self.core
    }

    pub(crate) fn core_key(&self) -> Box<[Item]> {
        self.core.clone()
    }

    #[must_use]
    pub fn closure(&self) -> &[Item] {
        &self.closure
    }

    #[must_use]
    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    #[must_use]
    pub fn reduces(&self) -> &[Reduce] {
        &self.reduces
    }

    pub(crate) fn reduces_mut(&mut self) -> &mut [Reduce] {
        &mut self.reduces
    }

    /// The target of this state's shift on `symbol`, if any.
    #[must_use]
    pub fn shift_on(&self, symbol: Symbol) -> Option<StateId> {
        self.shifts
            .iter()
            .find(|s| s.symbol == symbol)
            .map(|s| s.target)
    }
}

/// The result of closing and partitioning one core: everything `expand`
/// needs to record about a state, computed without touching shared
/// structures (the parallel builder runs this outside the lock).
pub(crate) struct Expansion {
    pub closure: Vec<Item>,
    /// Successor cores, one per distinct symbol after a dot, ordered by
    /// symbol so state numbering is deterministic.
    pub groups: Vec<(Symbol, Vec<Item>)>,
    pub reduces: Vec<ProductionId>,
}

/// Close a core and partition the closure by the symbol after the dot.
///
/// Closure: repeatedly, for every item whose next symbol is a nonterminal,
/// add one dot-0 item per alternative of that nonterminal, with set
/// semantics. Items with no next symbol become reduces; the rest are grouped
/// into dot-advanced successor cores.
pub(crate) fn expand_core(grammar: &Grammar, core: &[Item]) -> Expansion {
    let mut closure: Vec<Item> = core.to_vec();
    let mut seen: HashSet<Item, ahash::RandomState> = closure.iter().copied().collect();

    let mut i = 0;
    while let Some(&item) = closure.get(i) {
        if let Some(symbol) = item.next_symbol(grammar)
            && !grammar.is_terminal(symbol)
        {
            for &alternative in grammar.alternatives(symbol) {
                let new_item = Item::new(alternative, 0);
                if seen.insert(new_item) {
                    closure.push(new_item);
                }
            }
        }
        i += 1;
    }

    let mut by_symbol: HashMap<Symbol, Vec<Item>, ahash::RandomState> = HashMap::default();
    let mut reduces = Vec::new();
    for &item in &closure {
        if item.is_reduce(grammar) {
            reduces.push(item.production());
        } else if let Some(symbol) = item.next_symbol(grammar) {
            by_symbol.entry(symbol).or_default().push(item.advanced());
        }
    }

    let mut groups: Vec<(Symbol, Vec<Item>)> = by_symbol.into_iter().collect();
    groups.sort_unstable_by_key(|(symbol, _)| *symbol);
    for (_, items) in &mut groups {
        items.sort_unstable();
    }
    reduces.sort_unstable();

    Expansion {
        closure,
        groups,
        reduces,
    }
}

//! # LR(0) Automaton
//!
//! Item-set closure, goto transitions, and state deduplication.
//!
//! ## Overview
//!
//! [`Automaton::build`] runs the classic worklist over a growing state
//! vector: each unexpanded state is closed, its closure partitioned by the
//! symbol after the dot, and every dot-advanced group either interned against
//! an existing state's core or appended as a new state. Cores are interned in
//! a hash map keyed by the sorted item core, so construction never produces
//! two states with set-equal cores.
//!
//! [`Automaton::build_parallel`] distributes the same worklist over a fixed
//! thread pool; see [`parallel`] for the termination protocol.
//!
//! States are created here and never mutated afterward, except that the
//! lookahead solver fills each reduce's lookahead set exactly once.

mod item;
mod parallel;
mod state;

pub use item::Item;
pub use state::{Reduce, Shift, State, StateId};

use crate::grammar::Grammar;
use crate::symset::SymbolSet;
use hashbrown::HashMap;
use state::expand_core;

/// The LR(0) state graph for a grammar.
#[derive(Debug)]
pub struct Automaton {
    states: Vec<State>,
}

impl Automaton {
    /// Build the automaton single-threaded.
    ///
    /// The grammar must be frozen: construction assumes stable productions
    /// and performs no mutation.
    #[must_use]
    pub fn build(grammar: &Grammar) -> Self {
        let start = grammar.start_symbol();
        let mut states = vec![State::create(grammar, start)];
        let mut interned: HashMap<Box<[Item]>, StateId, ahash::RandomState> = HashMap::default();
        interned.insert(states[0].core_key(), 0);

        // The state list grows while we iterate it.
        let mut current = 0;
        while current < states.len() {
            let expansion = expand_core(grammar, &states[current].core_key());

            let mut shifts = Vec::with_capacity(expansion.groups.len());
            for (symbol, successor_core) in expansion.groups {
                let key = successor_core.into_boxed_slice();
                let next_id = states.len();
                let target = match interned.entry(key) {
                    hashbrown::hash_map::Entry::Occupied(entry) => *entry.get(),
                    hashbrown::hash_map::Entry::Vacant(entry) => {
                        states.push(State::from_core(entry.key().to_vec()));
                        *entry.insert(next_id)
                    }
                };
                shifts.push(Shift { symbol, target });
            }

            let reduces = expansion
                .reduces
                .into_iter()
                .map(|production| Reduce {
                    production,
                    lookahead: SymbolSet::new(),
                })
                .collect();

            states[current].install(expansion.closure, shifts, reduces);
            current += 1;
        }

        Self { states }
    }

    /// Build the automaton with a pool of `workers` threads.
    ///
    /// Produces the same set of states as [`Automaton::build`]; state
    /// numbering may differ because expansion order depends on scheduling.
    #[must_use]
    pub fn build_parallel(grammar: &Grammar, workers: usize) -> Self {
        parallel::build(grammar, workers)
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    #[must_use]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub(crate) fn states_mut(&mut self) -> &mut [State] {
        &mut self.states
    }

    /// The target of `state`'s transition on `symbol`, if any.
    #[must_use]
    pub fn goto(&self, state: StateId, symbol: crate::grammar::Symbol) -> Option<StateId> {
        self.states[state].shift_on(symbol)
    }
}

//! Worker-pool automaton construction.
//!
//! The worklist of "state needs closure + expansion" tasks is drained by a
//! fixed pool. The only shared mutable structures are the interned-state
//! table and the queue, both behind a single lock; closure and partitioning
//! run outside the lock since they read only the frozen grammar.
//!
//! Termination: a worker that finds the queue empty counts itself idle and
//! waits. When the idle count reaches the pool size every task is done and
//! no worker can produce more, so the last one to go idle flips `done` and
//! wakes the rest.

use super::state::{expand_core, Reduce, Shift, State, StateId};
use super::{Automaton, Item};
use crate::grammar::Grammar;
use crate::symset::SymbolSet;
use hashbrown::HashMap;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};

struct Shared {
    states: Vec<State>,
    interned: HashMap<Box<[Item]>, StateId, ahash::RandomState>,
    queue: VecDeque<StateId>,
    idle: usize,
    done: bool,
}

pub(super) fn build(grammar: &Grammar, workers: usize) -> Automaton {
    let workers = workers.max(1);
    let start = grammar.start_symbol();

    let initial = State::create(grammar, start);
    let mut interned: HashMap<Box<[Item]>, StateId, ahash::RandomState> = HashMap::default();
    interned.insert(initial.core_key(), 0);

    let shared = Mutex::new(Shared {
        states: vec![initial],
        interned,
        queue: VecDeque::from([0]),
        idle: 0,
        done: false,
    });
    let ready = Condvar::new();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| run_worker(grammar, workers, &shared, &ready));
        }
    });

    let shared = shared
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    Automaton {
        states: shared.states,
    }
}

fn run_worker(grammar: &Grammar, workers: usize, shared: &Mutex<Shared>, ready: &Condvar) {
    let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        if guard.done {
            return;
        }

        if let Some(id) = guard.queue.pop_front() {
            let core = guard.states[id].core_key();
            drop(guard);

            // Pure work against the frozen grammar; no lock held.
            let expansion = expand_core(grammar, &core);

            guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            let mut shifts = Vec::with_capacity(expansion.groups.len());
            for (symbol, successor_core) in expansion.groups {
                let key = successor_core.into_boxed_slice();
                let next_id = guard.states.len();
                let target = if let Some(&existing) = guard.interned.get(&key) {
                    existing
                } else {
                    guard.interned.insert(key.clone(), next_id);
                    guard.states.push(State::from_core(key.to_vec()));
                    guard.queue.push_back(next_id);
                    ready.notify_one();
                    next_id
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
            guard.states[id].install(expansion.closure, shifts, reduces);
            continue;
        }

        guard.idle += 1;
        if guard.idle == workers {
            // Everyone is blocked on an empty queue: construction converged.
            guard.done = true;
            ready.notify_all();
            return;
        }
        while guard.queue.is_empty() && !guard.done {
            guard = ready
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        guard.idle -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, Production};

    #[test]
    fn test_single_worker_pool() {
        let mut g = Grammar::new(3);
        g.add_production(Production::new(0, [1]));
        g.add_production(Production::new(1, [2]));
        let automaton = build(&g, 1);
        assert_eq!(automaton.state_count(), 3);
    }

    #[test]
    fn test_pool_terminates_on_trivial_grammar() {
        let mut b = GrammarBuilder::new();
        let s = b.symbol("S");
        let a = b.symbol("a");
        b.production(s, [a]);
        let (grammar, _) = b.build(s);
        let automaton = build(&grammar, 8);
        // More workers than states must still drain and agree on idle-count
        // termination.
        assert_eq!(automaton.state_count(), Automaton::build(&grammar).state_count());
    }
}

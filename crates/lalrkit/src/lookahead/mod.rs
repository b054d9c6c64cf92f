//! # Lookahead Solver
//!
//! Computes LALR(1) lookahead sets over the LR(0) automaton using the
//! DeRemer–Pennello digraph algorithm.
//!
//! ## Overview
//!
//! Every shift edge `t = (p --X--> S)` gets two terminal sets:
//!
//! - `Read(t)`: terminals readable immediately after taking `t`, directly
//!   (terminals `S` itself shifts) or through nullable symbols (any shift
//!   out of `S` on a nullable symbol implies its Read into `t`'s).
//! - `Follow(t)`: everything in `Read(t)` plus terminals that can follow the
//!   reduction of `X`. Whenever an alternative of `X` is traced from `p` and
//!   the suffix after a traced shift `v` is nullable, completing that
//!   alternative makes whatever follows `t` also follow `v`, so
//!   `Follow(v) ⊇ Follow(t)`.
//!
//! Both sets are solved by the same SCC fixpoint ([`digraph`]) run twice:
//! once over the Read implications, then over the Follow implications seeded
//! with the Read results. A reduce's lookahead is the union of `Follow(t)`
//! over every shift `t` whose trace ended at the reduce's state ("lookback").
//!
//! The solver owns all of its working state in side tables keyed by a dense
//! shift index; it never writes to the automaton except to install the final
//! reduce lookaheads, once.

use crate::automaton::{Automaton, StateId};
use crate::grammar::{Grammar, ProductionId, Symbol};
use crate::symset::SymbolSet;
use hashbrown::HashMap;

/// Read and Follow sets for every shift edge, keyed by `(state, symbol)`.
#[derive(Debug)]
pub struct ShiftSets {
    index: HashMap<(StateId, Symbol), usize, ahash::RandomState>,
    read: Vec<SymbolSet>,
    follow: Vec<SymbolSet>,
}

impl ShiftSets {
    /// `Read` of the shift out of `state` on `symbol`.
    #[must_use]
    pub fn read(&self, state: StateId, symbol: Symbol) -> Option<&SymbolSet> {
        self.index.get(&(state, symbol)).map(|&i| &self.read[i])
    }

    /// `Follow` of the shift out of `state` on `symbol`.
    #[must_use]
    pub fn follow(&self, state: StateId, symbol: Symbol) -> Option<&SymbolSet> {
        self.index.get(&(state, symbol)).map(|&i| &self.follow[i])
    }

    #[must_use]
    pub fn shift_count(&self) -> usize {
        self.read.len()
    }

    /// Iterate `(state, symbol, read, follow)` for every shift edge.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, Symbol, &SymbolSet, &SymbolSet)> {
        self.index
            .iter()
            .map(|(&(state, symbol), &i)| (state, symbol, &self.read[i], &self.follow[i]))
    }
}

/// Compute Read/Follow for every shift and install reduce lookaheads.
///
/// Must run to completion after automaton construction converges and before
/// any reduce lookahead is consumed; it is single-threaded by design.
pub fn solve(grammar: &Grammar, automaton: &mut Automaton) -> ShiftSets {
    let nullable = grammar.nullable_set();
    let eof = grammar.eof();

    // Dense shift numbering, state by state.
    let mut index: HashMap<(StateId, Symbol), usize, ahash::RandomState> = HashMap::default();
    let mut targets = Vec::new();
    for (state_id, state) in automaton.states().iter().enumerate() {
        for shift in state.shifts() {
            index.insert((state_id, shift.symbol), targets.len());
            targets.push(shift.target);
        }
    }
    let shift_count = targets.len();

    // ReadInit(t): terminals the target state shifts directly.
    // ReadImplies(t): the target state's shifts on nullable symbols.
    let mut read = vec![SymbolSet::new(); shift_count];
    let mut read_implies: Vec<Vec<usize>> = vec![Vec::new(); shift_count];
    for (t, &target) in targets.iter().enumerate() {
        for shift in automaton.state(target).shifts() {
            if grammar.is_terminal(shift.symbol) {
                read[t].insert(shift.symbol);
            }
            if nullable.contains(shift.symbol) {
                read_implies[t].push(index[&(target, shift.symbol)]);
            }
        }
    }

    // FollowImplies and lookback, found by tracing each alternative's RHS
    // through the automaton from the shift's source state.
    let mut follow_seed = vec![SymbolSet::new(); shift_count];
    let mut follow_implies: Vec<Vec<usize>> = vec![Vec::new(); shift_count];
    let mut lookback: HashMap<(StateId, ProductionId), Vec<usize>, ahash::RandomState> =
        HashMap::default();

    for (state_id, state) in automaton.states().iter().enumerate() {
        for shift in state.shifts() {
            if grammar.is_terminal(shift.symbol) {
                continue;
            }
            let t = index[&(state_id, shift.symbol)];
            for &production in grammar.alternatives(shift.symbol) {
                let end = trace_alternative(
                    grammar,
                    automaton,
                    &index,
                    &nullable,
                    state_id,
                    production,
                    |v| follow_implies[v].push(t),
                );
                lookback.entry((end, production)).or_default().push(t);
            }
        }
    }

    // The wrapped top production has no incoming shift on its LHS; it plays
    // the part of a virtual transition whose Follow is exactly {eof}.
    let start = grammar.start_symbol();
    let mut eof_reduces = Vec::new();
    for &production in grammar.alternatives(start) {
        let end = trace_alternative(
            grammar,
            automaton,
            &index,
            &nullable,
            0,
            production,
            |v| {
                follow_seed[v].insert(eof);
            },
        );
        eof_reduces.push((end, production));
    }

    // Read, then Follow seeded with Read.
    digraph(&mut read, &read_implies);
    let mut follow = read.clone();
    for (f, seed) in follow.iter_mut().zip(&follow_seed) {
        f.union_with(seed);
    }
    digraph(&mut follow, &follow_implies);

    // Reduce lookahead: union of Follow over the reduce's lookback shifts.
    for (state_id, state) in automaton.states_mut().iter_mut().enumerate() {
        for reduce in state.reduces_mut() {
            if let Some(shifts) = lookback.get(&(state_id, reduce.production)) {
                for &t in shifts {
                    reduce.lookahead.union_with(&follow[t]);
                }
            }
        }
    }
    for (state_id, production) in eof_reduces {
        for reduce in automaton.states_mut()[state_id].reduces_mut() {
            if reduce.production == production {
                reduce.lookahead.insert(eof);
            }
        }
    }

    ShiftSets {
        index,
        read,
        follow,
    }
}

/// Walk `production`'s RHS through the automaton starting at `from`,
/// invoking `on_nullable_suffix` for every traversed shift whose remaining
/// suffix is nullable. Returns the state the trace ends in.
fn trace_alternative(
    grammar: &Grammar,
    automaton: &Automaton,
    index: &HashMap<(StateId, Symbol), usize, ahash::RandomState>,
    nullable: &SymbolSet,
    from: StateId,
    production: ProductionId,
    mut on_nullable_suffix: impl FnMut(usize),
) -> StateId {
    let rhs = grammar.production(production).rhs();
    let mut state = from;
    for (offset, &symbol) in rhs.iter().enumerate() {
        let v = index[&(state, symbol)];
        if rhs[offset + 1..].iter().all(|&s| nullable.contains(s)) {
            on_nullable_suffix(v);
        }
        state = automaton
            .goto(state, symbol)
            .expect("automaton is missing a transition for a traced production");
    }
    state
}

/// The digraph fixpoint: given per-node seed `sets` and implication edges
/// (`sets[x]` must absorb `sets[y]` for every `y` in `implies[x]`), solve to
/// a fixpoint in one pass.
///
/// This is Tarjan's SCC scheme with an explicit stack: a node still marked
/// with its own push depth after its edges are exhausted is the root of a
/// strongly connected component; the whole component gets the root's
/// accumulated set and is marked finished so no node is processed twice,
/// even across mutually-recursive nullable chains.
fn digraph(sets: &mut [SymbolSet], implies: &[Vec<usize>]) {
    const UNMARKED: usize = 0;
    const FINISHED: usize = usize::MAX;

    let mut mark = vec![UNMARKED; sets.len()];
    let mut stack: Vec<usize> = Vec::new();

    for root in 0..sets.len() {
        if mark[root] != UNMARKED {
            continue;
        }
        stack.push(root);
        mark[root] = stack.len();
        // (node, next edge, depth at push)
        let mut frames = vec![(root, 0usize, stack.len())];

        while let Some(frame) = frames.last_mut() {
            let (x, depth) = (frame.0, frame.2);
            if let Some(&y) = implies[x].get(frame.1) {
                frame.1 += 1;
                if y == x {
                    continue;
                }
                if mark[y] == UNMARKED {
                    stack.push(y);
                    mark[y] = stack.len();
                    frames.push((y, 0, stack.len()));
                } else {
                    mark[x] = mark[x].min(mark[y]);
                    union_between(sets, x, y);
                }
            } else {
                frames.pop();
                if mark[x] == depth {
                    // x roots its component: give every member the full set.
                    while let Some(z) = stack.pop() {
                        if z == x {
                            break;
                        }
                        mark[z] = FINISHED;
                        sets[z] = sets[x].clone();
                    }
                    mark[x] = FINISHED;
                }
                if let Some(parent) = frames.last() {
                    let p = parent.0;
                    mark[p] = mark[p].min(mark[x]);
                    union_between(sets, p, x);
                }
            }
        }
    }
}

/// `sets[dst] |= sets[src]` with `dst != src`.
fn union_between(sets: &mut [SymbolSet], dst: usize, src: usize) {
    debug_assert_ne!(dst, src);
    if dst < src {
        let (left, right) = sets.split_at_mut(src);
        left[dst].union_with(&right[0]);
    } else {
        let (left, right) = sets.split_at_mut(dst);
        right[0].union_with(&left[src]);
    }
}

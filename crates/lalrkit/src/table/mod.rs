//! # Parse Table
//!
//! Turns a lookahead-annotated automaton into a packed, deterministic action
//! table, delegating ambiguity resolution to a [`ConflictHandler`].
//!
//! ## Overview
//!
//! The table is a dense `state x symbol` matrix of `u32` cells. Terminal
//! columns hold shift/reduce/accept/skip actions; nonterminal columns hold
//! the goto transitions consulted after a reduce. An extra column past the
//! last grammar symbol belongs to the end-of-input pseudo-terminal.
//!
//! Shifts can never collide with each other (one transition per symbol per
//! state by construction), so only reduce placement can conflict: with an
//! existing shift (shift/reduce) or with another reduce (reduce/reduce).
//! Every collision is offered to the handler, which keeps one of the two
//! actions or fails the build.
//!
//! The finished [`ParserTable`] is immutable and self-contained: it carries
//! the per-production goto data and per-state scanner modes, so it can be
//! serialized and used without the grammar that produced it.

use crate::automaton::{Automaton, State, StateId};
use crate::grammar::{Grammar, ProductionId, Symbol};
use crate::lookahead;
use crate::symset::SymbolSet;
use thiserror::Error;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Scanner mode consulted by the runtime when fetching the next token.
pub type ScannerMode = u16;

/// A single resolved table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// No legal action; the runtime reports a syntax error.
    Error,
    /// Push the symbol and enter the target state. Doubles as goto in
    /// nonterminal columns.
    Shift(StateId),
    Reduce(ProductionId),
    Accept,
    /// Discard the terminal without touching the stack.
    Skip,
}

// 3-bit action code in the low bits, operand above.
const CODE_BITS: u32 = 3;
const CODE_MASK: u32 = (1 << CODE_BITS) - 1;
const CODE_ERROR: u32 = 0;
const CODE_SHIFT: u32 = 1;
const CODE_REDUCE: u32 = 2;
const CODE_ACCEPT: u32 = 3;
const CODE_SKIP: u32 = 4;

impl Action {
    fn encode(self) -> u32 {
        let (code, operand) = match self {
            Self::Error => (CODE_ERROR, 0),
            Self::Shift(state) => (CODE_SHIFT, state as u32),
            Self::Reduce(production) => (CODE_REDUCE, production as u32),
            Self::Accept => (CODE_ACCEPT, 0),
            Self::Skip => (CODE_SKIP, 0),
        };
        debug_assert!(operand.leading_zeros() >= CODE_BITS);
        (operand << CODE_BITS) | code
    }

    fn decode(cell: u32) -> Self {
        let operand = (cell >> CODE_BITS) as usize;
        match cell & CODE_MASK {
            CODE_SHIFT => Self::Shift(operand),
            CODE_REDUCE => Self::Reduce(operand),
            CODE_ACCEPT => Self::Accept,
            CODE_SKIP => Self::Skip,
            _ => Self::Error,
        }
    }
}

/// A recorded (and resolved) table conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub terminal: Symbol,
    /// The action already in the cell when the collision happened.
    pub existing: Action,
    /// The action that collided with it.
    pub proposed: Action,
    pub chosen: Action,
}

impl Conflict {
    /// True for shift/reduce collisions, false for reduce/reduce.
    #[must_use]
    pub fn is_shift_reduce(&self) -> bool {
        matches!(self.existing, Action::Shift(_)) || matches!(self.proposed, Action::Shift(_))
    }
}

/// Conflicts accumulated by a resolving handler, for later reporting.
#[derive(Debug, Default)]
pub struct Conflicts {
    items: Vec<Conflict>,
}

impl Conflicts {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.items.iter()
    }

    fn record(&mut self, conflict: Conflict) {
        self.items.push(conflict);
    }
}

/// A handler's verdict on a colliding cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the action already in the cell.
    Existing,
    /// Overwrite with the colliding action.
    Proposed,
    /// Abort the build with [`BuildError::UnresolvedConflict`].
    Fail,
}

/// Resolves shift/reduce and reduce/reduce ambiguities during table
/// construction.
pub trait ConflictHandler {
    fn resolve(
        &mut self,
        state: StateId,
        terminal: Symbol,
        existing: Action,
        proposed: Action,
    ) -> Resolution;
}

/// The default policy: prefer shift over reduce, and the earlier-declared
/// production between two reduces. Every decision is recorded.
#[derive(Debug, Default)]
pub struct DefaultConflictHandler {
    conflicts: Conflicts,
}

impl DefaultConflictHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_conflicts(self) -> Conflicts {
        self.conflicts
    }
}

impl ConflictHandler for DefaultConflictHandler {
    fn resolve(
        &mut self,
        state: StateId,
        terminal: Symbol,
        existing: Action,
        proposed: Action,
    ) -> Resolution {
        let resolution = match (existing, proposed) {
            (Action::Shift(_), _) => Resolution::Existing,
            (_, Action::Shift(_)) => Resolution::Proposed,
            (Action::Reduce(a), Action::Reduce(b)) if b < a => Resolution::Proposed,
            _ => Resolution::Existing,
        };
        let chosen = match resolution {
            Resolution::Proposed => proposed,
            _ => existing,
        };
        self.conflicts.record(Conflict {
            state,
            terminal,
            existing,
            proposed,
            chosen,
        });
        resolution
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unresolved conflict in state {state} on terminal {terminal}: {existing:?} vs {proposed:?}")]
    UnresolvedConflict {
        state: StateId,
        terminal: Symbol,
        existing: Action,
        proposed: Action,
    },
}

/// Staged construction of a [`ParserTable`] from a frozen grammar.
pub struct TableBuilder<'g> {
    grammar: &'g Grammar,
    skip: SymbolSet,
    workers: usize,
    mode_fn: Option<Box<dyn Fn(StateId, &State) -> ScannerMode + 'g>>,
}

impl<'g> TableBuilder<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            skip: SymbolSet::new(),
            workers: 0,
            mode_fn: None,
        }
    }

    /// Mark a terminal as discardable: any cell that would otherwise be an
    /// error becomes SKIP for it. Used for whitespace and comments.
    #[must_use]
    pub fn skip(mut self, terminal: Symbol) -> Self {
        self.skip.insert(terminal);
        self
    }

    /// Build the automaton with a worker pool of the given size instead of
    /// the sequential worklist.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Assign each state its scanner mode. States default to mode 0.
    #[must_use]
    pub fn scanner_modes(mut self, f: impl Fn(StateId, &State) -> ScannerMode + 'g) -> Self {
        self.mode_fn = Some(Box::new(f));
        self
    }

    /// Build with conflicts fatal: any ambiguity fails the build.
    pub fn build(self) -> Result<ParserTable, BuildError> {
        struct Strict;
        impl ConflictHandler for Strict {
            fn resolve(&mut self, _: StateId, _: Symbol, _: Action, _: Action) -> Resolution {
                Resolution::Fail
            }
        }
        self.build_with(&mut Strict)
    }

    /// Build with the default prefer-shift policy, returning the table
    /// together with every conflict the policy resolved.
    pub fn build_resolved(self) -> Result<(ParserTable, Conflicts), BuildError> {
        let mut handler = DefaultConflictHandler::new();
        let table = self.build_with(&mut handler)?;
        Ok((table, handler.into_conflicts()))
    }

    /// Build, delegating every collision to `handler`.
    pub fn build_with(self, handler: &mut dyn ConflictHandler) -> Result<ParserTable, BuildError> {
        let grammar = self.grammar;
        let mut automaton = if self.workers > 0 {
            Automaton::build_parallel(grammar, self.workers)
        } else {
            Automaton::build(grammar)
        };
        lookahead::solve(grammar, &mut automaton);

        let eof = grammar.eof();
        let width = grammar.symbol_count() + 1;
        let state_count = automaton.state_count();
        let mut cells = vec![Action::Error.encode(); state_count * width];

        let mut modes = vec![0; state_count];
        if let Some(mode_fn) = &self.mode_fn {
            for (id, state) in automaton.states().iter().enumerate() {
                modes[id] = mode_fn(id, state);
            }
        }

        for (id, state) in automaton.states().iter().enumerate() {
            let row = &mut cells[id * width..(id + 1) * width];
            for shift in state.shifts() {
                row[shift.symbol] = Action::Shift(shift.target).encode();
            }
            for reduce in state.reduces() {
                for terminal in reduce.lookahead.iter() {
                    // Reducing the synthetic top production on end of input
                    // is acceptance.
                    let proposed = if reduce.production == 0 && terminal == eof {
                        Action::Accept
                    } else {
                        Action::Reduce(reduce.production)
                    };
                    let cell = &mut row[terminal];
                    let existing = Action::decode(*cell);
                    if existing == Action::Error || existing == proposed {
                        *cell = proposed.encode();
                        continue;
                    }
                    match handler.resolve(id, terminal, existing, proposed) {
                        Resolution::Existing => {}
                        Resolution::Proposed => *cell = proposed.encode(),
                        Resolution::Fail => {
                            return Err(BuildError::UnresolvedConflict {
                                state: id,
                                terminal,
                                existing,
                                proposed,
                            });
                        }
                    }
                }
            }
            for terminal in self.skip.iter() {
                let cell = &mut row[terminal];
                if Action::decode(*cell) == Action::Error {
                    *cell = Action::Skip.encode();
                }
            }
        }

        let productions = grammar
            .productions()
            .map(|p| (p.lhs(), p.len() as u32))
            .collect();

        Ok(ParserTable {
            cells,
            width,
            state_count,
            modes,
            productions,
            eof,
        })
    }
}

/// The packed action table. Immutable, self-contained, and shareable
/// read-only across any number of concurrent parses.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ParserTable {
    cells: Vec<u32>,
    width: usize,
    state_count: usize,
    modes: Vec<ScannerMode>,
    /// Per production: LHS symbol and RHS length, for goto after reduce.
    productions: Vec<(Symbol, u32)>,
    eof: Symbol,
}

impl ParserTable {
    /// The action for `(state, symbol)`. The symbol may be [`eof`](Self::eof).
    #[must_use]
    pub fn action(&self, state: StateId, symbol: Symbol) -> Action {
        Action::decode(self.cells[state * self.width + symbol])
    }

    /// The state entered after reducing to `nonterminal` on top of `state`.
    #[must_use]
    pub fn goto(&self, state: StateId, nonterminal: Symbol) -> Option<StateId> {
        match self.action(state, nonterminal) {
            Action::Shift(target) => Some(target),
            _ => None,
        }
    }

    #[must_use]
    pub fn mode(&self, state: StateId) -> ScannerMode {
        self.modes[state]
    }

    #[must_use]
    pub fn production_lhs(&self, production: ProductionId) -> Symbol {
        self.productions[production].0
    }

    #[must_use]
    pub fn production_len(&self, production: ProductionId) -> usize {
        self.productions[production].1 as usize
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.state_count
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.width - 1
    }

    #[must_use]
    pub fn eof(&self) -> Symbol {
        self.eof
    }

    /// Terminals on which `state` can shift. Reported with syntax errors so
    /// callers can say what the state was prepared to consume.
    #[must_use]
    pub fn shiftable_terminals(&self, state: StateId) -> SymbolSet {
        // A symbol is nonterminal iff it is some production's LHS; their
        // columns hold gotos, which are shift-coded but not consumable.
        let nonterminals: SymbolSet = self.productions.iter().map(|&(lhs, _)| lhs).collect();
        let mut terminals = SymbolSet::new();
        for symbol in 0..self.width {
            if !nonterminals.contains(symbol)
                && matches!(self.action(state, symbol), Action::Shift(_))
            {
                terminals.insert(symbol);
            }
        }
        terminals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    fn expression() -> (Grammar, crate::grammar::SymbolTable) {
        let mut b = GrammarBuilder::new();
        let e = b.symbol("E");
        let t = b.symbol("T");
        let f = b.symbol("F");
        let plus = b.symbol("+");
        let star = b.symbol("*");
        let lparen = b.symbol("(");
        let rparen = b.symbol(")");
        let id = b.symbol("id");
        b.production(e, [e, plus, t])
            .production(e, [t])
            .production(t, [t, star, f])
            .production(t, [f])
            .production(f, [lparen, e, rparen])
            .production(f, [id]);
        b.build(e)
    }

    fn dangling_else() -> (Grammar, crate::grammar::SymbolTable) {
        let mut b = GrammarBuilder::new();
        let s = b.symbol("S");
        let if_ = b.symbol("if");
        let then = b.symbol("then");
        let else_ = b.symbol("else");
        let expr = b.symbol("e");
        let stmt = b.symbol("x");
        b.production(s, [if_, expr, then, s])
            .production(s, [if_, expr, then, s, else_, s])
            .production(s, [stmt]);
        b.build(s)
    }

    #[test]
    fn test_action_roundtrip() {
        for action in [
            Action::Error,
            Action::Shift(113),
            Action::Reduce(7),
            Action::Accept,
            Action::Skip,
        ] {
            assert_eq!(Action::decode(action.encode()), action);
        }
    }

    #[test]
    fn test_expression_table_builds_without_conflicts() {
        let (grammar, symbols) = expression();
        let table = TableBuilder::new(&grammar).build().unwrap();

        let id = symbols.lookup("id").unwrap();
        let e = symbols.lookup("E").unwrap();
        assert!(matches!(table.action(0, id), Action::Shift(_)));
        // Accepting happens at goto(0, E) on end of input.
        let accept_state = table.goto(0, e).unwrap();
        assert_eq!(table.action(accept_state, table.eof()), Action::Accept);
    }

    #[test]
    fn test_dangling_else_resolved_to_shift() {
        let (grammar, symbols) = dangling_else();
        let (table, conflicts) = TableBuilder::new(&grammar).build_resolved().unwrap();

        assert_eq!(conflicts.len(), 1);
        let conflict = conflicts.iter().next().unwrap();
        assert_eq!(conflict.terminal, symbols.lookup("else").unwrap());
        assert!(conflict.is_shift_reduce());
        assert!(matches!(conflict.chosen, Action::Shift(_)));
        assert!(matches!(
            table.action(conflict.state, conflict.terminal),
            Action::Shift(_)
        ));
    }

    #[test]
    fn test_dangling_else_fatal_without_handler() {
        let (grammar, _) = dangling_else();
        assert!(matches!(
            TableBuilder::new(&grammar).build(),
            Err(BuildError::UnresolvedConflict { .. })
        ));
    }

    #[test]
    fn test_reduce_reduce_prefers_earlier_production() {
        // S -> A | B; A -> 'a'; B -> 'a' — reducing 'a' is ambiguous at eof.
        let mut b = GrammarBuilder::new();
        let s = b.symbol("S");
        let a_nt = b.symbol("A");
        let b_nt = b.symbol("B");
        let a = b.symbol("a");
        b.production(s, [a_nt]).production(s, [b_nt]);
        b.production(a_nt, [a]).production(b_nt, [a]);
        let (grammar, _) = b.build(s);

        let (table, conflicts) = TableBuilder::new(&grammar).build_resolved().unwrap();
        assert_eq!(conflicts.len(), 1);
        let conflict = conflicts.iter().next().unwrap();
        assert!(!conflict.is_shift_reduce());
        // A -> 'a' is declared before B -> 'a'.
        let Action::Reduce(chosen) = conflict.chosen else {
            panic!("expected a reduce to win");
        };
        let rejected = if conflict.chosen == conflict.existing {
            conflict.proposed
        } else {
            conflict.existing
        };
        let Action::Reduce(other) = rejected else {
            panic!("expected two reduces");
        };
        assert!(chosen < other);
        assert_eq!(table.action(conflict.state, conflict.terminal), conflict.chosen);
    }

    #[test]
    fn test_skip_fills_error_cells_only() {
        let mut b = GrammarBuilder::new();
        let s = b.symbol("S");
        let a = b.symbol("a");
        let ws = b.symbol("ws");
        b.production(s, [a]);
        let (grammar, _) = b.build(s);
        let table = TableBuilder::new(&grammar).skip(ws).build().unwrap();
        // Every state discards whitespace; real actions are untouched.
        for state in 0..table.state_count() {
            assert_eq!(table.action(state, ws), Action::Skip);
        }
        assert!(matches!(table.action(0, a), Action::Shift(_)));
    }

    #[test]
    fn test_shiftable_terminals_are_shifts_only() {
        // S -> A 'b'; A -> 'a' A | ε — state 0 reduces A -> ε on 'b' but is
        // only prepared to shift 'a'.
        let mut b = GrammarBuilder::new();
        let s = b.symbol("S");
        let a_nt = b.symbol("A");
        let a = b.symbol("a");
        let bt = b.symbol("b");
        b.production(s, [a_nt, bt])
            .production(a_nt, [a, a_nt])
            .production(a_nt, []);
        let (grammar, _) = b.build(s);
        let table = TableBuilder::new(&grammar).build().unwrap();

        assert_eq!(table.action(0, bt), Action::Reduce(3));
        let shiftable = table.shiftable_terminals(0);
        assert!(shiftable.contains(a));
        assert!(!shiftable.contains(bt));
        assert!(!shiftable.contains(table.eof()));
        // Nonterminal goto columns stay out even though they are shift-coded.
        assert!(!shiftable.contains(a_nt));
    }

    #[test]
    fn test_goto_matches_grammar_productions() {
        let (grammar, symbols) = expression();
        let table = TableBuilder::new(&grammar).build().unwrap();
        let t = symbols.lookup("T").unwrap();
        assert!(table.goto(0, t).is_some());
        for p in 0..grammar.production_count() {
            assert_eq!(table.production_lhs(p), grammar.production(p).lhs());
            assert_eq!(table.production_len(p), grammar.production(p).len());
        }
    }

    #[test]
    fn test_parallel_build_same_dimensions() {
        let (grammar, _) = expression();
        let sequential = TableBuilder::new(&grammar).build().unwrap();
        let pooled = TableBuilder::new(&grammar).workers(4).build().unwrap();
        assert_eq!(sequential.state_count(), pooled.state_count());
        assert_eq!(sequential.symbol_count(), pooled.symbol_count());
    }

    #[test]
    fn test_scanner_mode_assignment() {
        let (grammar, _) = expression();
        let table = TableBuilder::new(&grammar)
            .scanner_modes(|id, _| if id == 0 { 2 } else { 0 })
            .build()
            .unwrap();
        assert_eq!(table.mode(0), 2);
        assert_eq!(table.mode(1), 0);
    }
}

//! # Grammar Analysis
//!
//! Nullable/first fixpoints and the pre-construction usability check.
//!
//! All three run over the frozen grammar and feed the automaton builder and
//! lookahead solver; `check` must pass before construction starts.

use super::{Grammar, GrammarError, Symbol, SymbolTable};
use crate::symset::SymbolSet;

impl Grammar {
    /// Compute the set of nullable symbols.
    ///
    /// A symbol is nullable if some alternative's RHS symbols are all already
    /// known nullable (an empty RHS vacuously qualifies). Repeats until no
    /// symbol is added.
    #[must_use]
    pub fn nullable_set(&self) -> SymbolSet {
        let mut nullable = SymbolSet::new();
        let mut changed = true;
        while changed {
            changed = false;
            for production in self.productions() {
                if nullable.contains(production.lhs()) {
                    continue;
                }
                if production.rhs().iter().all(|&s| nullable.contains(s)) {
                    nullable.insert(production.lhs());
                    changed = true;
                }
            }
        }
        nullable
    }

    /// Compute, per symbol, the terminals that can begin some derivation.
    ///
    /// A terminal's first set is itself. For productions, the first set of
    /// each RHS symbol propagates into the LHS while the preceding prefix
    /// remains nullable.
    #[must_use]
    pub fn first_sets(&self, nullable: &SymbolSet) -> Vec<SymbolSet> {
        let mut firsts = vec![SymbolSet::new(); self.symbol_count()];
        for symbol in 0..self.symbol_count() {
            if self.is_terminal(symbol) {
                firsts[symbol].insert(symbol);
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for production in self.productions() {
                for &symbol in production.rhs() {
                    if symbol != production.lhs() {
                        // Split-borrow workaround: collect the source set
                        // before unioning into the destination.
                        let source = firsts[symbol].clone();
                        changed |= firsts[production.lhs()].union_with(&source);
                    }
                    if !nullable.contains(symbol) {
                        break;
                    }
                }
            }
        }
        firsts
    }

    /// Validate that every symbol is productive and reachable.
    ///
    /// A symbol is productive if it can derive some terminal string; it is
    /// reachable if some derivation from `start` mentions it. All offenders
    /// are collected into a single [`GrammarError`], with symbols in `used`
    /// exempted from the reachability requirement.
    pub fn check(
        &self,
        start: Symbol,
        used: &SymbolSet,
        symbols: &SymbolTable,
    ) -> Result<(), GrammarError> {
        let productive = self.productive_set();
        let reachable = self.reachable_set(start);

        let mut unproductive = Vec::new();
        let mut unreachable = Vec::new();
        for symbol in 0..self.symbol_count() {
            if !productive.contains(symbol) {
                unproductive.push(symbols.name(symbol).to_string());
            }
            if !reachable.contains(symbol) && !used.contains(symbol) {
                unreachable.push(symbols.name(symbol).to_string());
            }
        }

        if unproductive.is_empty() && unreachable.is_empty() {
            Ok(())
        } else {
            Err(GrammarError::UnusableSymbols {
                unproductive,
                unreachable,
            })
        }
    }

    /// Terminals are productive; a nonterminal is productive once some
    /// alternative has an all-productive RHS.
    fn productive_set(&self) -> SymbolSet {
        let mut productive = SymbolSet::new();
        for symbol in 0..self.symbol_count() {
            if self.is_terminal(symbol) {
                productive.insert(symbol);
            }
        }
        let mut changed = true;
        while changed {
            changed = false;
            for production in self.productions() {
                if productive.contains(production.lhs()) {
                    continue;
                }
                if production.rhs().iter().all(|&s| productive.contains(s)) {
                    productive.insert(production.lhs());
                    changed = true;
                }
            }
        }
        productive
    }

    /// Depth-first reachability from `start` over alternatives.
    fn reachable_set(&self, start: Symbol) -> SymbolSet {
        let mut reachable = SymbolSet::new();
        let mut worklist = vec![start];
        reachable.insert(start);
        while let Some(symbol) = worklist.pop() {
            for &id in self.alternatives(symbol) {
                for &rhs_symbol in self.production(id).rhs() {
                    if reachable.insert(rhs_symbol) {
                        worklist.push(rhs_symbol);
                    }
                }
            }
        }
        reachable
    }
}

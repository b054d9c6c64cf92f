//! Grammar assembly.
//!
//! The builder interns symbol names, collects productions, and performs the
//! start-symbol wrapping the automaton relies on: `build` prepends a
//! synthetic top production `S' -> start` so that production 0's LHS never
//! appears on any right-hand side.

use super::{Grammar, Production, Symbol, SymbolTable};

/// Incrementally assembles a [`Grammar`] plus its [`SymbolTable`].
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    symbols: SymbolTable,
    productions: Vec<(Symbol, Vec<Symbol>)>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a symbol name, returning its id. Repeated names return the
    /// existing id.
    pub fn symbol(&mut self, name: &str) -> Symbol {
        self.symbols
            .lookup(name)
            .unwrap_or_else(|| self.symbols.add(name))
    }

    /// Add a production. Symbols may be declared in any order; whether a
    /// symbol ends up terminal is decided by whether it ever appears as LHS.
    pub fn production(&mut self, lhs: Symbol, rhs: impl IntoIterator<Item = Symbol>) -> &mut Self {
        self.productions.push((lhs, rhs.into_iter().collect()));
        self
    }

    /// Freeze into a grammar whose production 0 is the synthetic
    /// `S' -> start` wrap.
    #[must_use]
    pub fn build(mut self, start: Symbol) -> (Grammar, SymbolTable) {
        let pseudo_start = self.symbols.add("S'");
        let mut grammar = Grammar::new(self.symbols.len());
        grammar.add_production(Production::new(pseudo_start, [start]));
        for (lhs, rhs) in self.productions {
            grammar.add_production(Production::new(lhs, rhs));
        }
        (grammar, self.symbols)
    }
}

//! # Runtime Parser
//!
//! A shift/reduce stack machine executing a [`ParserTable`] against a token
//! stream.
//!
//! ## Overview
//!
//! The parser owns nothing but a reference to the immutable table; all
//! per-parse state lives on the stacks inside [`Parser::run`]. Tokens come
//! from a [`Scanner`], tree nodes from a [`TreeBuilder`], and every failure
//! is reported to an [`ErrorHandler`] before the run returns the
//! corresponding [`ParseError`].
//!
//! The table may be shared read-only across any number of concurrent runs;
//! each run is strictly single-threaded and blocks only inside the scanner.

use crate::error::{ParseError, SemanticError};
use crate::grammar::{ProductionId, Symbol};
use crate::position::SourcePosition;
use crate::symset::SymbolSet;
use crate::table::{Action, ParserTable, ScannerMode};

/// One fetch from a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scanned {
    /// A terminal symbol id.
    Token(Symbol),
    /// End of input.
    Eof,
    /// The scanner could not form a token; the parse aborts with a lexical
    /// error at the scanner's current position.
    Error,
}

/// Produces the terminal stream. Implementations are external; the parser
/// only ever calls these three methods.
pub trait Scanner {
    /// Fetch the next terminal using the given scanner mode.
    fn next(&mut self, mode: ScannerMode) -> Scanned;

    /// The text of the most recently fetched token.
    fn text(&self) -> &str;

    /// The source position of the most recently fetched token.
    fn position(&self) -> SourcePosition;
}

/// Creates scanners over some input type, carrying the starting position.
pub trait ScannerFactory<R> {
    type Scanner: Scanner;

    fn scanner(&self, start: SourcePosition, input: R) -> Self::Scanner;
}

/// Builds the parse tree as the parser shifts and reduces.
pub trait TreeBuilder {
    type Node;

    /// Called once before the first token is fetched.
    fn open(&mut self) {}

    /// A node for a shifted terminal.
    fn terminal(&mut self, symbol: Symbol, text: &str, position: SourcePosition) -> Self::Node;

    /// A node for a reduced production. `children` are the RHS nodes in
    /// grammar order; an `Err` aborts the parse as a semantic error.
    fn nonterminal(
        &mut self,
        production: ProductionId,
        children: Vec<Self::Node>,
    ) -> Result<Self::Node, SemanticError>;
}

/// Receives every parse failure before [`Parser::run`] returns it.
pub trait ErrorHandler {
    fn lexical_error(&mut self, position: SourcePosition);

    /// `expected` holds the terminals on which the failing state had a
    /// legal action.
    fn syntax_error(&mut self, position: SourcePosition, expected: &SymbolSet);

    fn semantic_error(&mut self, position: SourcePosition, error: &SemanticError);

    /// Called once after a successful parse; a handler that accumulated
    /// deferred errors may fail the run here.
    fn close(&mut self) -> Result<(), ParseError> {
        Ok(())
    }
}

/// The stack machine. Cheap to construct; create one per table and call
/// [`run`](Self::run) once per input.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'t> {
    table: &'t ParserTable,
}

impl<'t> Parser<'t> {
    #[must_use]
    pub const fn new(table: &'t ParserTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub const fn table(&self) -> &'t ParserTable {
        self.table
    }

    /// Parse one token stream to completion.
    ///
    /// # Errors
    ///
    /// Returns the first lexical, syntax, or semantic error encountered;
    /// the same error is reported to `handler` before returning.
    pub fn run<S, B, H>(
        &self,
        scanner: &mut S,
        builder: &mut B,
        handler: &mut H,
    ) -> Result<B::Node, ParseError>
    where
        S: Scanner,
        B: TreeBuilder,
        H: ErrorHandler,
    {
        let table = self.table;
        let eof = table.eof();

        // Parallel stacks: `states` always has one more entry than `nodes`
        // (the start state has no node under it).
        let mut states: Vec<usize> = Vec::with_capacity(64);
        let mut nodes: Vec<B::Node> = Vec::with_capacity(64);
        states.push(0);

        builder.open();

        'tokens: loop {
            let state = *states.last().unwrap_or(&0);
            let symbol = match scanner.next(table.mode(state)) {
                Scanned::Token(symbol) => symbol,
                Scanned::Eof => eof,
                Scanned::Error => {
                    let position = scanner.position();
                    handler.lexical_error(position);
                    return Err(ParseError::Lexical { position });
                }
            };

            // Reduce as long as the lookahead stays unconsumed.
            loop {
                let state = *states.last().unwrap_or(&0);
                match table.action(state, symbol) {
                    Action::Shift(target) => {
                        nodes.push(builder.terminal(symbol, scanner.text(), scanner.position()));
                        states.push(target);
                        continue 'tokens;
                    }
                    Action::Skip => continue 'tokens,
                    Action::Reduce(production) => {
                        let len = table.production_len(production);
                        let children = nodes.split_off(nodes.len() - len);
                        states.truncate(states.len() - len);
                        let node = match builder.nonterminal(production, children) {
                            Ok(node) => node,
                            Err(error) => {
                                let position = scanner.position();
                                handler.semantic_error(position, &error);
                                return Err(ParseError::Semantic {
                                    position,
                                    source: error,
                                });
                            }
                        };
                        let exposed = *states.last().unwrap_or(&0);
                        let target = table
                            .goto(exposed, table.production_lhs(production))
                            .expect("parse table is missing a goto for a reduced production");
                        nodes.push(node);
                        states.push(target);
                    }
                    Action::Accept => {
                        handler.close()?;
                        return Ok(nodes
                            .pop()
                            .expect("accepting with an empty node stack"));
                    }
                    Action::Error => {
                        let position = scanner.position();
                        let expected = table.shiftable_terminals(state);
                        handler.syntax_error(position, &expected);
                        return Err(ParseError::Syntax {
                            position,
                            expected: expected.iter().collect(),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{expression_grammar, CollectingErrorHandler, NodeBuilder, VecScanner};
    use crate::table::TableBuilder;

    #[test]
    fn test_accepts_expression() {
        let (grammar, symbols) = expression_grammar();
        let table = TableBuilder::new(&grammar).build().unwrap();
        let id = symbols.lookup("id").unwrap();
        let plus = symbols.lookup("+").unwrap();
        let star = symbols.lookup("*").unwrap();

        let mut scanner = VecScanner::new([id, plus, id, star, id]);
        let mut builder = NodeBuilder::new();
        let mut handler = CollectingErrorHandler::default();
        let tree = Parser::new(&table)
            .run(&mut scanner, &mut builder, &mut handler)
            .unwrap();

        assert!(handler.is_empty());
        // The root reduces E -> E '+' T.
        assert_eq!(tree.children().len(), 3);
    }

    #[test]
    fn test_rejects_trailing_operator() {
        let (grammar, symbols) = expression_grammar();
        let table = TableBuilder::new(&grammar).build().unwrap();
        let id = symbols.lookup("id").unwrap();
        let plus = symbols.lookup("+").unwrap();

        let mut scanner = VecScanner::new([id, plus]);
        let mut builder = NodeBuilder::new();
        let mut handler = CollectingErrorHandler::default();
        let result = Parser::new(&table).run(&mut scanner, &mut builder, &mut handler);

        // "id +" fails on end of input; '+' wants another operand.
        let Err(ParseError::Syntax { expected, .. }) = result else {
            panic!("expected a syntax error");
        };
        assert!(expected.contains(&id));
        assert_eq!(handler.syntax_errors().len(), 1);
    }

    #[test]
    fn test_rejects_leading_operator() {
        let (grammar, symbols) = expression_grammar();
        let table = TableBuilder::new(&grammar).build().unwrap();
        let id = symbols.lookup("id").unwrap();
        let plus = symbols.lookup("+").unwrap();

        let mut scanner = VecScanner::new([plus, id]);
        let mut builder = NodeBuilder::new();
        let mut handler = CollectingErrorHandler::default();
        let result = Parser::new(&table).run(&mut scanner, &mut builder, &mut handler);

        assert!(matches!(result, Err(ParseError::Syntax { .. })));
        // The failure is on the very first token.
        assert_eq!(handler.syntax_errors()[0].offset, 0);
    }

    #[test]
    fn test_deferred_close_error_fails_accepted_parse() {
        // A handler may accumulate problems during the run and only reject
        // the parse once it is asked to close.
        struct DeferringHandler;
        impl ErrorHandler for DeferringHandler {
            fn lexical_error(&mut self, _: SourcePosition) {}
            fn syntax_error(&mut self, _: SourcePosition, _: &SymbolSet) {}
            fn semantic_error(&mut self, _: SourcePosition, _: &SemanticError) {}
            fn close(&mut self) -> Result<(), ParseError> {
                Err(ParseError::Semantic {
                    position: SourcePosition::start(),
                    source: SemanticError::new("deferred validation failed"),
                })
            }
        }

        let (grammar, symbols) = expression_grammar();
        let table = TableBuilder::new(&grammar).build().unwrap();
        let id = symbols.lookup("id").unwrap();

        let mut scanner = VecScanner::new([id]);
        let mut builder = NodeBuilder::new();
        let mut handler = DeferringHandler;
        let result = Parser::new(&table).run(&mut scanner, &mut builder, &mut handler);

        // The input itself is fine; the close-time error still wins.
        let Err(ParseError::Semantic { source, .. }) = result else {
            panic!("expected the deferred error");
        };
        assert_eq!(source.message, "deferred validation failed");
    }

    #[test]
    fn test_lexical_error_aborts() {
        let (grammar, symbols) = expression_grammar();
        let table = TableBuilder::new(&grammar).build().unwrap();
        let id = symbols.lookup("id").unwrap();

        let mut scanner = VecScanner::new([id]).with_error_after(1);
        let mut builder = NodeBuilder::new();
        let mut handler = CollectingErrorHandler::default();
        let result = Parser::new(&table).run(&mut scanner, &mut builder, &mut handler);

        assert!(matches!(result, Err(ParseError::Lexical { .. })));
        assert_eq!(handler.lexical_errors().len(), 1);
    }
}

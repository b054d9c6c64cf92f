//! # Lalrkit
//!
//! An LALR(1) parser generator and its table-driven runtime.
//!
//! ## Overview
//!
//! Lalrkit turns a context-free grammar into a deterministic shift/reduce
//! automaton and executes it against a token stream:
//!
//! - **Grammar model**: dense symbol ids, per-symbol production indices,
//!   nullable/first fixpoints, unproductive/unreachable validation
//! - **LR(0) automaton**: item-set closure, goto transitions, hash-interned
//!   state deduplication, optional worker-pool construction
//! - **Lookahead solver**: the DeRemer–Pennello digraph algorithm for
//!   per-reduce lookahead sets
//! - **Table builder**: packed action cells with pluggable conflict
//!   resolution, skip terminals, and per-state scanner modes
//! - **Runtime parser**: a stack machine over [`Scanner`], [`TreeBuilder`],
//!   and [`ErrorHandler`] seams
//!
//! The phases compose as a pipeline: grammar → automaton → lookaheads →
//! table → parse runs. The finished [`ParserTable`] is immutable and can be
//! shared across any number of concurrent parses (and, with the `serialize`
//! feature, persisted independently of the grammar).
//!
//! ## Quick Start
//!
//! ```rust
//! use lalrkit::grammar::GrammarBuilder;
//! use lalrkit::parser::Parser;
//! use lalrkit::table::TableBuilder;
//! use lalrkit::testing::{CollectingErrorHandler, NodeBuilder, VecScanner};
//!
//! // list -> list item | ε
//! let mut g = GrammarBuilder::new();
//! let list = g.symbol("list");
//! let item = g.symbol("item");
//! g.production(list, [list, item]).production(list, []);
//! let (grammar, _symbols) = g.build(list);
//!
//! let table = TableBuilder::new(&grammar).build()?;
//!
//! let mut scanner = VecScanner::new([item, item]);
//! let mut builder = NodeBuilder::new();
//! let mut handler = CollectingErrorHandler::default();
//! let tree = Parser::new(&table).run(&mut scanner, &mut builder, &mut handler)?;
//! assert_eq!(tree.children().len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod automaton;
pub mod error;
pub mod grammar;
pub mod lookahead;
pub mod parser;
pub mod position;
pub mod symset;
pub mod table;
pub mod testing;

pub use error::{ParseError, SemanticError};
pub use grammar::{Grammar, GrammarBuilder, GrammarError, Production, ProductionId, Symbol, SymbolTable};
pub use parser::{ErrorHandler, Parser, Scanned, Scanner, ScannerFactory, TreeBuilder};
pub use position::SourcePosition;
pub use symset::SymbolSet;
pub use table::{Action, BuildError, ConflictHandler, Conflicts, ParserTable, TableBuilder};

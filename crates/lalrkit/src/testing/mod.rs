//! Grammar fixtures and stand-in seam implementations.
//!
//! Everything here backs the crate's own test suite, but the pieces are
//! public because downstream crates face the same problem: testing a grammar
//! without wiring up a real scanner or tree representation. [`VecScanner`]
//! replays a fixed token list, [`NodeBuilder`] materializes plain
//! [`ParseNode`] trees, and [`CollectingErrorHandler`] records every report
//! instead of acting on it.

use crate::error::SemanticError;
use crate::grammar::{Grammar, GrammarBuilder, ProductionId, Symbol, SymbolTable};
use crate::parser::{ErrorHandler, Scanned, Scanner, ScannerFactory, TreeBuilder};
use crate::position::SourcePosition;
use crate::symset::SymbolSet;
use crate::table::ScannerMode;
use compact_str::CompactString;

/// `E -> E '+' T | T; T -> T '*' F | F; F -> '(' E ')' | id`
#[must_use]
pub fn expression_grammar() -> (Grammar, SymbolTable) {
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

/// `S -> if e then S | if e then S else S | x` — one inherent shift/reduce
/// ambiguity on `else`.
#[must_use]
pub fn dangling_else_grammar() -> (Grammar, SymbolTable) {
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

/// `A -> 'a' A | ε` — right recursion, one reduce per element, innermost
/// first.
#[must_use]
pub fn right_recursive_list() -> (Grammar, SymbolTable) {
    let mut b = GrammarBuilder::new();
    let a_nt = b.symbol("A");
    let a = b.symbol("a");
    b.production(a_nt, [a, a_nt]).production(a_nt, []);
    b.build(a_nt)
}

/// `S -> S 'a' | ε` — left recursion, reduces incrementally with bounded
/// stack growth.
#[must_use]
pub fn left_recursive_list() -> (Grammar, SymbolTable) {
    let mut b = GrammarBuilder::new();
    let s = b.symbol("S");
    let a = b.symbol("a");
    b.production(s, [s, a]).production(s, []);
    b.build(s)
}

/// A scanner replaying a fixed sequence of terminal ids, one column per
/// token.
#[derive(Debug, Clone)]
pub struct VecScanner {
    tokens: Vec<Symbol>,
    index: usize,
    /// Fetch index at which the scanner reports a lexical error.
    error_after: Option<usize>,
    last: usize,
}

impl VecScanner {
    pub fn new(tokens: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            index: 0,
            error_after: None,
            last: 0,
        }
    }

    /// Report [`Scanned::Error`] once `n` tokens have been fetched.
    #[must_use]
    pub fn with_error_after(mut self, n: usize) -> Self {
        self.error_after = Some(n);
        self
    }
}

impl Scanner for VecScanner {
    fn next(&mut self, _mode: ScannerMode) -> Scanned {
        if self.error_after == Some(self.index) {
            self.last = self.index;
            return Scanned::Error;
        }
        match self.tokens.get(self.index) {
            Some(&symbol) => {
                self.last = self.index;
                self.index += 1;
                Scanned::Token(symbol)
            }
            None => {
                self.last = self.tokens.len();
                Scanned::Eof
            }
        }
    }

    fn text(&self) -> &str {
        ""
    }

    fn position(&self) -> SourcePosition {
        SourcePosition::new(1, self.last as u32 + 1, self.last)
    }
}

/// Factory producing [`VecScanner`]s from token vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct VecScannerFactory;

impl ScannerFactory<Vec<Symbol>> for VecScannerFactory {
    type Scanner = VecScanner;

    fn scanner(&self, _start: SourcePosition, input: Vec<Symbol>) -> VecScanner {
        VecScanner::new(input)
    }
}

/// A plain parse tree, as concrete as it gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Terminal {
        symbol: Symbol,
        text: CompactString,
        position: SourcePosition,
    },
    Nonterminal {
        production: ProductionId,
        children: Vec<ParseNode>,
    },
}

impl ParseNode {
    #[must_use]
    pub fn children(&self) -> &[ParseNode] {
        match self {
            Self::Terminal { .. } => &[],
            Self::Nonterminal { children, .. } => children,
        }
    }

    /// Longest root-to-leaf chain of nonterminal nodes under (and including)
    /// this one.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Terminal { .. } => 0,
            Self::Nonterminal { children, .. } => {
                1 + children.iter().map(ParseNode::depth).max().unwrap_or(0)
            }
        }
    }

    /// Total number of nonterminal nodes in this subtree.
    #[must_use]
    pub fn reduction_count(&self) -> usize {
        match self {
            Self::Terminal { .. } => 0,
            Self::Nonterminal { children, .. } => {
                1 + children.iter().map(ParseNode::reduction_count).sum::<usize>()
            }
        }
    }
}

/// Builds [`ParseNode`] trees; can be told to reject one production to
/// exercise the semantic-error path.
#[derive(Debug, Default)]
pub struct NodeBuilder {
    fail_on: Option<ProductionId>,
}

impl NodeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a semantic error when reducing `production`.
    #[must_use]
    pub fn fail_on(mut self, production: ProductionId) -> Self {
        self.fail_on = Some(production);
        self
    }
}

impl TreeBuilder for NodeBuilder {
    type Node = ParseNode;

    fn terminal(&mut self, symbol: Symbol, text: &str, position: SourcePosition) -> ParseNode {
        ParseNode::Terminal {
            symbol,
            text: CompactString::new(text),
            position,
        }
    }

    fn nonterminal(
        &mut self,
        production: ProductionId,
        children: Vec<ParseNode>,
    ) -> Result<ParseNode, SemanticError> {
        if self.fail_on == Some(production) {
            return Err(SemanticError::new("rejected by test builder"));
        }
        Ok(ParseNode::Nonterminal {
            production,
            children,
        })
    }
}

/// Records every reported error; never throws away the positions.
#[derive(Debug, Default)]
pub struct CollectingErrorHandler {
    lexical: Vec<SourcePosition>,
    syntax: Vec<SourcePosition>,
    expected: Vec<Vec<Symbol>>,
    semantic: Vec<(SourcePosition, String)>,
}

impl CollectingErrorHandler {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lexical.is_empty() && self.syntax.is_empty() && self.semantic.is_empty()
    }

    #[must_use]
    pub fn lexical_errors(&self) -> &[SourcePosition] {
        &self.lexical
    }

    #[must_use]
    pub fn syntax_errors(&self) -> &[SourcePosition] {
        &self.syntax
    }

    /// The expected-terminal sets reported alongside each syntax error.
    #[must_use]
    pub fn expected_sets(&self) -> &[Vec<Symbol>] {
        &self.expected
    }

    #[must_use]
    pub fn semantic_errors(&self) -> &[(SourcePosition, String)] {
        &self.semantic
    }
}

impl ErrorHandler for CollectingErrorHandler {
    fn lexical_error(&mut self, position: SourcePosition) {
        self.lexical.push(position);
    }

    fn syntax_error(&mut self, position: SourcePosition, expected: &SymbolSet) {
        self.syntax.push(position);
        self.expected.push(expected.iter().collect());
    }

    fn semantic_error(&mut self, position: SourcePosition, error: &SemanticError) {
        self.semantic.push((position, error.message.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::parser::Parser;
    use crate::table::TableBuilder;

    fn parse(
        grammar: &Grammar,
        tokens: impl IntoIterator<Item = Symbol>,
    ) -> Result<ParseNode, ParseError> {
        let table = TableBuilder::new(grammar).build().unwrap();
        let mut scanner = VecScanner::new(tokens);
        let mut builder = NodeBuilder::new();
        let mut handler = CollectingErrorHandler::default();
        Parser::new(&table).run(&mut scanner, &mut builder, &mut handler)
    }

    #[test]
    fn test_right_recursion_nests_innermost_first() {
        let (grammar, symbols) = right_recursive_list();
        let a = symbols.lookup("a").unwrap();
        let tree = parse(&grammar, [a, a, a]).unwrap();

        // A('a' A('a' A('a' A(ε)))) — each 'a' adds one level.
        assert_eq!(tree.depth(), 4);
        assert_eq!(tree.reduction_count(), 4);
        // The first child is the terminal, the recursive tail comes second.
        assert!(matches!(tree.children()[0], ParseNode::Terminal { .. }));
        assert!(matches!(tree.children()[1], ParseNode::Nonterminal { .. }));
    }

    #[test]
    fn test_left_recursion_reduces_incrementally() {
        let (grammar, symbols) = left_recursive_list();
        let a = symbols.lookup("a").unwrap();
        let tree = parse(&grammar, [a, a, a]).unwrap();

        // S(S(S(S(ε) 'a') 'a') 'a') — the prior S comes first in each node.
        assert_eq!(tree.depth(), 4);
        assert_eq!(tree.reduction_count(), 4);
        assert!(matches!(tree.children()[0], ParseNode::Nonterminal { .. }));
        assert!(matches!(tree.children()[1], ParseNode::Terminal { .. }));
    }

    #[test]
    fn test_empty_input_on_nullable_grammar() {
        let (grammar, _) = left_recursive_list();
        let tree = parse(&grammar, []).unwrap();
        assert_eq!(tree.reduction_count(), 1);
        assert!(tree.children().is_empty());
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let (grammar, symbols) = dangling_else_grammar();
        let table = TableBuilder::new(&grammar).build_resolved().unwrap().0;
        let if_ = symbols.lookup("if").unwrap();
        let then = symbols.lookup("then").unwrap();
        let else_ = symbols.lookup("else").unwrap();
        let e = symbols.lookup("e").unwrap();
        let x = symbols.lookup("x").unwrap();

        // if e then if e then x else x
        let mut scanner = VecScanner::new([if_, e, then, if_, e, then, x, else_, x]);
        let mut builder = NodeBuilder::new();
        let mut handler = CollectingErrorHandler::default();
        let tree = Parser::new(&table)
            .run(&mut scanner, &mut builder, &mut handler)
            .unwrap();

        // Preferring shift attaches the else to the inner if: the outer node
        // is the 4-symbol production, its statement the 6-symbol one.
        assert_eq!(tree.children().len(), 4);
        assert_eq!(tree.children()[3].children().len(), 6);
    }

    #[test]
    fn test_semantic_error_aborts_parse() {
        let (grammar, symbols) = expression_grammar();
        let table = TableBuilder::new(&grammar).build().unwrap();
        let id = symbols.lookup("id").unwrap();

        // Production ids are offset by the synthetic wrap; F -> id is last.
        let fail = grammar.production_count() - 1;
        let mut scanner = VecScanner::new([id]);
        let mut builder = NodeBuilder::new().fail_on(fail);
        let mut handler = CollectingErrorHandler::default();
        let result = Parser::new(&table).run(&mut scanner, &mut builder, &mut handler);

        assert!(matches!(result, Err(ParseError::Semantic { .. })));
        assert_eq!(handler.semantic_errors().len(), 1);
    }

    #[test]
    fn test_syntax_error_reports_shiftable_terminals() {
        let (grammar, symbols) = expression_grammar();
        let id = symbols.lookup("id").unwrap();
        let lparen = symbols.lookup("(").unwrap();
        let plus = symbols.lookup("+").unwrap();

        let table = TableBuilder::new(&grammar).build().unwrap();
        let mut scanner = VecScanner::new([plus]);
        let mut builder = NodeBuilder::new();
        let mut handler = CollectingErrorHandler::default();
        let _ = Parser::new(&table).run(&mut scanner, &mut builder, &mut handler);

        // State 0 can start an expression with '(' or id, nothing else.
        let expected = &handler.expected_sets()[0];
        assert!(expected.contains(&id));
        assert!(expected.contains(&lparen));
        assert!(!expected.contains(&plus));
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_table_serialization_round_trip() {
        let (grammar, symbols) = expression_grammar();
        let table = TableBuilder::new(&grammar).build().unwrap();

        let json = serde_json::to_string(&table).unwrap();
        let restored: crate::table::ParserTable = serde_json::from_str(&json).unwrap();

        // The restored table drives a parse without the grammar around.
        let id = symbols.lookup("id").unwrap();
        let star = symbols.lookup("*").unwrap();
        let mut scanner = VecScanner::new([id, star, id]);
        let mut builder = NodeBuilder::new();
        let mut handler = CollectingErrorHandler::default();
        let tree = Parser::new(&restored)
            .run(&mut scanner, &mut builder, &mut handler)
            .unwrap();
        assert!(handler.is_empty());
        assert!(!tree.children().is_empty());
    }
}

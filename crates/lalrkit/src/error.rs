//! Runtime error types.
//!
//! Construction-time failures have their own types next to the phase that
//! produces them ([`GrammarError`](crate::grammar::GrammarError) for grammar
//! validation, [`BuildError`](crate::table::BuildError) for table building);
//! this module covers the errors a running parser can hit. All three runtime
//! kinds abort the current parse: the parser never attempts recovery beyond
//! reporting through the [`ErrorHandler`](crate::parser::ErrorHandler).

use crate::grammar::Symbol;
use crate::position::SourcePosition;
use thiserror::Error;

/// An error raised by a [`TreeBuilder`](crate::parser::TreeBuilder) while
/// building a nonterminal node, e.g. a failed semantic action.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SemanticError {
    pub message: String,
}

impl SemanticError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a parse aborted.
///
/// Every variant is also delivered to the [`ErrorHandler`](crate::parser::ErrorHandler)
/// before [`Parser::run`](crate::parser::Parser::run) returns.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The scanner reported an unrecognized token.
    #[error("lexical error at {position}")]
    Lexical { position: SourcePosition },

    /// No table action exists for the current state and terminal. `expected`
    /// lists the terminals that could have shifted in that state.
    #[error("syntax error at {position}")]
    Syntax {
        position: SourcePosition,
        expected: Vec<Symbol>,
    },

    /// The tree builder rejected a reduction.
    #[error("semantic error at {position}: {source}")]
    Semantic {
        position: SourcePosition,
        source: SemanticError,
    },
}

impl ParseError {
    /// The position the error was reported at.
    #[must_use]
    pub const fn position(&self) -> SourcePosition {
        match self {
            Self::Lexical { position }
            | Self::Syntax { position, .. }
            | Self::Semantic { position, .. } => *position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::Syntax {
            position: SourcePosition::new(3, 7, 42),
            expected: vec![1, 2],
        };
        assert_eq!(err.to_string(), "syntax error at 3:7");
        assert_eq!(err.position().line, 3);
    }

    #[test]
    fn test_semantic_error_source() {
        let err = ParseError::Semantic {
            position: SourcePosition::start(),
            source: SemanticError::new("division by zero"),
        };
        assert!(err.to_string().contains("division by zero"));
    }
}

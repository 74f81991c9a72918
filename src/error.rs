//! Error types for the manipulation core.
//!
//! One `thiserror`-derived sum type covers every failure mode named in the
//! design: parsing, shape mismatches, attrpath/scope walking, and resolver
//! failures. The library never panics on malformed *input*; panics are
//! reserved for programmer misuse of the indexing sugar (see
//! [`crate::source::SourceFile`]).

use std::fmt;

/// A 1-indexed source position, used by [`Error::Parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: usize,
    /// Column number, starting at 1.
    pub column: usize,
    /// Byte offset from the start of the source.
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Every way a manipulation can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid Nix syntax in the input document or in a `value_source`
    /// passed to [`crate::edit::set_value`].
    #[error("parse error{}: {message}", position.map(|p| format!(" at {p}")).unwrap_or_default())]
    Parse {
        /// Human-readable description from the underlying grammar.
        message: String,
        /// Location of the failure, when the grammar reports one.
        position: Option<Position>,
    },

    /// The value passed to [`crate::edit::set_value`] did not parse to
    /// exactly one Nix expression.
    #[error("expected exactly one Nix expression, found {found}")]
    NotASingleExpression {
        /// What was found instead (e.g. "0 expressions", "2 expressions").
        found: String,
    },

    /// The top-level expression of a [`crate::source::SourceFile`] is not an
    /// attribute set, nor a function/assertion that transitively returns one.
    #[error("top-level expression is not an attribute set (or a function/assert returning one)")]
    Shape,

    /// `get`/`remove` on an [`crate::expr::AttributeSet`] found no binding
    /// with the given key.
    #[error("no binding named {key:?}")]
    KeyMissing {
        /// The missing key.
        key: String,
    },

    /// An attrpath walk tried to overwrite an existing attrpath root with a
    /// non-attrset value, or descend through a non-attrset value.
    #[error("attrpath conflict: {0:?} is not an attribute set")]
    AttrPathConflict(String),

    /// A path segment was empty or used reserved characters without being
    /// quoted.
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),

    /// A `@@`-or-deeper scope selector referenced an outer `let` layer that
    /// does not exist.
    #[error("scope selector requests an outer scope that does not exist")]
    ScopeMissing,

    /// [`crate::expr::Identifier::resolve`] could not find a binding for the
    /// name in any enclosing scope.
    #[error("unbound identifier {name:?}")]
    UnboundIdentifier {
        /// The identifier name.
        name: String,
    },

    /// [`crate::expr::Identifier::resolve`] followed a chain of identifiers
    /// back to one already visited.
    #[error("resolution cycle detected while resolving {name:?}")]
    ResolutionCycle {
        /// The identifier name where the cycle was detected.
        name: String,
    },

    /// Internal consistency failure: a trivia unit extracted from the
    /// concrete syntax tree could not be attributed to any semantic node.
    /// This indicates a mismatch between the extractor and the grammar it
    /// walks, not a problem with the input document.
    #[error("internal error: trivia unit could not be attached to a node ({context})")]
    TriviaUnowned {
        /// Where in the extractor this was detected.
        context: String,
    },

    /// Wraps I/O failures from [`crate::parser::parse_file`] and the CLI's
    /// file handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

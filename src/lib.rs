//! Structural, format-preserving editing of Nix source code.
//!
//! A [`SourceFile`] is a Nix document lowered into a lossless expression
//! tree (§3.2): every comment, blank line, and quoting choice the original
//! author made is kept as [`trivia`] attached to the node it belongs to, so
//! editing one binding's value and calling [`SourceFile::rebuild`] again
//! reproduces everything else byte-for-byte.
//!
//! ```
//! use nix_manipulator::parse;
//!
//! let mut file = parse("{\n  # keep me\n  version = \"1.0\";\n}\n").unwrap();
//! file.set("version", "1.1").unwrap();
//! assert_eq!(file.rebuild(), "{\n  # keep me\n  version = \"1.1\";\n}\n");
//! ```
//!
//! The [`edit`] module layers NPATH-addressed `set_value`/`remove_value` on
//! top of [`SourceFile`] for callers (including the `nix-manipulator` CLI)
//! that want to name a binding by dotted path rather than walk the tree by
//! hand.

pub mod coerce;
pub mod config;
pub mod edit;
pub mod error;
pub mod expr;
mod extract;
pub mod mapping;
pub mod parser;
pub mod rebuild;
pub mod resolve;
pub mod source;
pub mod trivia;

pub use coerce::{IntoExpr, Null};
pub use config::ManipulatorConfig;
pub use edit::{remove_value, set_value};
pub use error::{Error, Position, Result};
pub use expr::{
    Argument, Assertion, AttrSegment, AttributeSet, Binding, BinaryExpression, Expr, FunctionCall,
    FunctionDefinition, Identifier, IfExpression, Inherit, LetExpression, Multiline, NixList, NixPath,
    Parenthesized, PatternField, Primitive, PrimitiveNode, Select, UnaryExpression, Value, WithStatement,
};
pub use parser::{parse, parse_file, parse_file_with_config, parse_with_config};
pub use source::SourceFile;

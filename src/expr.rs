//! The expression model: a closed tagged union over Nix's grammar (§3.2).
//!
//! Every variant carries its own [`TriviaSet`] plus its semantic children.
//! Binding values live behind `Rc<RefCell<..>>` rather than a plain `Box`:
//! the identifier resolver (§4.4) needs a *non-owning* handle it can follow
//! back to the defining binding and mutate in place, and a shared cell is
//! the idiomatic way to do that without turning the whole tree into a
//! pointer graph (see `DESIGN.md` for the rejected alternatives).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::trivia::TriviaSet;

/// A Nix scalar literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// A double-quoted or indented string literal. `raw_indented` preserves
    /// a `''...''` literal verbatim; `None` means a `"..."` literal whose
    /// rendered form is derived by the rebuilder's escaping rules.
    Str { value: String, raw_indented: Option<String> },
    /// A boolean literal.
    Bool(bool),
    /// An integer literal.
    Int(i64),
    /// A floating point literal.
    Float(f64),
    /// The `null` literal.
    Null,
}

/// A bare identifier reference (`foo`, `pkgs`, …).
#[derive(Debug, Clone)]
pub struct Identifier {
    pub trivia: TriviaSet,
    pub name: String,
    /// Non-owning handle to the lexical scope this identifier was read
    /// through. `None` for identifiers built programmatically or never
    /// read via a container that attaches scope (see §4.4).
    pub(crate) scope: RefCell<Option<Weak<crate::resolve::ScopeFrame>>>,
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Identifier {
    /// A fresh, scope-less identifier — the form produced by [`crate::coerce`]
    /// and by hand-written `Expr` construction.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            trivia: TriviaSet::empty(),
            name: name.into(),
            scope: RefCell::new(None),
        }
    }
}

/// A `/nix/store/...` or relative path literal, rendered verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct NixPath {
    pub trivia: TriviaSet,
    pub raw: String,
}

/// Whether a container renders on one line or spreads across several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiline {
    /// Let the rebuilder decide from the structural heuristics in §4.2.
    Auto,
    /// Always render multiline.
    On,
    /// Always render on one line.
    Off,
}

/// `[ a b c ]`.
#[derive(Debug, Clone)]
pub struct NixList {
    pub trivia: TriviaSet,
    pub elements: Vec<Expr>,
    pub multiline: Multiline,
}

/// One layer of an attribute-set-like binding scope: the shape shared by
/// `AttributeSet.values` and each frame of `AttributeSet.scope_stack` /
/// `LetExpression.local_variables`.
#[derive(Debug, Clone)]
pub enum Value {
    Binding(Binding),
    Inherit(Inherit),
}

/// `name = value;`, or `a.b.c = value;` when `nested` is set.
#[derive(Debug, Clone)]
pub struct Binding {
    pub trivia: TriviaSet,
    /// Attrpath segments. A plain `foo = …;` binding has exactly one
    /// segment and `nested == false`; `foo.bar.baz = …;` has three segments
    /// and `nested == true`.
    pub path: Vec<AttrSegment>,
    pub value: Rc<RefCell<Expr>>,
    pub nested: bool,
    /// Set by the trivia extractor when a trailing inline comment is
    /// attached to `value`'s `after` trivia — the rebuilder must then emit
    /// the `;` on a fresh line (§4.1).
    pub semicolon_on_new_line: bool,
}

impl Binding {
    /// The first attrpath segment — what `AttributeSet::get`/`set`/`remove`
    /// match on (§3.3: "key lookup is by first-segment equality").
    pub fn key(&self) -> &str {
        self.path[0].as_str()
    }
}

/// One segment of an attrpath: a bare identifier, a string that requires
/// quoting, or a dynamic `${expr}` segment.
#[derive(Debug, Clone)]
pub enum AttrSegment {
    Bare(String),
    Quoted(String),
    Dynamic(Box<Expr>),
}

impl AttrSegment {
    pub fn as_str(&self) -> &str {
        match self {
            AttrSegment::Bare(s) | AttrSegment::Quoted(s) => s,
            AttrSegment::Dynamic(_) => "",
        }
    }

    /// `true` for segments matching `[A-Za-z_][A-Za-z0-9_'\-]*`.
    pub fn is_bare_safe(s: &str) -> bool {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '-'))
    }
}

/// `inherit a b;` or `inherit (src) a b;`.
#[derive(Debug, Clone)]
pub struct Inherit {
    pub trivia: TriviaSet,
    pub names: Vec<Identifier>,
    pub from_expression: Option<Box<Expr>>,
}

/// `{ ... }` or `rec { ... }`.
#[derive(Debug, Clone)]
pub struct AttributeSet {
    pub trivia: TriviaSet,
    pub values: Vec<Value>,
    pub recursive: bool,
    pub multiline: Multiline,
    /// `let` layers that wrap this set when rendered, outermost first.
    /// `scope_stack.last()` is the layer immediately enclosing this set.
    pub scope_stack: Vec<Vec<Binding>>,
    /// Original attrpath-binding order, if this set was parsed rather than
    /// constructed — used by `set` to decide where a new binding belongs
    /// relative to existing attrpath groupings. `None` for fresh sets.
    pub attrpath_order: Option<Vec<String>>,
}

impl AttributeSet {
    /// A fresh, empty, non-recursive attribute set with auto layout.
    pub fn new() -> Self {
        Self {
            trivia: TriviaSet::empty(),
            values: Vec::new(),
            recursive: false,
            multiline: Multiline::Auto,
            scope_stack: Vec::new(),
            attrpath_order: None,
        }
    }
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self::new()
    }
}

/// `let local_variables...; in value`.
#[derive(Debug, Clone)]
pub struct LetExpression {
    pub trivia: TriviaSet,
    pub local_variables: Vec<Binding>,
    pub value: Box<Expr>,
}

/// `with environment; body`.
#[derive(Debug, Clone)]
pub struct WithStatement {
    pub trivia: TriviaSet,
    pub environment: Box<Expr>,
    pub body: Box<Expr>,
}

/// `if condition then consequence else alternative`.
#[derive(Debug, Clone)]
pub struct IfExpression {
    pub trivia: TriviaSet,
    pub condition: Box<Expr>,
    pub consequence: Box<Expr>,
    pub alternative: Box<Expr>,
}

/// `expression.attribute` or `expression.attribute or default`.
#[derive(Debug, Clone)]
pub struct Select {
    pub trivia: TriviaSet,
    pub expression: Box<Expr>,
    pub attribute: Vec<AttrSegment>,
    pub default: Option<Box<Expr>>,
}

/// A function parameter pattern: a plain identifier, or a `{ ... }`
/// destructuring pattern (possibly with an `@`-bound whole-argument name
/// and/or a trailing `...`).
#[derive(Debug, Clone)]
pub enum Argument {
    Identifier(Identifier),
    Pattern {
        fields: Vec<PatternField>,
        bind: Option<Identifier>,
        ellipsis: bool,
    },
}

/// One field of a destructuring function pattern, with an optional default.
#[derive(Debug, Clone)]
pub struct PatternField {
    pub name: String,
    pub default: Option<Expr>,
}

/// `argument_set: output`.
#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub trivia: TriviaSet,
    pub argument: Argument,
    pub output: Box<Expr>,
}

/// `name argument`, or `name argument` where `argument` is itself an
/// attribute set literal (`recursive` records whether that argument set
/// introduces its bindings into the callee's resolution scope, per §4.4).
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub trivia: TriviaSet,
    pub name: Box<Expr>,
    pub argument: Box<Expr>,
    pub recursive: bool,
}

/// `left operator right`.
#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub trivia: TriviaSet,
    pub left: Box<Expr>,
    pub operator: String,
    pub right: Box<Expr>,
}

/// `operator expression` (`-x`, `!x`).
#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub trivia: TriviaSet,
    pub operator: String,
    pub expression: Box<Expr>,
}

/// `assert condition; body`.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub trivia: TriviaSet,
    pub condition: Box<Expr>,
    pub body: Box<Expr>,
}

/// `(inner)`.
#[derive(Debug, Clone)]
pub struct Parenthesized {
    pub trivia: TriviaSet,
    pub inner: Box<Expr>,
}

/// The closed tagged union of everything a Nix expression can be.
#[derive(Debug, Clone)]
pub enum Expr {
    Primitive(PrimitiveNode),
    Identifier(Identifier),
    Path(NixPath),
    List(NixList),
    AttributeSet(AttributeSet),
    Let(LetExpression),
    With(WithStatement),
    If(IfExpression),
    Select(Select),
    Function(FunctionDefinition),
    Call(FunctionCall),
    Binary(BinaryExpression),
    Unary(UnaryExpression),
    Assert(Assertion),
    Paren(Parenthesized),
}

/// A [`Primitive`] plus its trivia — kept as its own struct so `Primitive`
/// itself (the value payload) stays trivially `Copy`-ish and easy to
/// construct from [`crate::coerce`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveNode {
    pub trivia: TriviaSet,
    pub value: Primitive,
}

impl Expr {
    /// Borrow this expression as an [`AttributeSet`], if it is (or
    /// transitively wraps, via function/assert, per §3.3) one.
    pub fn as_attribute_set(&self) -> Option<&AttributeSet> {
        match self {
            Expr::AttributeSet(set) => Some(set),
            Expr::Function(f) => f.output.as_attribute_set(),
            Expr::Assert(a) => a.body.as_attribute_set(),
            _ => None,
        }
    }

    /// Mutable counterpart of [`Self::as_attribute_set`].
    pub fn as_attribute_set_mut(&mut self) -> Option<&mut AttributeSet> {
        match self {
            Expr::AttributeSet(set) => Some(set),
            Expr::Function(f) => f.output.as_attribute_set_mut(),
            Expr::Assert(a) => a.body.as_attribute_set_mut(),
            _ => None,
        }
    }

    pub(crate) fn trivia(&self) -> &TriviaSet {
        match self {
            Expr::Primitive(n) => &n.trivia,
            Expr::Identifier(n) => &n.trivia,
            Expr::Path(n) => &n.trivia,
            Expr::List(n) => &n.trivia,
            Expr::AttributeSet(n) => &n.trivia,
            Expr::Let(n) => &n.trivia,
            Expr::With(n) => &n.trivia,
            Expr::If(n) => &n.trivia,
            Expr::Select(n) => &n.trivia,
            Expr::Function(n) => &n.trivia,
            Expr::Call(n) => &n.trivia,
            Expr::Binary(n) => &n.trivia,
            Expr::Unary(n) => &n.trivia,
            Expr::Assert(n) => &n.trivia,
            Expr::Paren(n) => &n.trivia,
        }
    }

    /// `true` if rendering this expression requires more than one line,
    /// used by the parent container's multiline heuristics (§4.2).
    pub fn renders_multiline(&self, cfg: &crate::config::ManipulatorConfig) -> bool {
        match self {
            Expr::List(l) => crate::rebuild::list_is_multiline(l, cfg),
            Expr::AttributeSet(a) => crate::rebuild::attrset_is_multiline(a, cfg),
            Expr::Let(_) => true,
            _ => false,
        }
    }
}

/// The whole parsed document: one top-level [`Expr`] plus file-level
/// leading/trailing trivia (§3.2, `SourceFile`).
#[derive(Debug, Clone)]
pub struct SourceFileExpr {
    pub leading: TriviaSet,
    pub expr: Expr,
    pub trailing: TriviaSet,
}

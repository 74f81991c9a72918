//! Identifier resolution across lexical scopes (§4.4).
//!
//! `ScopeFrame` is a small, `Rc`-linked structure that sits *alongside* the
//! owned `Expr` tree rather than inside it: it is built lazily whenever a
//! container is indexed (`AttributeSet::get`, `Binding` iteration, …) and an
//! `Identifier`'s back-reference is a `Weak<ScopeFrame>` — non-owning, as
//! the design notes require ("a back-reference is a pair resolvable by
//! lookup, not a pointer that keeps the container alive"). Each frame holds
//! `Rc<RefCell<Expr>>` handles directly into the bindings it introduces, so
//! resolving and then mutating through `Identifier::set_value` reaches the
//! live binding rather than a stale copy.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};
use crate::expr::{Expr, Identifier};

/// What kind of lexical construct introduced a [`ScopeFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Let,
    RecAttrSet,
    With,
    FunctionArgument,
}

/// One lexical scope layer: a name → value-cell map, plus a link to the
/// next scope out.
#[derive(Debug)]
pub struct ScopeFrame {
    pub kind: ScopeKind,
    bindings: RefCell<HashMap<String, Rc<RefCell<Expr>>>>,
    /// For `With` frames only: the environment attribute set, if it was
    /// resolvable without evaluation (§4.4, "conservatively handled").
    with_environment: Option<Rc<RefCell<Expr>>>,
    parent: Option<Rc<ScopeFrame>>,
}

impl ScopeFrame {
    /// A frame introducing `bindings` (e.g. a `let` or a `rec` attribute
    /// set), chained to `parent`.
    pub fn new_bindings(
        kind: ScopeKind,
        bindings: HashMap<String, Rc<RefCell<Expr>>>,
        parent: Option<Rc<ScopeFrame>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            kind,
            bindings: RefCell::new(bindings),
            with_environment: None,
            parent,
        })
    }

    /// A `with environment; body` frame. `environment` is `Some` only when
    /// it was a plain identifier resolving to an attribute set reachable
    /// without evaluation; otherwise lookups fall through to `parent`
    /// without finding anything here.
    pub fn new_with(environment: Option<Rc<RefCell<Expr>>>, parent: Option<Rc<ScopeFrame>>) -> Rc<Self> {
        Rc::new(Self {
            kind: ScopeKind::With,
            bindings: RefCell::new(HashMap::new()),
            with_environment: environment,
            parent,
        })
    }

    /// Look up `name` in this frame, then `with`-environments, then parent
    /// frames outward. Returns the live value cell.
    fn lookup(&self, name: &str) -> Option<Rc<RefCell<Expr>>> {
        if let Some(cell) = self.bindings.borrow().get(name) {
            return Some(Rc::clone(cell));
        }
        if let Some(env) = &self.with_environment {
            if let Expr::AttributeSet(set) = &*env.borrow() {
                for value in &set.values {
                    if let crate::expr::Value::Binding(b) = value {
                        if b.key() == name {
                            return Some(Rc::clone(&b.value));
                        }
                    }
                }
            }
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Insert or replace a binding introduced directly by this frame (used
    /// when the edit layer creates a fresh `@`-scoped `let` binding).
    pub fn define(&self, name: String, cell: Rc<RefCell<Expr>>) {
        self.bindings.borrow_mut().insert(name, cell);
    }
}

/// Attach a scope back-reference to `ident`, as if it had just been read
/// through `frame` (§4.4: "attached at the moment the identifier is read
/// through a container").
pub fn attach_scope(ident: &Identifier, frame: &Rc<ScopeFrame>) {
    *ident.scope.borrow_mut() = Some(Rc::downgrade(frame));
}

/// Owns every [`ScopeFrame`] created while lowering one document.
///
/// `attach_scope` only ever gives an `Identifier` a `Weak<ScopeFrame>`, so
/// without some other owner keeping the strong count above zero, a frame
/// is dropped the moment the `lower_*` call that built it returns, and
/// every `Weak::upgrade` on it fails forever after. A [`SourceFile`] holds
/// one arena for its whole lifetime so resolution keeps working for as
/// long as the document does.
///
/// [`SourceFile`]: crate::source::SourceFile
#[derive(Debug, Default, Clone)]
pub struct ScopeArena(Rc<RefCell<Vec<Rc<ScopeFrame>>>>);

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `frame` alive for as long as this arena lives.
    pub fn retain(&self, frame: &Rc<ScopeFrame>) {
        self.0.borrow_mut().push(Rc::clone(frame));
    }
}

impl Identifier {
    /// Resolve this identifier to its defining value, following identifier
    /// aliases (§4.4 step 2) and failing on an unbound name or a cycle.
    pub fn resolve(&self) -> Result<Rc<RefCell<Expr>>> {
        let mut visited = HashSet::new();
        self.resolve_inner(&mut visited)
    }

    fn resolve_inner(&self, visited: &mut HashSet<String>) -> Result<Rc<RefCell<Expr>>> {
        if !visited.insert(self.name.clone()) {
            return Err(Error::ResolutionCycle { name: self.name.clone() });
        }
        let frame = self
            .scope
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::UnboundIdentifier { name: self.name.clone() })?;
        let cell = frame
            .lookup(&self.name)
            .ok_or_else(|| Error::UnboundIdentifier { name: self.name.clone() })?;

        let next = match &*cell.borrow() {
            Expr::Identifier(inner) => Some(inner.clone()),
            _ => None,
        };
        match next {
            Some(inner) => inner.resolve_inner(visited),
            None => Ok(cell),
        }
    }

    /// Reassign the binding this identifier directly names (not following
    /// further aliases — §4.5 coercion applies to `new_value`).
    pub fn set_value(&self, new_value: Expr) -> Result<()> {
        let frame = self
            .scope
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::UnboundIdentifier { name: self.name.clone() })?;
        let cell = frame
            .lookup(&self.name)
            .ok_or_else(|| Error::UnboundIdentifier { name: self.name.clone() })?;
        *cell.borrow_mut() = new_value;
        Ok(())
    }
}

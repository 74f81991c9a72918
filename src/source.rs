//! [`SourceFile`]: the whole parsed document (§6.1).

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use crate::config::ManipulatorConfig;
use crate::error::{Error, Result};
use crate::expr::{AttributeSet, Expr, SourceFileExpr};
use crate::rebuild::Rebuild;
use crate::resolve::ScopeArena;

/// A parsed, mutable Nix document.
///
/// `get`/`set`/`remove` (§6.1: "`SourceFile[key] / [key] = v / del [key]`
/// delegating to the top-level attribute set") delegate to
/// [`Self::top_level`] / [`Self::top_level_mut`]. They are plain methods
/// rather than `std::ops::Index` impls: a binding's value lives behind
/// `Rc<RefCell<Expr>>` (§4.4), so there is no `&Expr` to hand back without
/// either leaking the `RefCell` borrow or giving up on shared mutation for
/// the resolver — `get` therefore returns an owned clone.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub(crate) root: SourceFileExpr,
    pub(crate) config: ManipulatorConfig,
    pub(crate) source_path: Option<PathBuf>,
    /// Keeps every `ScopeFrame` built while lowering this document alive,
    /// so `Identifier::resolve`/`set_value` (§4.4) can still upgrade their
    /// `Weak` back-references (see `ScopeArena`'s docs).
    #[allow(dead_code)]
    pub(crate) scopes: ScopeArena,
}

impl SourceFile {
    pub(crate) fn new(
        root: SourceFileExpr,
        config: ManipulatorConfig,
        source_path: Option<PathBuf>,
        scopes: ScopeArena,
    ) -> Self {
        Self { root, config, source_path, scopes }
    }

    /// The file this document was parsed from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// The config this document rebuilds with.
    pub fn config(&self) -> &ManipulatorConfig {
        &self.config
    }

    /// The top-level expression.
    pub fn expr(&self) -> &Expr {
        &self.root.expr
    }

    /// Mutable top-level expression.
    pub fn expr_mut(&mut self) -> &mut Expr {
        &mut self.root.expr
    }

    /// Borrow the top-level expression as an attribute set (§3.3).
    pub fn top_level(&self) -> Result<&AttributeSet> {
        self.root.expr.as_attribute_set().ok_or(Error::Shape)
    }

    /// Mutable counterpart of [`Self::top_level`].
    pub fn top_level_mut(&mut self) -> Result<&mut AttributeSet> {
        self.root.expr.as_attribute_set_mut().ok_or(Error::Shape)
    }

    /// Serialize this document back to Nix source text (§4.2, §6.1). Never
    /// fails on a well-formed tree.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rebuild(&self) -> String {
        let body = self.root.expr.rebuild(&self.config, 0);
        format!(
            "{}{}{}",
            self.root.leading.render_before(),
            body,
            self.root.trailing.render_after()
        )
    }

    /// `SourceFile[key]` (§6.1): the top-level binding's value, cloned.
    pub fn get(&self, key: &str) -> Result<Expr> {
        self.top_level()?.get_value(key)
    }

    /// `SourceFile[key] = v` (§6.1).
    pub fn set(&mut self, key: &str, value: impl crate::coerce::IntoExpr) -> Result<()> {
        self.top_level_mut()?.set(key, value)
    }

    /// `del SourceFile[key]` (§6.1).
    pub fn remove(&mut self, key: &str) -> Result<()> {
        self.top_level_mut()?.remove(key)
    }
}

impl Deref for SourceFile {
    type Target = Expr;

    fn deref(&self) -> &Expr {
        &self.root.expr
    }
}

impl DerefMut for SourceFile {
    fn deref_mut(&mut self) -> &mut Expr {
        &mut self.root.expr
    }
}

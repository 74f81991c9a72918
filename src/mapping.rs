//! The mapping layer over `AttributeSet` (§4.3): key→binding semantics,
//! attrpath splitting/merging, and scope pruning.
//!
//! A `Binding`'s `path` already holds a compound attrpath directly (`a.b.c`
//! parses to one binding with three segments) — that mirrors how Nix's own
//! grammar represents it, so `set`/`remove` never need to synthesize
//! brace-nested `AttributeSet` values to express depth; they only ever grow
//! or shrink a binding's segment list, descending into an existing literal
//! `{ ... }` value when one is already there.

use std::cell::RefCell;
use std::rc::Rc;

use crate::coerce::IntoExpr;
use crate::error::{Error, Result};
use crate::expr::{AttrSegment, AttributeSet, Binding, Expr, Value};
use crate::trivia::TriviaSet;

impl AttributeSet {
    fn find_binding(&self, key: &str) -> Option<&Binding> {
        self.values.iter().find_map(|v| match v {
            Value::Binding(b) if b.key() == key => Some(b),
            _ => None,
        })
    }

    fn find_binding_mut(&mut self, key: &str) -> Option<&mut Binding> {
        self.values.iter_mut().find_map(|v| match v {
            Value::Binding(b) if b.key() == key => Some(b),
            _ => None,
        })
    }

    /// Clone of the binding's current value, by first-segment key (§3.3:
    /// "key lookup is by first-segment equality on `Binding.name`").
    pub fn get_value(&self, key: &str) -> Result<Expr> {
        self.find_binding(key)
            .map(|b| b.value.borrow().clone())
            .ok_or_else(|| Error::KeyMissing { key: key.to_string() })
    }

    /// `set(key, value)` (§4.3): replace an existing binding's value in
    /// place, or append a new single-segment binding.
    pub fn set(&mut self, key: &str, value: impl IntoExpr) -> Result<()> {
        let value = value.into_expr();
        if let Some(binding) = self.find_binding_mut(key) {
            *binding.value.borrow_mut() = value;
            return Ok(());
        }
        self.values.push(Value::Binding(Binding {
            trivia: TriviaSet::empty(),
            path: vec![AttrSegment::Bare(key.to_string())],
            value: Rc::new(RefCell::new(value)),
            nested: false,
            semicolon_on_new_line: false,
        }));
        Ok(())
    }

    /// `remove(key)` (§4.3): detach the binding. Pruning of a now-emptied
    /// *enclosing* scope is the edit layer's responsibility (§4.6), which
    /// knows whether this set is an inner `let` scope.
    pub fn remove(&mut self, key: &str) -> Result<()> {
        let pos = self
            .values
            .iter()
            .position(|v| matches!(v, Value::Binding(b) if b.key() == key));
        match pos {
            Some(i) => {
                self.values.remove(i);
                Ok(())
            }
            None => Err(Error::KeyMissing { key: key.to_string() }),
        }
    }

    /// Bindings in source order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.values.iter().filter_map(|v| match v {
            Value::Binding(b) => Some(b),
            Value::Inherit(_) => None,
        })
    }

    /// Whether this set has no bindings or inherits left — used by the edit
    /// layer to decide whether an inner scope should be pruned (§3.3, §4.3).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Split a dotted attrpath string into segments, honoring `"..."` quoting
/// with `\`-escapes (§4.3, §6.2 NPATH grammar). Does not handle the leading
/// `@` scope prefix — callers strip that first (see `crate::edit`).
pub fn split_path(spec: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut chars = spec.chars().peekable();
    loop {
        let mut current = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(c) => current.push(c),
                        None => return Err(Error::InvalidSegment(spec.to_string())),
                    },
                    Some('"') => break,
                    Some(c) => current.push(c),
                    None => return Err(Error::InvalidSegment(spec.to_string())),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                current.push(c);
                chars.next();
            }
        }
        if current.is_empty() {
            return Err(Error::InvalidSegment(spec.to_string()));
        }
        segments.push(current);
        match chars.next() {
            Some('.') => continue,
            Some(c) => return Err(Error::InvalidSegment(format!("unexpected {c:?} in {spec:?}"))),
            None => break,
        }
    }
    Ok(segments)
}

/// Render one path segment as NPATH syntax, quoting when it is not a bare
/// identifier (§4.3, §6.2).
pub fn render_path_segment(segment: &str) -> String {
    if AttrSegment::is_bare_safe(segment) {
        segment.to_string()
    } else {
        format!("\"{}\"", crate::rebuild::escape_string(segment))
    }
}

fn path_strings(b: &Binding) -> Vec<String> {
    b.path.iter().map(|s| s.as_str().to_string()).collect()
}

enum PathMatch {
    /// `b.path == target` exactly.
    Exact,
    /// `b.path` is a strict prefix of `target`; descend into `b`'s value
    /// with the remaining `target[b.path.len()..]`.
    Descend(usize),
    /// `target` is a strict prefix of `b.path` — the caller is trying to
    /// assign through a binding that already has more specific structure.
    Conflict,
    /// Unrelated (or only a partial, non-prefix overlap — Nix allows
    /// sibling bindings that share a prefix and merge at eval time, e.g.
    /// `a.b = 1; a.c = 2;`, so that case is `None` too).
    None,
}

fn match_path(b_path: &[String], target: &[String]) -> PathMatch {
    let common = b_path.iter().zip(target.iter()).take_while(|(a, b)| a == b).count();
    if common == b_path.len() && common == target.len() {
        PathMatch::Exact
    } else if common == b_path.len() && common < target.len() {
        PathMatch::Descend(common)
    } else if common == target.len() && common < b_path.len() {
        PathMatch::Conflict
    } else {
        PathMatch::None
    }
}

/// `set("a.b.c", v)` (§4.3): walk existing attrpath/nested structure,
/// creating a new attrpath-form binding for whatever remains unmatched.
pub fn set_nested(root: &mut AttributeSet, segments: &[String], value: Expr) -> Result<()> {
    if segments.len() == 1 {
        return root.set(&segments[0], value);
    }

    let mut found: Option<(usize, PathMatch)> = None;
    for (i, v) in root.values.iter().enumerate() {
        if let Value::Binding(b) = v {
            match match_path(&path_strings(b), segments) {
                PathMatch::None => continue,
                m => {
                    found = Some((i, m));
                    break;
                }
            }
        }
    }

    match found {
        Some((i, PathMatch::Exact)) => {
            if let Value::Binding(b) = &root.values[i] {
                *b.value.borrow_mut() = value;
            }
            Ok(())
        }
        Some((i, PathMatch::Descend(common))) => {
            let rest = &segments[common..];
            if let Value::Binding(b) = &root.values[i] {
                let mut guard = b.value.borrow_mut();
                match &mut *guard {
                    Expr::AttributeSet(inner) => set_nested(inner, rest, value),
                    _ => Err(Error::AttrPathConflict(segments[..common].join("."))),
                }
            } else {
                unreachable!("index recorded only for Value::Binding")
            }
        }
        Some((_, PathMatch::Conflict)) => Err(Error::AttrPathConflict(segments.join("."))),
        Some((_, PathMatch::None)) | None => {
            root.values.push(Value::Binding(Binding {
                trivia: TriviaSet::empty(),
                path: segments.iter().cloned().map(AttrSegment::Bare).collect(),
                value: Rc::new(RefCell::new(value)),
                nested: true,
                semicolon_on_new_line: false,
            }));
            Ok(())
        }
    }
}

/// `remove("a.b.c")` (§4.3): removes the leaf; if its parent binding ends
/// up empty, the parent is removed too, recursively.
pub fn remove_nested(root: &mut AttributeSet, segments: &[String]) -> Result<()> {
    if segments.len() == 1 {
        return root.remove(&segments[0]);
    }

    let mut found: Option<(usize, PathMatch)> = None;
    for (i, v) in root.values.iter().enumerate() {
        if let Value::Binding(b) = v {
            match match_path(&path_strings(b), segments) {
                PathMatch::None => continue,
                m => {
                    found = Some((i, m));
                    break;
                }
            }
        }
    }

    match found {
        Some((i, PathMatch::Exact)) => {
            root.values.remove(i);
            Ok(())
        }
        Some((i, PathMatch::Descend(common))) => {
            let rest = &segments[common..];
            let parent_now_empty = {
                let b = match &root.values[i] {
                    Value::Binding(b) => b,
                    _ => unreachable!(),
                };
                let mut guard = b.value.borrow_mut();
                match &mut *guard {
                    Expr::AttributeSet(inner) => {
                        remove_nested(inner, rest)?;
                        inner.is_empty()
                    }
                    _ => return Err(Error::AttrPathConflict(segments[..common].join("."))),
                }
            };
            if parent_now_empty {
                root.values.remove(i);
            }
            Ok(())
        }
        Some((_, PathMatch::Conflict)) | Some((_, PathMatch::None)) | None => {
            Err(Error::KeyMissing { key: segments.join(".") })
        }
    }
}

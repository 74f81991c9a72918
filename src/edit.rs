//! The edit API (§4.6): NPATH-addressed `set_value`/`remove_value` over a
//! [`SourceFile`], including the `@`-prefixed scope-depth selector.
//!
//! NPATH grammar (§6.2): `(@+)? segment ("." segment)*`. No `@` targets the
//! top-level attribute set; each `@` walks one `let` layer outward from the
//! innermost scope enclosing the top-level set, auto-creating that layer on
//! assignment if it doesn't exist yet, and pruning it on removal once empty.

use crate::config::ManipulatorConfig;
use crate::error::{Error, Result};
use crate::expr::{AttrSegment, AttributeSet, Binding, Expr, Value};
use crate::mapping::{remove_nested, set_nested, split_path};
use crate::source::SourceFile;
use crate::trivia::TriviaSet;

/// Parsed NPATH: how many `let` layers to walk out (`scope_depth`, 0 = the
/// top-level set itself) plus the dotted segments within that scope.
struct NPath {
    scope_depth: usize,
    segments: Vec<String>,
}

fn parse_npath(spec: &str) -> Result<NPath> {
    let at_count = spec.chars().take_while(|&c| c == '@').count();
    let rest = &spec[at_count..];
    if rest.is_empty() {
        return Err(Error::InvalidSegment(spec.to_string()));
    }
    Ok(NPath { scope_depth: at_count, segments: split_path(rest)? })
}

/// `set_value(source, "@a.b.c", value_source)` (§4.6): parse `value_source`
/// as exactly one Nix expression and assign it at `path_spec`.
pub fn set_value(file: &mut SourceFile, path_spec: &str, value_source: &str) -> Result<()> {
    let value = parse_single_expression(value_source)?;
    let npath = parse_npath(path_spec)?;

    if npath.scope_depth == 0 {
        let top = file.top_level_mut()?;
        return set_nested(top, &npath.segments, value);
    }
    set_in_scope_layer(file, npath.scope_depth, &npath.segments, value)
}

/// `remove_value(source, path_spec)` (§4.6).
pub fn remove_value(file: &mut SourceFile, path_spec: &str) -> Result<()> {
    let npath = parse_npath(path_spec)?;

    if npath.scope_depth == 0 {
        let top = file.top_level_mut()?;
        return remove_nested(top, &npath.segments);
    }
    remove_from_scope_layer(file, npath.scope_depth, &npath.segments)
}

fn parse_single_expression(source: &str) -> Result<Expr> {
    // Wrap in a single binding so the general parser/lowering path can be
    // reused instead of duplicating a second entry point into `rnix`.
    let wrapped = format!("{{ __value = {source}; }}");
    let file = crate::parser::parse_with_config(&wrapped, ManipulatorConfig::default())?;
    let set = file.top_level()?;
    set.get_value("__value")
}

fn set_in_scope_layer(file: &mut SourceFile, scope_depth: usize, segments: &[String], value: Expr) -> Result<()> {
    let top = file.top_level_mut()?;
    let depth_available = top.scope_stack.len();
    // The innermost scope (`@`, depth 1) is auto-created when absent; any
    // deeper selector must land on a layer that already exists — you can't
    // skip-create intermediate `let` layers from an edit.
    if scope_depth > depth_available + 1 {
        return Err(Error::ScopeMissing);
    }
    if scope_depth == depth_available + 1 {
        top.scope_stack.push(Vec::new());
    }
    let index = top.scope_stack.len() - scope_depth;
    let layer = &mut top.scope_stack[index];
    set_in_bindings(layer, segments, value)
}

fn remove_from_scope_layer(file: &mut SourceFile, scope_depth: usize, segments: &[String]) -> Result<()> {
    let top = file.top_level_mut()?;
    let depth_available = top.scope_stack.len();
    if scope_depth > depth_available {
        return Err(Error::ScopeMissing);
    }
    let index = depth_available - scope_depth;
    remove_from_bindings(&mut top.scope_stack[index], segments)?;
    if top.scope_stack[index].is_empty() {
        top.scope_stack.remove(index);
    }
    Ok(())
}

/// `set`/`remove` over a bare `Vec<Binding>` layer (a `let` scope, which
/// isn't wrapped in an `AttributeSet`) — mirrors `AttributeSet::set` without
/// needing a throwaway container.
fn set_in_bindings(layer: &mut Vec<Binding>, segments: &[String], value: Expr) -> Result<()> {
    if segments.len() == 1 {
        if let Some(b) = layer.iter().find(|b| b.key() == segments[0]) {
            *b.value.borrow_mut() = value;
            return Ok(());
        }
        layer.push(Binding {
            trivia: TriviaSet::empty(),
            path: vec![AttrSegment::Bare(segments[0].clone())],
            value: std::rc::Rc::new(std::cell::RefCell::new(value)),
            nested: false,
            semicolon_on_new_line: false,
        });
        return Ok(());
    }
    // Multi-segment assignment into a `let` layer: wrap as a temporary
    // `AttributeSet` view via the generic nested-set algorithm, then write
    // the (possibly newly created) binding back.
    let mut as_set = AttributeSet {
        trivia: TriviaSet::empty(),
        values: std::mem::take(layer).into_iter().map(Value::Binding).collect(),
        recursive: false,
        multiline: crate::expr::Multiline::Auto,
        scope_stack: Vec::new(),
        attrpath_order: None,
    };
    set_nested(&mut as_set, segments, value)?;
    *layer = as_set
        .values
        .into_iter()
        .filter_map(|v| match v {
            Value::Binding(b) => Some(b),
            Value::Inherit(_) => None,
        })
        .collect();
    Ok(())
}

fn remove_from_bindings(layer: &mut Vec<Binding>, segments: &[String]) -> Result<()> {
    let mut as_set = AttributeSet {
        trivia: TriviaSet::empty(),
        values: std::mem::take(layer).into_iter().map(Value::Binding).collect(),
        recursive: false,
        multiline: crate::expr::Multiline::Auto,
        scope_stack: Vec::new(),
        attrpath_order: None,
    };
    remove_nested(&mut as_set, segments)?;
    *layer = as_set
        .values
        .into_iter()
        .filter_map(|v| match v {
            Value::Binding(b) => Some(b),
            Value::Inherit(_) => None,
        })
        .collect();
    Ok(())
}

/// Ensure the top-level expression has at least one `let` layer available,
/// wrapping it if necessary, then return its depth — used when a caller
/// wants to guarantee `@` has somewhere to write before calling
/// [`set_value`]. Not required for normal use: `set_value` auto-creates
/// layers itself.
pub fn ensure_scope_layer(file: &mut SourceFile) -> Result<()> {
    let top = file.top_level_mut()?;
    if top.scope_stack.is_empty() {
        top.scope_stack.push(Vec::new());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_top_level_key() {
        let mut file = crate::parser::parse("{ x = 1; }").unwrap();
        set_value(&mut file, "x", "2").unwrap();
        assert_eq!(file.rebuild(), "{ x = 2; }");
    }

    #[test]
    fn sets_nested_attrpath() {
        let mut file = crate::parser::parse("{ a.b = 1; }").unwrap();
        set_value(&mut file, "a.b", "2").unwrap();
        assert!(file.rebuild().contains("a.b = 2"));
    }

    #[test]
    fn removes_key() {
        let mut file = crate::parser::parse("{ x = 1; y = 2; }").unwrap();
        remove_value(&mut file, "y").unwrap();
        assert!(file.get("y").is_err());
    }

    #[test]
    fn rejects_multi_expression_value() {
        let mut file = crate::parser::parse("{ x = 1; }").unwrap();
        assert!(set_value(&mut file, "x", "1 2").is_err());
    }

    #[test]
    fn outer_scope_selector_requires_existing_layer() {
        let mut file = crate::parser::parse("{ x = 1; }").unwrap();
        assert!(matches!(set_value(&mut file, "@@y", "1"), Err(Error::ScopeMissing)));
    }
}

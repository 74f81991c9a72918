//! Value coercion (§4.5): turning host-language scalars into [`Expr`] nodes
//! for ergonomic assignment through `AttributeSet::set` / `Binding::value`.

use std::collections::BTreeMap;

use crate::expr::{AttrSegment, AttributeSet, Binding, Expr, Primitive, PrimitiveNode, Value};
use crate::trivia::TriviaSet;

/// Anything that can become an [`Expr`] by value coercion. Implemented for
/// native scalars and ordered maps; already-built `Expr`s pass through
/// unchanged. A bare `String`/`&str` always coerces to a string literal —
/// callers who want an identifier reference must construct
/// `Expr::Identifier` explicitly (§4.5: "a string that is explicitly
/// intended as an Identifier must be passed as an Identifier value").
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

fn primitive(value: Primitive) -> Expr {
    Expr::Primitive(PrimitiveNode { trivia: TriviaSet::empty(), value })
}

impl IntoExpr for &str {
    fn into_expr(self) -> Expr {
        primitive(Primitive::Str { value: self.to_string(), raw_indented: None })
    }
}

impl IntoExpr for String {
    fn into_expr(self) -> Expr {
        primitive(Primitive::Str { value: self, raw_indented: None })
    }
}

impl IntoExpr for bool {
    fn into_expr(self) -> Expr {
        primitive(Primitive::Bool(self))
    }
}

impl IntoExpr for i64 {
    fn into_expr(self) -> Expr {
        primitive(Primitive::Int(self))
    }
}

impl IntoExpr for f64 {
    fn into_expr(self) -> Expr {
        primitive(Primitive::Float(self))
    }
}

/// Sentinel for Nix's `null`, since `None::<()>` is ambiguous in a generic
/// `IntoExpr` bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct Null;

impl IntoExpr for Null {
    fn into_expr(self) -> Expr {
        primitive(Primitive::Null)
    }
}

impl<V: IntoExpr> IntoExpr for BTreeMap<String, V> {
    fn into_expr(self) -> Expr {
        let values = self
            .into_iter()
            .map(|(key, value)| {
                Value::Binding(Binding {
                    trivia: TriviaSet::empty(),
                    path: vec![AttrSegment::Bare(key)],
                    value: std::rc::Rc::new(std::cell::RefCell::new(value.into_expr())),
                    nested: false,
                    semicolon_on_new_line: false,
                })
            })
            .collect();
        Expr::AttributeSet(AttributeSet {
            trivia: TriviaSet::empty(),
            values,
            recursive: false,
            multiline: crate::expr::Multiline::Auto,
            scope_stack: Vec::new(),
            attrpath_order: None,
        })
    }
}

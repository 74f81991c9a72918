//! The rebuilder (§4.2): turns an [`Expr`] tree back into Nix source text.
//!
//! Every variant emits `before` trivia, its own text, then `after` trivia.
//! That ownership rule is defined once here and nowhere else — per the
//! design notes, rebuild code must not re-derive trivia placement per
//! variant.

use crate::config::ManipulatorConfig;
use crate::expr::*;

/// Does this list render across multiple lines under `multiline: Auto`?
pub fn list_is_multiline(list: &NixList, cfg: &ManipulatorConfig) -> bool {
    match list.multiline {
        Multiline::On => true,
        Multiline::Off => false,
        Multiline::Auto => {
            list.elements.len() > cfg.list_multiline_threshold
                || list.elements.iter().any(|e| e.renders_multiline(cfg))
                || list.elements.iter().any(|e| e.trivia().has_block_comment())
        }
    }
}

/// Does this attribute set render across multiple lines under
/// `multiline: Auto`?
pub fn attrset_is_multiline(set: &AttributeSet, cfg: &ManipulatorConfig) -> bool {
    match set.multiline {
        Multiline::On => true,
        Multiline::Off => false,
        Multiline::Auto => {
            set.values.len() > 1
                || set.values.iter().any(|v| value_has_block_comment(v))
                || set.values.iter().any(|v| value_renders_multiline(v, cfg))
        }
    }
}

fn value_has_block_comment(v: &Value) -> bool {
    match v {
        Value::Binding(b) => b.trivia.has_block_comment() || b.value.borrow().trivia().has_block_comment(),
        Value::Inherit(i) => i.trivia.has_block_comment(),
    }
}

fn value_renders_multiline(v: &Value, cfg: &ManipulatorConfig) -> bool {
    match v {
        Value::Binding(b) => b.value.borrow().renders_multiline(cfg),
        Value::Inherit(_) => false,
    }
}

/// Escape a string literal body per RFC-0166: `"`, `\`, and `${` are
/// escaped; `\n`, `\t`, `\r` are emitted as escapes.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '$' if chars.peek() == Some(&'{') => {
                out.push_str("\\$");
            }
            other => out.push(other),
        }
    }
    out
}

fn render_attrpath(path: &[AttrSegment]) -> String {
    path.iter()
        .map(render_segment)
        .collect::<Vec<_>>()
        .join(".")
}

fn render_segment(seg: &AttrSegment) -> String {
    match seg {
        AttrSegment::Bare(s) => s.clone(),
        AttrSegment::Quoted(s) => format!("\"{}\"", escape_string(s)),
        AttrSegment::Dynamic(e) => format!("${{{}}}", e.rebuild_inline()),
    }
}

/// Extension trait giving every `Expr` (and its constituent structs) a
/// `rebuild` entry point. Kept as a trait (rather than free functions) so
/// call sites read `node.rebuild(cfg, indent)` uniformly across variants,
/// matching the contract in §4.2 ("every variant provides `rebuild()`").
pub trait Rebuild {
    fn rebuild(&self, cfg: &ManipulatorConfig, indent: usize) -> String;

    /// Convenience for contexts (dynamic attrpath segments, single-line
    /// embeds) that never want multiline output regardless of content.
    fn rebuild_inline(&self) -> String
    where
        Self: Sized,
    {
        self.rebuild(&ManipulatorConfig::default(), 0)
    }
}

impl Rebuild for Primitive {
    fn rebuild(&self, _cfg: &ManipulatorConfig, _indent: usize) -> String {
        match self {
            Primitive::Str { value, raw_indented: Some(raw) } => {
                let _ = value;
                raw.clone()
            }
            Primitive::Str { value, raw_indented: None } => format!("\"{}\"", escape_string(value)),
            Primitive::Bool(b) => b.to_string(),
            Primitive::Int(i) => i.to_string(),
            Primitive::Float(f) => {
                if f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Primitive::Null => "null".to_string(),
        }
    }
}

impl Rebuild for Expr {
    fn rebuild(&self, cfg: &ManipulatorConfig, indent: usize) -> String {
        match self {
            Expr::Primitive(n) => wrap(&n.trivia, n.value.rebuild(cfg, indent)),
            Expr::Identifier(n) => wrap(&n.trivia, n.name.clone()),
            Expr::Path(n) => wrap(&n.trivia, n.raw.clone()),
            Expr::List(n) => wrap(&n.trivia, rebuild_list(n, cfg, indent)),
            Expr::AttributeSet(n) => wrap(&n.trivia, rebuild_attrset(n, cfg, indent)),
            Expr::Let(n) => wrap(&n.trivia, rebuild_let(n, cfg, indent)),
            Expr::With(n) => wrap(&n.trivia, rebuild_with(n, cfg, indent)),
            Expr::If(n) => wrap(&n.trivia, rebuild_if(n, cfg, indent)),
            Expr::Select(n) => wrap(&n.trivia, rebuild_select(n, cfg, indent)),
            Expr::Function(n) => wrap(&n.trivia, rebuild_function(n, cfg, indent)),
            Expr::Call(n) => wrap(&n.trivia, rebuild_call(n, cfg, indent)),
            Expr::Binary(n) => wrap(&n.trivia, rebuild_binary(n, cfg, indent)),
            Expr::Unary(n) => wrap(&n.trivia, rebuild_unary(n, cfg, indent)),
            Expr::Assert(n) => wrap(&n.trivia, rebuild_assert(n, cfg, indent)),
            Expr::Paren(n) => wrap(&n.trivia, format!("({})", n.inner.rebuild(cfg, indent))),
        }
    }
}

fn wrap(trivia: &crate::trivia::TriviaSet, body: String) -> String {
    format!("{}{}{}", trivia.render_before(), body, trivia.render_after())
}

/// Splits one container entry's trivia + content into the output lines it
/// contributes: one line per leading comment/blank-line unit, each padded
/// to the container's indent, then the entry's own padded line with any
/// trailing inline comment. A container joins every entry's lines with a
/// single flat `"\n"`-join — folding a per-entry `join("\n")` on top of
/// trivia that already carries its own blank lines would double-count the
/// separator.
fn trivia_lines(trivia: &crate::trivia::TriviaSet, pad: &str, content: String) -> Vec<String> {
    use crate::trivia::Trivia;
    let mut lines = Vec::new();
    for t in &trivia.before {
        match t {
            Trivia::BlankLine | Trivia::LineBreak => lines.push(String::new()),
            Trivia::Comment { text, .. } => lines.push(format!("{pad}#{text}")),
            Trivia::MultilineComment { text } => lines.push(format!("{pad}/*{text}*/")),
        }
    }
    lines.push(format!("{pad}{content}{}", trivia.render_after()));
    lines
}

fn rebuild_list(list: &NixList, cfg: &ManipulatorConfig, indent: usize) -> String {
    if list.elements.is_empty() {
        return "[ ]".to_string();
    }
    if list_is_multiline(list, cfg) {
        let inner_indent = indent + 1;
        let pad = cfg.indent(inner_indent);
        let body = list
            .elements
            .iter()
            .map(|e| format!("{pad}{}", e.rebuild(cfg, inner_indent)))
            .collect::<Vec<_>>()
            .join("\n");
        format!("[\n{body}\n{}]", cfg.indent(indent))
    } else {
        let body = list
            .elements
            .iter()
            .map(|e| e.rebuild(cfg, indent))
            .collect::<Vec<_>>()
            .join(" ");
        format!("[ {body} ]")
    }
}

fn rebuild_binding(b: &Binding, cfg: &ManipulatorConfig, indent: usize) -> String {
    let path = if b.nested {
        render_attrpath(&b.path)
    } else {
        render_segment(&b.path[0])
    };
    let value = b.value.borrow().rebuild(cfg, indent);
    let sep = if b.semicolon_on_new_line {
        format!("\n{}", cfg.indent(indent))
    } else {
        String::new()
    };
    format!("{path} = {value}{sep};")
}

fn rebuild_inherit(i: &Inherit, cfg: &ManipulatorConfig, indent: usize) -> String {
    let names = i
        .names
        .iter()
        .map(|id| id.name.clone())
        .collect::<Vec<_>>()
        .join(" ");
    match &i.from_expression {
        Some(from) => format!("inherit ({}) {names};", from.rebuild(cfg, indent)),
        None => format!("inherit {names};"),
    }
}

fn rebuild_value(v: &Value, cfg: &ManipulatorConfig, indent: usize) -> String {
    match v {
        Value::Binding(b) => wrap(&b.trivia, rebuild_binding(b, cfg, indent)),
        Value::Inherit(i) => wrap(&i.trivia, rebuild_inherit(i, cfg, indent)),
    }
}

/// Renders one container entry (binding or inherit) as the output lines it
/// contributes, including any leading comment/blank-line trivia above it.
fn value_lines(v: &Value, cfg: &ManipulatorConfig, indent: usize, pad: &str) -> Vec<String> {
    match v {
        Value::Binding(b) => trivia_lines(&b.trivia, pad, rebuild_binding(b, cfg, indent)),
        Value::Inherit(i) => trivia_lines(&i.trivia, pad, rebuild_inherit(i, cfg, indent)),
    }
}

fn rebuild_scope_bindings(bindings: &[Binding], cfg: &ManipulatorConfig, indent: usize) -> String {
    let inner_indent = indent + 1;
    let pad = cfg.indent(inner_indent);
    bindings
        .iter()
        .flat_map(|b| trivia_lines(&b.trivia, &pad, rebuild_binding(b, cfg, inner_indent)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rebuild_attrset(set: &AttributeSet, cfg: &ManipulatorConfig, indent: usize) -> String {
    let head = if set.recursive { "rec {" } else { "{" };

    let core = if set.values.is_empty() {
        if set.recursive { "rec { }".to_string() } else { "{ }".to_string() }
    } else if attrset_is_multiline(set, cfg) {
        let inner_indent = indent + 1;
        let pad = cfg.indent(inner_indent);
        let body = set
            .values
            .iter()
            .flat_map(|v| value_lines(v, cfg, inner_indent, &pad))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{head}\n{body}\n{}}}", cfg.indent(indent))
    } else {
        let body = set
            .values
            .iter()
            .map(|v| rebuild_value(v, cfg, indent))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{head} {body} }}")
    };

    // Wrap with any `let ... in` layers, outermost first.
    set.scope_stack.iter().rev().fold(core, |body, layer| {
        let bindings = rebuild_scope_bindings(layer, cfg, indent);
        format!("let\n{bindings}\nin\n{}{body}", cfg.indent(indent))
    })
}

fn rebuild_let(l: &LetExpression, cfg: &ManipulatorConfig, indent: usize) -> String {
    let bindings = rebuild_scope_bindings(&l.local_variables, cfg, indent);
    let body = l.value.rebuild(cfg, indent);
    format!("let\n{bindings}\nin\n{}{body}", cfg.indent(indent))
}

fn rebuild_with(w: &WithStatement, cfg: &ManipulatorConfig, indent: usize) -> String {
    format!(
        "with {}; {}",
        w.environment.rebuild(cfg, indent),
        w.body.rebuild(cfg, indent)
    )
}

fn rebuild_if(i: &IfExpression, cfg: &ManipulatorConfig, indent: usize) -> String {
    format!(
        "if {} then {} else {}",
        i.condition.rebuild(cfg, indent),
        i.consequence.rebuild(cfg, indent),
        i.alternative.rebuild(cfg, indent)
    )
}

fn rebuild_select(s: &Select, cfg: &ManipulatorConfig, indent: usize) -> String {
    let base = format!("{}.{}", s.expression.rebuild(cfg, indent), render_attrpath(&s.attribute));
    match &s.default {
        Some(d) => format!("{base} or {}", d.rebuild(cfg, indent)),
        None => base,
    }
}

fn rebuild_argument(arg: &Argument, cfg: &ManipulatorConfig, indent: usize) -> String {
    match arg {
        Argument::Identifier(id) => id.name.clone(),
        Argument::Pattern { fields, bind, ellipsis } => {
            let mut parts: Vec<String> = fields
                .iter()
                .map(|f| match &f.default {
                    Some(d) => format!("{} ? {}", f.name, d.rebuild(cfg, indent)),
                    None => f.name.clone(),
                })
                .collect();
            if *ellipsis {
                parts.push("...".to_string());
            }
            let inner = format!("{{ {} }}", parts.join(", "));
            match bind {
                Some(b) => format!("{inner}@{}", b.name),
                None => inner,
            }
        }
    }
}

fn rebuild_function(f: &FunctionDefinition, cfg: &ManipulatorConfig, indent: usize) -> String {
    format!("{}: {}", rebuild_argument(&f.argument, cfg, indent), f.output.rebuild(cfg, indent))
}

fn rebuild_call(c: &FunctionCall, cfg: &ManipulatorConfig, indent: usize) -> String {
    format!("{} {}", c.name.rebuild(cfg, indent), c.argument.rebuild(cfg, indent))
}

fn rebuild_binary(b: &BinaryExpression, cfg: &ManipulatorConfig, indent: usize) -> String {
    if b.operator == "." {
        format!("{}.{}", b.left.rebuild(cfg, indent), b.right.rebuild(cfg, indent))
    } else {
        format!("{} {} {}", b.left.rebuild(cfg, indent), b.operator, b.right.rebuild(cfg, indent))
    }
}

fn rebuild_unary(u: &UnaryExpression, cfg: &ManipulatorConfig, indent: usize) -> String {
    let operand = u.expression.rebuild(cfg, indent);
    format!("{}{operand}", u.operator)
}

fn rebuild_assert(a: &Assertion, cfg: &ManipulatorConfig, indent: usize) -> String {
    format!("assert {}; {}", a.condition.rebuild(cfg, indent), a.body.rebuild(cfg, indent))
}

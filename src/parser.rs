//! The parser adapter (§4.1, §6.1): turns Nix source text into a
//! [`SourceFile`], lowering `rnix`'s concrete syntax tree into the [`Expr`]
//! model and attaching trivia and lexical scope as it goes.
//!
//! A document with parse errors is rejected outright rather than lowered
//! best-effort — partial trees would make later `rebuild()` calls silently
//! drop or mangle content, which is worse than failing up front (§9).

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use rnix::{SyntaxKind, SyntaxNode};
use rowan::NodeOrToken;

use crate::config::ManipulatorConfig;
use crate::error::{Error, Result};
use crate::expr::*;
use crate::extract::{self, partition_children};
use crate::resolve::{attach_scope, ScopeArena, ScopeFrame, ScopeKind};
use crate::source::SourceFile;
use crate::trivia::TriviaSet;

/// Parse `text` into a [`SourceFile`] using the default configuration.
pub fn parse(text: &str) -> Result<SourceFile> {
    parse_with_config(text, ManipulatorConfig::default())
}

/// Parse `text` with an explicit [`ManipulatorConfig`] (§4.8).
#[tracing::instrument(level = "debug", skip(text))]
pub fn parse_with_config(text: &str, config: ManipulatorConfig) -> Result<SourceFile> {
    let parsed = rnix::Root::parse(text);
    if !parsed.errors().is_empty() {
        let message = parsed
            .errors()
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::Parse { message, position: None });
    }

    let root = parsed.syntax();
    let leading = extract::file_leading_trivia(&root)?;
    let trailing = extract::file_trailing_trivia(&root, text);

    let top = root
        .children()
        .next()
        .ok_or_else(|| Error::Parse { message: "empty document".into(), position: None })?;

    let arena = ScopeArena::new();
    let expr = lower(&top, None, &arena)?;

    Ok(SourceFile::new(
        SourceFileExpr { leading, expr, trailing },
        config,
        None,
        arena,
    ))
}

/// Parse a file from disk using the default configuration (§6.1).
pub fn parse_file(path: impl AsRef<Path>) -> Result<SourceFile> {
    parse_file_with_config(path, ManipulatorConfig::default())
}

/// Parse a file from disk with an explicit [`ManipulatorConfig`].
#[tracing::instrument(level = "debug", skip(path, config))]
pub fn parse_file_with_config(path: impl AsRef<Path>, config: ManipulatorConfig) -> Result<SourceFile> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let mut file = parse_with_config(&text, config)?;
    file.source_path = Some(path.to_path_buf());
    Ok(file)
}

fn node_trivia(node: &SyntaxNode) -> TriviaSet {
    // Fallback for nodes lowered outside a container's `partition_children`
    // pass (e.g. the sole top-level expression): no siblings to steal
    // trivia from, so it carries none of its own.
    let _ = node;
    TriviaSet::empty()
}

fn is_token_kind(el: &rnix::SyntaxElement, kind: SyntaxKind) -> bool {
    matches!(el, NodeOrToken::Token(t) if t.kind() == kind)
}

/// Lower one semantic syntax node into an [`Expr`], attaching `scope` (the
/// lexical scope it was read through, if any) to every `Identifier` found
/// directly within it. Any `ScopeFrame` created along the way is registered
/// with `arena` so the `Weak` back-references handed to identifiers stay
/// upgradeable for the document's lifetime (§4.4).
fn lower(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    match node.kind() {
        SyntaxKind::NODE_LITERAL => lower_literal(node),
        SyntaxKind::NODE_STRING => lower_string(node),
        SyntaxKind::NODE_PATH => Ok(Expr::Path(NixPath { trivia: node_trivia(node), raw: node.text().to_string() })),
        SyntaxKind::NODE_IDENT => Ok(Expr::Identifier(lower_ident(node, scope))),
        SyntaxKind::NODE_LIST => lower_list(node, scope, arena),
        SyntaxKind::NODE_ATTR_SET => lower_attrset(node, scope, arena).map(Expr::AttributeSet),
        SyntaxKind::NODE_LET_IN => lower_let(node, scope, arena),
        SyntaxKind::NODE_WITH => lower_with(node, scope, arena),
        SyntaxKind::NODE_IF_ELSE => lower_if(node, scope, arena),
        SyntaxKind::NODE_SELECT => lower_select(node, scope, arena),
        SyntaxKind::NODE_LAMBDA => lower_lambda(node, scope, arena),
        SyntaxKind::NODE_APPLY => lower_apply(node, scope, arena),
        SyntaxKind::NODE_BIN_OP => lower_binop(node, scope, arena),
        SyntaxKind::NODE_UNARY_OP => lower_unop(node, scope, arena),
        SyntaxKind::NODE_ASSERT => lower_assert(node, scope, arena),
        SyntaxKind::NODE_PAREN => lower_paren(node, scope, arena),
        other => Err(Error::Parse { message: format!("unsupported construct: {other:?}"), position: None }),
    }
}

fn first_child(node: &SyntaxNode) -> Option<SyntaxNode> {
    node.children().next()
}

fn lower_literal(node: &SyntaxNode) -> Result<Expr> {
    let token = node
        .first_token()
        .ok_or_else(|| Error::Parse { message: "empty literal".into(), position: None })?;
    let value = match token.kind() {
        SyntaxKind::TOKEN_INTEGER => Primitive::Int(
            token.text().parse().map_err(|e| Error::Parse { message: format!("invalid integer: {e}"), position: None })?,
        ),
        SyntaxKind::TOKEN_FLOAT => Primitive::Float(
            token.text().parse().map_err(|e| Error::Parse { message: format!("invalid float: {e}"), position: None })?,
        ),
        _ if token.text() == "true" => Primitive::Bool(true),
        _ if token.text() == "false" => Primitive::Bool(false),
        _ if token.text() == "null" => Primitive::Null,
        other => return Err(Error::Parse { message: format!("unrecognized literal token: {other:?}"), position: None }),
    };
    Ok(Expr::Primitive(PrimitiveNode { trivia: node_trivia(node), value }))
}

/// `"..."` and `''...''` string literals. The indented (`''`) form is kept
/// verbatim in `raw_indented` so its own internal indentation survives
/// round-tripping untouched (§3.2).
fn lower_string(node: &SyntaxNode) -> Result<Expr> {
    let full = node.text().to_string();
    let is_indented = full.starts_with("''");
    let mut content = String::new();
    for child in node.children_with_tokens() {
        if let NodeOrToken::Token(t) = &child {
            if t.kind() == SyntaxKind::TOKEN_STRING_CONTENT {
                content.push_str(t.text());
            }
        }
        // String interpolation (`${...}`) parts are dropped from the
        // editable `value` and the raw form is kept for indented strings;
        // plain double-quoted strings containing interpolation are
        // rejected below rather than silently losing the interpolated
        // expression.
    }
    if is_indented {
        return Ok(Expr::Primitive(PrimitiveNode {
            trivia: node_trivia(node),
            value: Primitive::Str { value: content, raw_indented: Some(full) },
        }));
    }
    if node.children().any(|c| c.kind() == SyntaxKind::NODE_INTERPOL) {
        return Err(Error::Parse {
            message: "string interpolation is not editable as a plain scalar".into(),
            position: None,
        });
    }
    Ok(Expr::Primitive(PrimitiveNode {
        trivia: node_trivia(node),
        value: Primitive::Str { value: unescape_string(&content), raw_indented: None },
    }))
}

/// Undo the source-level escapes a `"..."` string's `TOKEN_STRING_CONTENT`
/// carries, producing the logical value `rebuild::escape_string` expects as
/// its input (§3.2 P1: round-trip fidelity would otherwise double-escape).
fn unescape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('$') => out.push('$'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn lower_ident(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>) -> Identifier {
    let ident = Identifier::new(node.text().to_string());
    if let Some(frame) = scope {
        attach_scope(&ident, frame);
    }
    ident
}

fn lower_list(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let anchored = partition_children(node, |el| matches!(el, NodeOrToken::Node(_)))?;
    let mut elements = Vec::with_capacity(anchored.len());
    for a in anchored {
        let NodeOrToken::Node(n) = a.element else { continue };
        let mut expr = lower(&n, scope, arena)?;
        *expr_trivia_mut(&mut expr) = a.trivia;
        elements.push(expr);
    }
    Ok(Expr::List(NixList { trivia: node_trivia(node), elements, multiline: Multiline::Auto }))
}

fn expr_trivia_mut(expr: &mut Expr) -> &mut TriviaSet {
    match expr {
        Expr::Primitive(n) => &mut n.trivia,
        Expr::Identifier(n) => &mut n.trivia,
        Expr::Path(n) => &mut n.trivia,
        Expr::List(n) => &mut n.trivia,
        Expr::AttributeSet(n) => &mut n.trivia,
        Expr::Let(n) => &mut n.trivia,
        Expr::With(n) => &mut n.trivia,
        Expr::If(n) => &mut n.trivia,
        Expr::Select(n) => &mut n.trivia,
        Expr::Function(n) => &mut n.trivia,
        Expr::Call(n) => &mut n.trivia,
        Expr::Binary(n) => &mut n.trivia,
        Expr::Unary(n) => &mut n.trivia,
        Expr::Assert(n) => &mut n.trivia,
        Expr::Paren(n) => &mut n.trivia,
    }
}

fn lower_attrpath(node: &SyntaxNode, arena: &ScopeArena) -> Result<Vec<AttrSegment>> {
    let mut segments = Vec::new();
    for child in node.children_with_tokens() {
        match child {
            NodeOrToken::Token(t) if t.kind() == SyntaxKind::TOKEN_IDENT => {
                segments.push(AttrSegment::Bare(t.text().to_string()));
            }
            NodeOrToken::Node(n) if n.kind() == SyntaxKind::NODE_IDENT => {
                segments.push(AttrSegment::Bare(n.text().to_string()));
            }
            NodeOrToken::Node(n) if n.kind() == SyntaxKind::NODE_STRING => {
                if let Expr::Primitive(PrimitiveNode { value: Primitive::Str { value, .. }, .. }) = lower_string(&n)? {
                    segments.push(AttrSegment::Quoted(value));
                }
            }
            NodeOrToken::Node(n) if n.kind() == SyntaxKind::NODE_DYNAMIC => {
                let inner = first_child(&n).ok_or_else(|| Error::Parse {
                    message: "empty dynamic attribute".into(),
                    position: None,
                })?;
                segments.push(AttrSegment::Dynamic(Box::new(lower(&inner, None, arena)?)));
            }
            NodeOrToken::Token(t) if t.kind() == SyntaxKind::TOKEN_COMMENT => {
                tracing::warn!(comment = %t.text(), "dropping comment between attrpath segments");
            }
            _ => {}
        }
    }
    if segments.is_empty() {
        return Err(Error::Parse { message: "empty attrpath".into(), position: None });
    }
    Ok(segments)
}

fn lower_binding_value(value_node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<(Expr, bool)> {
    let expr = lower(value_node, scope, arena)?;
    let semicolon_on_new_line = expr.trivia().has_trailing_inline_comment();
    Ok((expr, semicolon_on_new_line))
}

fn lower_attrset(node: &SyntaxNode, parent_scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<AttributeSet> {
    let recursive = node.children_with_tokens().any(|t| is_token_kind(&t, SyntaxKind::TOKEN_REC));

    // Attribute sets introduce a scope for their own bindings when `rec`
    // (§4.4); a plain `{ ... }` attrset does not see its own keys.
    let self_scope = if recursive {
        let frame = ScopeFrame::new_bindings(ScopeKind::RecAttrSet, Default::default(), parent_scope.cloned());
        arena.retain(&frame);
        Some(frame)
    } else {
        None
    };
    let binding_scope = self_scope.as_ref().or(parent_scope);

    let anchored = partition_children(node, |el| {
        matches!(el, NodeOrToken::Node(n) if matches!(n.kind(), SyntaxKind::NODE_ATTRPATH_VALUE | SyntaxKind::NODE_INHERIT))
    })?;

    let mut values = Vec::with_capacity(anchored.len());
    for a in anchored {
        let NodeOrToken::Node(n) = a.element else { continue };
        match n.kind() {
            SyntaxKind::NODE_ATTRPATH_VALUE => {
                let attrpath = n
                    .children()
                    .find(|c| c.kind() == SyntaxKind::NODE_ATTRPATH)
                    .ok_or_else(|| Error::Parse { message: "binding with no attrpath".into(), position: None })?;
                let path = lower_attrpath(&attrpath, arena)?;
                let value_node = n
                    .children()
                    .find(|c| c.kind() != SyntaxKind::NODE_ATTRPATH)
                    .ok_or_else(|| Error::Parse { message: "binding with no value".into(), position: None })?;
                let (value, semicolon_on_new_line) = lower_binding_value(&value_node, binding_scope, arena)?;
                let nested = path.len() > 1;
                let cell = Rc::new(RefCell::new(value));
                if let Some(frame) = &self_scope {
                    if let [AttrSegment::Bare(name)] = path.as_slice() {
                        frame.define(name.clone(), Rc::clone(&cell));
                    }
                }
                values.push(Value::Binding(Binding {
                    trivia: a.trivia,
                    path,
                    value: cell,
                    nested,
                    semicolon_on_new_line,
                }));
            }
            SyntaxKind::NODE_INHERIT => {
                let from_expression = n
                    .children()
                    .find(|c| c.kind() == SyntaxKind::NODE_INHERIT_FROM)
                    .and_then(|f| first_child(&f))
                    .map(|e| lower(&e, binding_scope, arena))
                    .transpose()?
                    .map(Box::new);
                let names = n
                    .children()
                    .filter(|c| c.kind() == SyntaxKind::NODE_IDENT)
                    .map(|id| lower_ident(&id, binding_scope))
                    .collect();
                values.push(Value::Inherit(Inherit { trivia: a.trivia, names, from_expression }));
            }
            _ => {}
        }
    }

    // Preserve the source's own inline/multiline choice (§4.2 "layout
    // inline if original was inline", P3 mutation locality): a container
    // that parsed on one line stays `Off` so later edits don't flip it to
    // multiline under the `Auto` length heuristic. One that already spans
    // multiple lines keeps `Auto` so edits can still grow or shrink it.
    let multiline = if node.text().to_string().contains('\n') { Multiline::Auto } else { Multiline::Off };

    Ok(AttributeSet {
        trivia: node_trivia(node),
        values,
        recursive,
        multiline,
        scope_stack: Vec::new(),
        attrpath_order: None,
    })
}

fn lower_let(node: &SyntaxNode, parent_scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let frame = ScopeFrame::new_bindings(ScopeKind::Let, Default::default(), parent_scope.cloned());
    arena.retain(&frame);

    let anchored = partition_children(node, |el| matches!(el, NodeOrToken::Node(n) if n.kind() == SyntaxKind::NODE_ATTRPATH_VALUE))?;
    let mut local_variables = Vec::with_capacity(anchored.len());
    for a in anchored {
        let NodeOrToken::Node(n) = a.element else { continue };
        let attrpath = n
            .children()
            .find(|c| c.kind() == SyntaxKind::NODE_ATTRPATH)
            .ok_or_else(|| Error::Parse { message: "let binding with no attrpath".into(), position: None })?;
        let path = lower_attrpath(&attrpath, arena)?;
        let value_node = n
            .children()
            .find(|c| c.kind() != SyntaxKind::NODE_ATTRPATH)
            .ok_or_else(|| Error::Parse { message: "let binding with no value".into(), position: None })?;
        let (value, semicolon_on_new_line) = lower_binding_value(&value_node, Some(&frame), arena)?;
        let cell = Rc::new(RefCell::new(value));
        if let [AttrSegment::Bare(name)] = path.as_slice() {
            frame.define(name.clone(), Rc::clone(&cell));
        }
        let nested = path.len() > 1;
        local_variables.push(Binding { trivia: a.trivia, path, value: cell, nested, semicolon_on_new_line });
    }

    let body_node = node
        .children()
        .find(|c| c.kind() != SyntaxKind::NODE_ATTRPATH_VALUE)
        .ok_or_else(|| Error::Parse { message: "let with no body".into(), position: None })?;
    let body = lower(&body_node, Some(&frame), arena)?;

    // `let ... in { ... }` (directly, or via a chain of further `let`s that
    // already collapsed into nested `scope_stack` layers) is represented
    // as the attrset itself plus an outer scope layer, per §4.3 — not as a
    // separate `Expr::Let` wrapper — so the rebuilder's single
    // `scope_stack` fold (§4.2) can render the whole chain. A `let` whose
    // body is anything else keeps the generic `Expr::Let` form.
    match body {
        Expr::AttributeSet(mut set) => {
            set.scope_stack.insert(0, local_variables);
            Ok(Expr::AttributeSet(set))
        }
        other => Ok(Expr::Let(LetExpression { trivia: node_trivia(node), local_variables, value: Box::new(other) })),
    }
}

fn lower_with(node: &SyntaxNode, parent_scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let mut children = node.children();
    let environment_node = children
        .next()
        .ok_or_else(|| Error::Parse { message: "with with no environment".into(), position: None })?;
    let body_node = children
        .next()
        .ok_or_else(|| Error::Parse { message: "with with no body".into(), position: None })?;

    let environment = Box::new(lower(&environment_node, parent_scope, arena)?);
    let env_cell = match environment.as_ref() {
        Expr::AttributeSet(_) => Some(Rc::new(RefCell::new((*environment).clone()))),
        _ => None,
    };
    let frame = ScopeFrame::new_with(env_cell, parent_scope.cloned());
    arena.retain(&frame);
    let body = Box::new(lower(&body_node, Some(&frame), arena)?);

    Ok(Expr::With(WithStatement { trivia: node_trivia(node), environment, body }))
}

fn lower_if(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let mut children = node.children();
    let condition = Box::new(lower(&children.next().ok_or_else(missing("if condition"))?, scope, arena)?);
    let consequence = Box::new(lower(&children.next().ok_or_else(missing("if consequence"))?, scope, arena)?);
    let alternative = Box::new(lower(&children.next().ok_or_else(missing("if alternative"))?, scope, arena)?);
    Ok(Expr::If(IfExpression { trivia: node_trivia(node), condition, consequence, alternative }))
}

fn lower_select(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let mut node_children = node.children();
    let expression = Box::new(lower(&node_children.next().ok_or_else(missing("select expression"))?, scope, arena)?);
    let attrpath = node_children
        .next()
        .filter(|c| c.kind() == SyntaxKind::NODE_ATTRPATH)
        .ok_or_else(missing("select attrpath"))?;
    let attribute = lower_attrpath(&attrpath, arena)?;
    // A third child node only appears for `expr.attr or default`.
    let default = node_children.next().map(|n| lower(&n, scope, arena)).transpose()?.map(Box::new);
    Ok(Expr::Select(Select { trivia: node_trivia(node), expression, attribute, default }))
}

fn missing(what: &'static str) -> impl Fn() -> Error {
    move || Error::Parse { message: format!("missing {what}"), position: None }
}

fn lower_lambda(node: &SyntaxNode, parent_scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let mut children = node.children();
    let param_node = children.next().ok_or_else(missing("lambda parameter"))?;
    let body_node = children.next().ok_or_else(missing("lambda body"))?;

    let frame = ScopeFrame::new_bindings(ScopeKind::FunctionArgument, Default::default(), parent_scope.cloned());
    arena.retain(&frame);

    let argument = match param_node.kind() {
        SyntaxKind::NODE_IDENT => {
            let ident = lower_ident(&param_node, Some(&frame));
            frame.define(ident.name.clone(), Rc::new(RefCell::new(Expr::Identifier(ident.clone()))));
            Argument::Identifier(ident)
        }
        SyntaxKind::NODE_PATTERN => lower_pattern(&param_node, &frame, arena)?,
        other => return Err(Error::Parse { message: format!("unsupported lambda parameter: {other:?}"), position: None }),
    };

    let output = Box::new(lower(&body_node, Some(&frame), arena)?);
    Ok(Expr::Function(FunctionDefinition { trivia: node_trivia(node), argument, output }))
}

fn lower_pattern(node: &SyntaxNode, frame: &Rc<ScopeFrame>, arena: &ScopeArena) -> Result<Argument> {
    let mut fields = Vec::new();
    let mut bind = None;
    let ellipsis = node.children_with_tokens().any(|t| is_token_kind(&t, SyntaxKind::TOKEN_ELLIPSIS));

    for child in node.children() {
        match child.kind() {
            SyntaxKind::NODE_PAT_ENTRY => {
                let name_ident = child
                    .children_with_tokens()
                    .find_map(|t| match t {
                        NodeOrToken::Token(tok) if tok.kind() == SyntaxKind::TOKEN_IDENT => Some(tok.text().to_string()),
                        _ => None,
                    })
                    .ok_or_else(missing("pattern entry name"))?;
                let default = child.children().next().map(|d| lower(&d, Some(frame), arena)).transpose()?;
                frame.define(name_ident.clone(), Rc::new(RefCell::new(Expr::Identifier(Identifier::new(name_ident.clone())))));
                fields.push(PatternField { name: name_ident, default });
            }
            SyntaxKind::NODE_PAT_BIND => {
                if let Some(ident_node) = child.children().find(|c| c.kind() == SyntaxKind::NODE_IDENT) {
                    let ident = lower_ident(&ident_node, Some(frame));
                    frame.define(ident.name.clone(), Rc::new(RefCell::new(Expr::Identifier(ident.clone()))));
                    bind = Some(ident);
                }
            }
            _ => {}
        }
    }

    Ok(Argument::Pattern { fields, bind, ellipsis })
}

fn lower_apply(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let mut children = node.children();
    let name_node = children.next().ok_or_else(missing("apply function"))?;
    let argument_node = children.next().ok_or_else(missing("apply argument"))?;
    let name = Box::new(lower(&name_node, scope, arena)?);
    let argument = Box::new(lower(&argument_node, scope, arena)?);
    let recursive = matches!(argument.as_ref(), Expr::AttributeSet(_));
    Ok(Expr::Call(FunctionCall { trivia: node_trivia(node), name, argument, recursive }))
}

fn lower_binop(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let mut children = node.children();
    let left = Box::new(lower(&children.next().ok_or_else(missing("binary left operand"))?, scope, arena)?);
    let right = Box::new(lower(&children.next().ok_or_else(missing("binary right operand"))?, scope, arena)?);
    let operator = node
        .children_with_tokens()
        .find_map(|t| match t {
            NodeOrToken::Token(tok) if binop_symbol(tok.kind()).is_some() => binop_symbol(tok.kind()),
            _ => None,
        })
        .ok_or_else(missing("binary operator"))?
        .to_string();
    Ok(Expr::Binary(BinaryExpression { trivia: node_trivia(node), left, operator, right }))
}

fn binop_symbol(kind: SyntaxKind) -> Option<&'static str> {
    Some(match kind {
        SyntaxKind::TOKEN_ADD => "+",
        SyntaxKind::TOKEN_SUB => "-",
        SyntaxKind::TOKEN_MUL => "*",
        SyntaxKind::TOKEN_DIV => "/",
        SyntaxKind::TOKEN_EQUAL => "==",
        SyntaxKind::TOKEN_NOT_EQUAL => "!=",
        SyntaxKind::TOKEN_LESS => "<",
        SyntaxKind::TOKEN_LESS_OR_EQ => "<=",
        SyntaxKind::TOKEN_MORE => ">",
        SyntaxKind::TOKEN_MORE_OR_EQ => ">=",
        SyntaxKind::TOKEN_AND_AND => "&&",
        SyntaxKind::TOKEN_OR_OR => "||",
        SyntaxKind::TOKEN_IMPLICATION => "->",
        SyntaxKind::TOKEN_CONCAT => "++",
        SyntaxKind::TOKEN_UPDATE => "//",
        _ => return None,
    })
}

fn lower_unop(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let expression = Box::new(lower(&node.children().next().ok_or_else(missing("unary operand"))?, scope, arena)?);
    let operator = node
        .children_with_tokens()
        .find_map(|t| match t {
            NodeOrToken::Token(tok) if tok.kind() == SyntaxKind::TOKEN_INVERT => Some("!"),
            NodeOrToken::Token(tok) if tok.kind() == SyntaxKind::TOKEN_SUB => Some("-"),
            _ => None,
        })
        .ok_or_else(missing("unary operator"))?
        .to_string();
    Ok(Expr::Unary(UnaryExpression { trivia: node_trivia(node), operator, expression }))
}

fn lower_assert(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let mut children = node.children();
    let condition = Box::new(lower(&children.next().ok_or_else(missing("assert condition"))?, scope, arena)?);
    let body = Box::new(lower(&children.next().ok_or_else(missing("assert body"))?, scope, arena)?);
    Ok(Expr::Assert(Assertion { trivia: node_trivia(node), condition, body }))
}

fn lower_paren(node: &SyntaxNode, scope: Option<&Rc<ScopeFrame>>, arena: &ScopeArena) -> Result<Expr> {
    let inner = Box::new(lower(&node.children().next().ok_or_else(missing("parenthesized expression"))?, scope, arena)?);
    Ok(Expr::Paren(Parenthesized { trivia: node_trivia(node), inner }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_attrset() {
        let file = parse("{ x = 1; y = 2; }").unwrap();
        match file.get("x").unwrap() {
            Expr::Primitive(PrimitiveNode { value: Primitive::Int(1), .. }) => {}
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("{ x = ").is_err());
    }

    #[test]
    fn round_trips_comments_and_blank_lines() {
        let src = "{\n  # leading comment\n  x = 1; # inline\n\n  y = 2;\n}\n";
        let file = parse(src).unwrap();
        assert_eq!(file.rebuild(), src);
    }

    #[test]
    fn resolves_let_bound_identifier() {
        // `let ... in { ... }` folds into the attrset's own `scope_stack`
        // (see `lower_let`), not a standalone `Expr::Let` node.
        let file = parse("let a = 1; in { x = a; }").unwrap();
        let Expr::AttributeSet(set) = file.expr() else {
            panic!("expected an attribute set, got {:?}", file.expr());
        };
        assert_eq!(set.scope_stack.len(), 1);
        let Value::Binding(b) = &set.values[0] else { panic!("expected a binding") };
        let Expr::Identifier(id) = &*b.value.borrow() else { panic!("expected an identifier") };
        let resolved = id.resolve().unwrap();
        assert!(matches!(&*resolved.borrow(), Expr::Primitive(_)));
    }

    #[test]
    fn falls_back_to_let_expr_for_non_attrset_body() {
        let file = parse("let x = 1; in x + 1").unwrap();
        assert!(matches!(file.expr(), Expr::Let(_)));
    }

    #[test]
    fn round_trips_a_string_with_escapes_without_double_escaping() {
        let src = r#"{ x = "a\"b\\c\n"; }"#;
        let file = parse(src).unwrap();
        assert_eq!(file.rebuild(), src);
    }

    #[test]
    fn resolves_identifier_after_the_source_file_outlives_the_lower_call() {
        // Nothing keeps `file` from being the sole owner of the scope
        // frames used below; if a frame were dropped when `parse` returned,
        // this resolve would fail with `UnboundIdentifier`.
        let file = parse("rec { a = 1; b = a; }").unwrap();
        let Value::Binding(b) = &file.top_level().unwrap().values[1] else { panic!("expected a binding") };
        let Expr::Identifier(id) = &*b.value.borrow() else { panic!("expected an identifier") };
        let resolved = id.resolve().unwrap();
        assert!(matches!(&*resolved.borrow(), Expr::Primitive(PrimitiveNode { value: Primitive::Int(1), .. })));
    }
}

//! The trivia extractor (§4.1): partitions the non-token bytes of a
//! concrete syntax tree into the [`Trivia`] units each semantic node owns.
//!
//! Ordinary single line breaks between siblings are *not* materialized as
//! trivia — the rebuilder already re-inserts them as part of a container's
//! multiline layout (§4.2), so storing them would just be redundant state
//! to keep in sync. Only genuine blank-line gaps (`BlankLine`, two or more
//! consecutive breaks) and comments carry information the rebuilder can't
//! reconstruct on its own, so those are the only units this extractor ever
//! produces. `Trivia::LineBreak` remains part of the public enum for
//! callers building documents by hand (e.g. a deliberate blank line at the
//! very end of a file), per §3.1.

use rnix::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken};
use rowan::NodeOrToken;

use crate::error::{Error, Result};
use crate::trivia::{Trivia, TriviaSet};

fn is_whitespace(kind: SyntaxKind) -> bool {
    kind == SyntaxKind::TOKEN_WHITESPACE
}

fn is_comment(kind: SyntaxKind) -> bool {
    kind == SyntaxKind::TOKEN_COMMENT
}

fn classify_whitespace(text: &str) -> Option<Trivia> {
    match text.matches('\n').count() {
        0 | 1 => None,
        _ => Some(Trivia::BlankLine),
    }
}

fn classify_comment(text: &str, inline: bool) -> Trivia {
    if let Some(body) = text.strip_prefix("/*").and_then(|s| s.strip_suffix("*/")) {
        Trivia::MultilineComment { text: body.to_string() }
    } else {
        let body = text.strip_prefix('#').unwrap_or(text);
        Trivia::Comment { text: body.to_string(), inline }
    }
}

/// One semantic child of a container, with the trivia immediately
/// surrounding it attached.
pub struct Anchored {
    pub trivia: TriviaSet,
    pub element: SyntaxElement,
}

/// Walk `node`'s direct children (tokens and nodes), grouping every
/// non-punctuation element selected by `is_anchor` with the trivia that
/// precedes it (`before`) and the trivia trailing it on the same line
/// (`after`).
///
/// `is_anchor` decides which children are "semantic" (the ones the caller
/// will recurse into / lower to an `Expr`); everything else that isn't
/// whitespace or a comment (braces, `;`, `=`, keywords) is discarded, since
/// the rebuilder regenerates punctuation itself (§4.2's mandatory spacing
/// rules).
pub fn partition_children(node: &SyntaxNode, is_anchor: impl Fn(&SyntaxElement) -> bool) -> Result<Vec<Anchored>> {
    let mut result = Vec::new();
    let mut pending_before: Vec<Trivia> = Vec::new();
    let mut current: Option<Anchored> = None;
    let mut same_line = false;

    for el in node.children_with_tokens() {
        let kind = el.kind();
        if is_whitespace(kind) {
            let text = token_text(&el)?;
            if let Some(trivia) = classify_whitespace(&text) {
                same_line = false;
                attach(&mut current, &mut pending_before, trivia, same_line);
            } else if text.contains('\n') {
                same_line = false;
            }
            continue;
        }
        if is_comment(kind) {
            let text = token_text(&el)?;
            let trivia = classify_comment(&text, same_line);
            let inline_after_current = same_line && current.is_some();
            attach(&mut current, &mut pending_before, trivia, inline_after_current);
            same_line = true;
            continue;
        }
        if is_anchor(&el) {
            if let Some(done) = current.take() {
                result.push(done);
            }
            current = Some(Anchored {
                trivia: TriviaSet { before: std::mem::take(&mut pending_before), after: Vec::new() },
                element: el,
            });
            same_line = true;
        }
        // Non-anchor, non-trivia tokens (punctuation, keywords) are
        // discarded; they don't reset `same_line`.
    }
    if let Some(done) = current.take() {
        result.push(done);
    }
    Ok(result)
}

fn attach(current: &mut Option<Anchored>, pending_before: &mut Vec<Trivia>, trivia: Trivia, after_current: bool) {
    if after_current {
        if let Some(c) = current {
            c.trivia.after.push(trivia);
            return;
        }
    }
    pending_before.push(trivia);
}

fn token_text(el: &SyntaxElement) -> Result<String> {
    match el {
        NodeOrToken::Token(t) => Ok(t.text().to_string()),
        NodeOrToken::Node(_) => Err(Error::TriviaUnowned { context: "expected a token, found a node".into() }),
    }
}

/// Leading trivia for the whole file: comments/blank lines before the first
/// semantic token of the root node.
pub fn file_leading_trivia(root: &SyntaxNode) -> Result<TriviaSet> {
    let mut before = Vec::new();
    let mut same_line = false;
    for el in root.children_with_tokens() {
        let kind = el.kind();
        if is_whitespace(kind) {
            let text = token_text(&el)?;
            if let Some(t) = classify_whitespace(&text) {
                before.push(t);
            }
            same_line = false;
            continue;
        }
        if is_comment(kind) {
            let text = token_text(&el)?;
            before.push(classify_comment(&text, same_line));
            same_line = true;
            continue;
        }
        break;
    }
    Ok(TriviaSet { before, after: Vec::new() })
}

/// Trailing trivia for the whole file: anything after the last semantic
/// token, typically just the final newline.
pub fn file_trailing_trivia(root: &SyntaxNode, source: &str) -> TriviaSet {
    let end = root.text_range().end();
    let tail = &source[usize::from(end)..];
    let after = if !tail.is_empty() { vec![Trivia::LineBreak] } else { Vec::new() };
    TriviaSet { before: Vec::new(), after }
}

/// Helper for callers that only want the element, discarding trivia it
/// wasn't possible to attach more specifically than "before this node".
pub fn only_nodes(anchored: Vec<Anchored>) -> Vec<(TriviaSet, SyntaxNode)> {
    anchored
        .into_iter()
        .filter_map(|a| match a.element {
            NodeOrToken::Node(n) => Some((a.trivia, n)),
            NodeOrToken::Token(_) => None,
        })
        .collect()
}

pub fn only_tokens(anchored: Vec<Anchored>) -> Vec<(TriviaSet, SyntaxToken)> {
    anchored
        .into_iter()
        .filter_map(|a| match a.element {
            NodeOrToken::Token(t) => Some((a.trivia, t)),
            NodeOrToken::Node(_) => None,
        })
        .collect()
}

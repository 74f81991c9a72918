//! Trivia: the non-semantic source bytes (whitespace, line breaks, comments)
//! that the rebuilder must still reproduce.
//!
//! See §3.1 and §4.1 of the design: every trivia unit belongs to exactly one
//! owner's `before` or `after` sequence, never both.

/// A single unit of non-semantic source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trivia {
    /// A `#`-style or `/* */`-style comment sharing a line with a preceding
    /// token.
    Comment {
        /// Comment text, without the leading `#` or surrounding `/* */`.
        text: String,
        /// `true` for a same-line (`# ...`) comment, `false` for one that
        /// starts its own line.
        inline: bool,
    },
    /// A `/* ... */` block comment, preserved verbatim including embedded
    /// newlines.
    MultilineComment {
        /// Full comment text, without the delimiters.
        text: String,
    },
    /// A single newline with no other content on its line. The extractor
    /// never produces this — an ordinary separator between sibling
    /// container entries is implicit in the rebuilder's own line join and
    /// isn't stored — so this only appears in hand-built trees. Within a
    /// container it renders the same as [`Trivia::BlankLine`] (an entry
    /// always gets one implicit separator from the join regardless).
    LineBreak,
    /// A run of two or more consecutive line breaks, collapsed to one unit.
    BlankLine,
}

impl Trivia {
    /// Render this trivia unit back to source bytes. An inline comment
    /// always trails on its owner's line, so it carries its own separating
    /// space (the literal space that preceded it in the source is alignment
    /// trivia and isn't stored — see `extract`).
    pub fn render(&self) -> String {
        match self {
            Trivia::Comment { text, inline: true } => format!(" #{text}"),
            Trivia::Comment { text, inline: false } => format!("#{text}"),
            Trivia::MultilineComment { text } => format!("/*{text}*/"),
            Trivia::LineBreak => "\n".to_string(),
            Trivia::BlankLine => "\n\n".to_string(),
        }
    }

    /// Whether this comment introduces a block/standalone comment rather
    /// than trailing an existing line.
    pub fn is_block_comment(&self) -> bool {
        matches!(self, Trivia::Comment { inline: false, .. } | Trivia::MultilineComment { .. })
    }
}

/// The `before`/`after` trivia sequences every semantic node owns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriviaSet {
    /// Trivia immediately preceding this node: comments and blank lines
    /// above it, in source order.
    pub before: Vec<Trivia>,
    /// Trivia on or immediately after this node's last token, up to (but
    /// not including) the next owned trivia unit.
    pub after: Vec<Trivia>,
}

impl TriviaSet {
    /// An empty trivia set, for nodes built programmatically.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Does `before` contain a same-line trailing comment on the preceding
    /// construct? Used by binding rendering to decide inline-vs-fresh-line
    /// comment placement is irrelevant here; see [`Self::has_trailing_inline_comment`].
    pub fn has_trailing_inline_comment(&self) -> bool {
        self.after
            .iter()
            .any(|t| matches!(t, Trivia::Comment { inline: true, .. }))
    }

    /// Does this set carry any block (non-inline) comment? Used by the
    /// multiline-selection heuristics in §4.2.
    pub fn has_block_comment(&self) -> bool {
        self.before.iter().any(Trivia::is_block_comment) || self.after.iter().any(Trivia::is_block_comment)
    }

    /// Render `before`, verbatim, in source order. A block comment's own
    /// `render()` doesn't include the line break that separated it from
    /// its owner in the source (that single newline is never stored, see
    /// `extract`), so this makes sure the result always ends in exactly
    /// one newline when non-empty — the caller supplies indentation for
    /// the line that follows.
    pub fn render_before(&self) -> String {
        let mut rendered: String = self.before.iter().map(Trivia::render).collect();
        if !rendered.is_empty() && !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        rendered
    }

    /// Render `after`, verbatim, in source order.
    pub fn render_after(&self) -> String {
        self.after.iter().map(Trivia::render).collect()
    }
}

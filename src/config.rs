//! Rebuild and layout configuration.
//!
//! Carried on a [`crate::source::SourceFile`] so repeated `rebuild()` calls
//! stay consistent without re-threading a config argument through every
//! call site.

/// Tunables for the rebuilder's `multiline = auto` heuristics (§4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManipulatorConfig {
    /// A [`crate::expr::NixList`] with more elements than this renders
    /// multiline even with `multiline: Auto`.
    pub list_multiline_threshold: usize,
    /// Spaces per indent level when emitting multiline containers.
    pub indent_width: usize,
}

impl Default for ManipulatorConfig {
    fn default() -> Self {
        Self {
            list_multiline_threshold: 4,
            indent_width: 2,
        }
    }
}

impl ManipulatorConfig {
    /// Render `n` levels of indentation per [`Self::indent_width`].
    pub(crate) fn indent(&self, level: usize) -> String {
        " ".repeat(self.indent_width * level)
    }
}

//! Source document snapshots.

use std::sync::Arc;

/// Immutable snapshot of the author's text at one revision.
///
/// Revisions increase with every edit; a render pass is identified by the
/// revision of the text it renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
    text: Arc<str>,
    revision: u64,
}

impl SourceDocument {
    #[must_use]
    pub fn new(text: impl Into<Arc<str>>, revision: u64) -> Self {
        Self {
            text: text.into(),
            revision,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the text has no renderable content.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(SourceDocument::new("", 1).is_blank());
        assert!(SourceDocument::new(" \n\t", 1).is_blank());
        assert!(!SourceDocument::new("# a", 1).is_blank());
    }
}

//! Persisted draft slot.
//!
//! The author's raw text is stored under a fixed slot name and restored
//! verbatim at the next start. Latest text replaces prior text.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Logical slot name of the persisted draft.
pub const DRAFT_SLOT: &str = "markdown-content";

/// Document offered when no draft has been stored yet.
pub const SAMPLE_MARKDOWN: &str = r#"# Markdown to PDF Demo

This is a **modern**, *elegant* Markdown to PDF converter.

## Features

- ✅ Live preview with GitHub styling
- ✅ Mermaid diagram support
- ✅ Clean PDF export
- ✅ Customizable styling options

## Code Example

```javascript
function hello() {
    console.log("Hello, World!");
    return "Ready to convert!";
}
```

## Sample Diagram

```mermaid
graph TD
    A[Paste Markdown] --> B[Live Preview]
    B --> C[Adjust Styling]
    C --> D[Generate PDF]
    D --> E[Download Result]
```

## Table Example

| Feature | Status | Notes |
|---------|--------|-------|
| Markdown | ✅ | Full support |
| Mermaid | ✅ | SVG diagrams |
| PDF Export | ✅ | Clean output |

> **Tip**: Use the sidebar to adjust font size, line height, and margins for your PDF output.

---

*Ready to create your own PDF? Clear this text and paste your Markdown!*"#;

/// Draft persistence error.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("failed to read draft {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write draft {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// File-backed store for the draft slot.
#[derive(Clone, Debug)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    /// Create a store keeping the slot inside `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the slot file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{DRAFT_SLOT}.md"))
    }

    /// Load the stored draft.
    ///
    /// A missing or blank slot reads as `None`.
    pub fn load(&self) -> Result<Option<String>, DraftError> {
        let path = self.path();
        match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DraftError::Read { path, source }),
        }
    }

    /// Load the stored draft, or the sample document when none is stored.
    pub fn load_or_sample(&self) -> Result<String, DraftError> {
        Ok(self
            .load()?
            .unwrap_or_else(|| SAMPLE_MARKDOWN.to_owned()))
    }

    /// Replace the stored draft.
    ///
    /// The slot is written to a temporary file and renamed into place, so a
    /// crash never leaves a truncated draft.
    pub fn save(&self, text: &str) -> Result<(), DraftError> {
        let path = self.path();
        let write_err = |source| DraftError::Write {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        file.write_all(text.as_bytes()).map_err(write_err)?;
        file.persist(&path).map_err(|e| write_err(e.error))?;

        tracing::trace!(path = %path.display(), bytes = text.len(), "Saved draft");
        Ok(())
    }

    /// Directory holding the slot.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_missing_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(dir.path().join("state"));
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.load_or_sample().unwrap(), SAMPLE_MARKDOWN);
    }

    #[test]
    fn test_save_then_load_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(dir.path().join("state"));

        store.save("# First\n").unwrap();
        store.save("# Second\n\n  trailing  \n").unwrap();

        assert_eq!(
            store.load().unwrap().as_deref(),
            Some("# Second\n\n  trailing  \n")
        );
        assert!(store.path().ends_with("markdown-content.md"));
    }

    #[test]
    fn test_blank_slot_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(dir.path());
        store.save("   \n").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_sample_contains_diagram() {
        assert!(SAMPLE_MARKDOWN.contains("```mermaid\ngraph TD"));
    }
}

//! Process-wide diagram id sequence.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use folio_renderer::DiagramId;

/// Monotonic generator of diagram ids.
///
/// Clones share the same counter, so every render pass that draws from one
/// sequence gets ids that were never handed out before.
#[derive(Clone, Debug, Default)]
pub struct DiagramIdSequence {
    next: Arc<AtomicU64>,
}

impl DiagramIdSequence {
    /// Create a sequence starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> DiagramId {
        DiagramId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids allocated so far.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let seq = DiagramIdSequence::new();
        assert_eq!(seq.next_id(), DiagramId::new(0));
        assert_eq!(seq.next_id(), DiagramId::new(1));
        assert_eq!(seq.allocated(), 2);
    }

    #[test]
    fn test_clones_share_counter() {
        let seq = DiagramIdSequence::new();
        let other = seq.clone();
        let a = seq.next_id();
        let b = other.next_id();
        assert_ne!(a, b);
        assert_eq!(seq.allocated(), 2);
    }
}

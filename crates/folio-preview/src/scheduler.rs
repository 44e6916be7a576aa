//! Debounced render scheduling.
//!
//! Every edit is submitted as a new revision. A pass starts only after the
//! debounce window passes without a newer edit; edits inside the window
//! replace the pending pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use folio_diagrams::DiagramRenderer;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::draft::DraftStore;
use crate::pipeline::{RenderOutcome, RenderPipeline};
use crate::source::SourceDocument;

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 16;

/// Sent to subscribers after every pass that ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderEvent {
    pub revision: u64,
    pub outcome: RenderOutcome,
}

/// Coalesces edits into render passes.
pub struct RenderScheduler<R> {
    pipeline: Arc<RenderPipeline<R>>,
    latest: Arc<AtomicU64>,
    debounce: Duration,
    drafts: Option<DraftStore>,
    events: broadcast::Sender<RenderEvent>,
}

impl<R: DiagramRenderer + 'static> RenderScheduler<R> {
    #[must_use]
    pub fn new(pipeline: Arc<RenderPipeline<R>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pipeline,
            latest: Arc::new(AtomicU64::new(0)),
            debounce: DEFAULT_DEBOUNCE,
            drafts: None,
            events,
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Persist every submitted text to `drafts`.
    #[must_use]
    pub fn with_drafts(mut self, drafts: DraftStore) -> Self {
        self.drafts = Some(drafts);
        self
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<RenderPipeline<R>> {
        &self.pipeline
    }

    /// Revision of the most recent submission.
    #[must_use]
    pub fn latest_revision(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Receive an event after every pass that ran.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RenderEvent> {
        self.events.subscribe()
    }

    /// Submit a new edit.
    ///
    /// The draft is saved right away. The returned task resolves to `None`
    /// when a newer edit arrived within the debounce window and the pass was
    /// skipped.
    pub fn submit(&self, text: impl Into<Arc<str>>) -> JoinHandle<Option<RenderOutcome>> {
        let revision = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let source = SourceDocument::new(text, revision);

        if let Some(drafts) = &self.drafts
            && let Err(e) = drafts.save(source.text())
        {
            tracing::warn!(revision, error = %e, "Failed to persist draft");
        }

        let pipeline = Arc::clone(&self.pipeline);
        let latest = Arc::clone(&self.latest);
        let events = self.events.clone();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != revision {
                tracing::debug!(revision, "Edit coalesced into a newer revision");
                return None;
            }

            let outcome = pipeline.render(&source).await;
            // No subscribers is fine.
            let _ = events.send(RenderEvent {
                revision,
                outcome: outcome.clone(),
            });
            Some(outcome)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_diagrams::{DiagramResolver, MockRenderer};
    use pretty_assertions::assert_eq;

    use crate::surface::PreviewState;

    fn scheduler() -> RenderScheduler<MockRenderer> {
        let pipeline = RenderPipeline::new(DiagramResolver::new(MockRenderer::new()));
        RenderScheduler::new(Arc::new(pipeline))
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_within_window_coalesce() {
        let scheduler = scheduler();
        let mut events = scheduler.subscribe();

        let first = scheduler.submit("# One");
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = scheduler.submit("# Two");
        tokio::time::sleep(Duration::from_millis(50)).await;
        let third = scheduler.submit("# Three");

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(second.await.unwrap(), None);
        assert!(matches!(third.await.unwrap(), Some(RenderOutcome::Ready { .. })));

        let event = events.recv().await.unwrap();
        assert_eq!(event.revision, 3);
        assert!(events.try_recv().is_err());

        let PreviewState::Ready(doc) = scheduler.pipeline().snapshot() else {
            panic!("expected ready preview");
        };
        assert_eq!(doc.title.as_deref(), Some("Three"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_outside_window_each_render() {
        let scheduler = scheduler();

        let first = scheduler.submit("# One");
        tokio::time::sleep(Duration::from_millis(300)).await;
        let second = scheduler.submit("# Two");

        assert!(first.await.unwrap().is_some());
        assert!(second.await.unwrap().is_some());
        assert_eq!(scheduler.latest_revision(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_pass_is_superseded() {
        let scheduler = scheduler();

        let slow = scheduler.submit("```mermaid\n%% delay=1000\nA\n```\n");
        tokio::time::sleep(Duration::from_millis(400)).await;
        let fast = scheduler.submit("```mermaid\nB\n```\n");

        assert!(matches!(
            fast.await.unwrap(),
            Some(RenderOutcome::Ready { diagrams: 1, .. })
        ));
        assert_eq!(slow.await.unwrap(), Some(RenderOutcome::Superseded));

        let PreviewState::Ready(doc) = scheduler.pipeline().snapshot() else {
            panic!("expected ready preview");
        };
        assert_eq!(doc.diagrams()[0].source, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_persists_draft() {
        let dir = tempfile::tempdir().unwrap();
        let drafts = DraftStore::new(dir.path());
        let scheduler = scheduler().with_drafts(drafts.clone());

        let handle = scheduler.submit("# Saved");
        assert_eq!(drafts.load().unwrap().as_deref(), Some("# Saved"));
        handle.await.unwrap();
    }
}

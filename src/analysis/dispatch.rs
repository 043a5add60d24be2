//! Fire-and-forget analysis tasks and the progress indicators shown for them.
//!
//! Each submitted request runs on its own tokio task. Completion is reported
//! over a channel to the display loop, which owns [`InFlight`]; nothing here
//! touches the displayed rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::FileRecord;

use super::client::{AnalysisClient, AnalysisOutcome};

/// Identifies one analysis request and its progress indicator.
pub type RequestId = u64;

/// Sent when a request finishes, successfully or not.
#[derive(Debug, Clone)]
pub struct AnalysisEvent {
    pub id: RequestId,
    pub path: String,
    pub outcome: AnalysisOutcome,
}

/// Spawns analysis tasks. There is no cap on requests in flight.
#[derive(Debug)]
pub struct AnalysisDispatcher {
    client: Arc<AnalysisClient>,
    events: mpsc::UnboundedSender<AnalysisEvent>,
    next_id: RequestId,
}

impl AnalysisDispatcher {
    /// Create a dispatcher and the receiver its completion events arrive on.
    #[must_use]
    pub fn new(client: Arc<AnalysisClient>) -> (Self, mpsc::UnboundedReceiver<AnalysisEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                client,
                events,
                next_id: 0,
            },
            rx,
        )
    }

    /// Start analysing `record` in the background. Must be called from
    /// within a tokio runtime.
    pub fn submit(&mut self, record: FileRecord) -> RequestId {
        self.next_id += 1;
        let id = self.next_id;
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = client.analyze(&record).await;
            tracing::debug!(id, path = %record.full_path, failed = outcome.is_failure(), "analysis finished");
            // The receiver is gone only when the display loop has exited.
            let _ = events.send(AnalysisEvent {
                id,
                path: record.full_path,
                outcome,
            });
        });
        id
    }
}

/// Progress indicators currently visible, keyed by request.
#[derive(Debug, Default)]
pub struct InFlight {
    pending: BTreeMap<RequestId, String>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the indicator for `id`.
    pub fn show(&mut self, id: RequestId, path: impl Into<String>) {
        self.pending.insert(id, path.into());
    }

    /// Dismiss the indicator belonging to `event`, and only that one.
    /// Returns false if it was not showing.
    pub fn finish(&mut self, event: &AnalysisEvent) -> bool {
        self.pending.remove(&event.id).is_some()
    }

    #[must_use]
    pub fn is_showing(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Paths still being analysed, oldest request first.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.pending.values().map(String::as_str)
    }
}

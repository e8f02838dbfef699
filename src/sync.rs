// FeedbackListSync - the component tying loader, reconciler and presenters
// together. One bulk read populates the list, one task owns it and applies
// the change feed, and a watch cell publishes a fresh snapshot on every
// mutation for anyone presenting the data.

use crate::backend::{FeedbackBackend, StreamError};
use crate::db::FeedbackEntry;
use crate::loader::load_entries;
use crate::reconciler::{ChangeReconciler, EntryList};
use tokio::sync::watch;
use tokio::task::JoinHandle;

// ============================================================================
// LIST STATE
// ============================================================================

/// Observable state of the synced list. Exactly one of two shapes is ever
/// visible: pre-load (`loading`, empty) or fully populated - observers never
/// see a half-filled list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    /// True until the initial bulk read resolves.
    pub loading: bool,

    /// Loader failure, surfaced for display. The list stays empty; no partial
    /// or cached fallback is ever shown.
    pub error: Option<String>,

    /// Current snapshot, newest first once live inserts arrive.
    pub entries: Vec<FeedbackEntry>,

    /// Events the feed dropped because this subscriber lagged. Non-zero means
    /// the list may be stale (never corrupted) until fresh events land.
    pub missed_events: u64,
}

impl ListState {
    fn pre_load() -> Self {
        ListState {
            loading: true,
            ..Default::default()
        }
    }

    pub fn is_stale(&self) -> bool {
        self.missed_events > 0
    }
}

// ============================================================================
// FEEDBACK LIST SYNC
// ============================================================================

/// Live-synced view of the feedback table.
///
/// `start` subscribes to the change feed *before* the bulk read, so events
/// raced during the load window buffer in the feed and apply right after it
/// instead of being lost. The subscription is released exactly once on every
/// exit path: load failure, feed closure, or teardown.
pub struct FeedbackListSync {
    state_rx: watch::Receiver<ListState>,
    task: Option<JoinHandle<()>>,
}

impl FeedbackListSync {
    /// Spawn the sync task over `backend`. Returns immediately; observers see
    /// the `loading` state until the bulk read resolves inside the task.
    pub fn start<B>(backend: B) -> Self
    where
        B: FeedbackBackend + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(ListState::pre_load());
        let task = tokio::spawn(run_sync(backend, state_tx));

        FeedbackListSync {
            state_rx,
            task: Some(task),
        }
    }

    /// Current snapshot of the entry list, on demand.
    pub fn snapshot(&self) -> Vec<FeedbackEntry> {
        self.state_rx.borrow().entries.clone()
    }

    pub fn state(&self) -> ListState {
        self.state_rx.borrow().clone()
    }

    /// Observable cell: resolves on every mutation of the list.
    pub fn watch(&self) -> watch::Receiver<ListState> {
        self.state_rx.clone()
    }

    /// Wait until the initial load resolves, then report its outcome.
    pub async fn loaded(&self) -> Result<(), String> {
        let mut rx = self.state_rx.clone();

        loop {
            {
                let state = rx.borrow();
                if let Some(msg) = &state.error {
                    return Err(msg.clone());
                }
                if !state.loading {
                    return Ok(());
                }
            }
            if rx.changed().await.is_err() {
                return Err("sync task ended before load resolved".to_string());
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tear down: stop the sync task and release the subscription. After this
    /// resolves, no further event can be applied and the feed subscriber
    /// count no longer includes this component.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for FeedbackListSync {
    fn drop(&mut self) {
        // Best-effort teardown when shutdown() wasn't awaited
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// SYNC TASK
// ============================================================================

async fn run_sync<B: FeedbackBackend>(backend: B, state_tx: watch::Sender<ListState>) {
    // Subscribe first: anything that lands during the bulk read buffers in
    // the feed and gets applied right after the list is populated
    let mut subscription = backend.subscribe();

    let mut list = match load_entries(&backend) {
        Ok(entries) => EntryList::from_entries(entries),
        Err(e) => {
            state_tx.send_replace(ListState {
                loading: false,
                error: Some(e.message().to_string()),
                ..Default::default()
            });
            // Returning drops the subscription - released on the failure
            // path too, exactly once
            return;
        }
    };

    // The backend handle did its two jobs (subscribe, bulk read). Dropping it
    // here means this task keeps no publisher side of the feed alive, so feed
    // closure is observable below.
    drop(backend);

    state_tx.send_replace(ListState {
        loading: false,
        error: None,
        entries: list.to_vec(),
        missed_events: 0,
    });

    let reconciler = ChangeReconciler::new();
    let mut missed_events = 0u64;

    loop {
        match subscription.recv().await {
            Ok(event) => {
                let outcome = reconciler.apply(&mut list, &event);
                if outcome.mutated() {
                    state_tx.send_replace(ListState {
                        loading: false,
                        error: None,
                        entries: list.to_vec(),
                        missed_events,
                    });
                }
            }
            Err(StreamError::Lagged(n)) => {
                // Stale is acceptable, torn down is not: keep consuming and
                // let presenters show the staleness hint
                missed_events += n;
                state_tx.send_replace(ListState {
                    loading: false,
                    error: None,
                    entries: list.to_vec(),
                    missed_events,
                });
            }
            Err(StreamError::Closed) | Err(StreamError::Released) => {
                // Feed is gone. The loaded list stays intact and visible; it
                // just stops receiving live updates.
                break;
            }
        }
    }

    subscription.unsubscribe();
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use chrono::{TimeZone, Utc};

    fn create_test_entry(id: &str, company: &str, summary: &str) -> FeedbackEntry {
        FeedbackEntry {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            company_name: company.to_string(),
            years_experience: String::new(),
            interview_duration: String::new(),
            interview_stage: "Onsite".to_string(),
            communication_rating: Some(4),
            communication_reason: String::new(),
            interviewer_experience: String::new(),
            clarity_on_role: String::new(),
            clarity_explain: String::new(),
            frustration_point: String::new(),
            positive_aspect: String::new(),
            overall_rating: Some(4),
            one_line_summary: summary.to_string(),
            opt_in_contact: false,
            email: String::new(),
        }
    }

    async fn started(backend: &SqliteBackend) -> FeedbackListSync {
        let sync = FeedbackListSync::start(backend.clone());
        sync.loaded().await.expect("initial load should succeed");
        sync
    }

    /// Wait for the watch cell to reach a state matching `pred`, with a
    /// timeout so a missed notification fails the test instead of hanging it.
    async fn wait_for(
        rx: &mut watch::Receiver<ListState>,
        pred: impl Fn(&ListState) -> bool,
    ) -> ListState {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                {
                    let state = rx.borrow();
                    if pred(&state) {
                        return state.clone();
                    }
                }
                rx.changed().await.expect("sync task ended unexpectedly");
            }
        })
        .await
        .expect("timed out waiting for snapshot")
    }

    async fn wait_for_len(rx: &mut watch::Receiver<ListState>, len: usize) -> ListState {
        wait_for(rx, |state| state.entries.len() == len).await
    }

    #[tokio::test]
    async fn test_load_then_live_insert() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend
            .insert(create_test_entry("id-a", "Acme", "Loaded up front"))
            .unwrap();

        let mut sync = started(&backend).await;
        assert_eq!(sync.snapshot().len(), 1);

        let mut rx = sync.watch();
        backend
            .insert(create_test_entry("id-b", "Globex", "Arrived live"))
            .unwrap();

        let state = wait_for_len(&mut rx, 2).await;
        assert_eq!(state.entries[0].id, "id-b", "live insert lands newest-first");
        assert_eq!(state.entries[1].id, "id-a");

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_live_update_and_delete() {
        let backend = SqliteBackend::in_memory().unwrap();
        let a = backend
            .insert(create_test_entry("id-a", "Acme", "Original"))
            .unwrap();
        backend
            .insert(create_test_entry("id-b", "Globex", "Keeper"))
            .unwrap();

        let mut sync = started(&backend).await;
        let mut rx = sync.watch();

        let mut revised = a.clone();
        revised.one_line_summary = "Revised".to_string();
        backend.update(&revised).unwrap();

        let state = wait_for(&mut rx, |s| {
            s.entries.iter().any(|e| e.one_line_summary == "Revised")
        })
        .await;
        assert_eq!(state.entries.len(), 2, "update replaces in place");
        assert_eq!(state.entries[1].id, "id-a", "position unchanged");

        backend.delete("id-b").unwrap();
        let state = wait_for_len(&mut rx, 1).await;
        assert_eq!(state.entries[0].id, "id-a");

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_load_failure_surfaces_error() {
        use crate::backend::Subscription;

        struct FailingBackend;

        impl FeedbackBackend for FailingBackend {
            fn bulk_read(&self) -> anyhow::Result<Vec<FeedbackEntry>> {
                anyhow::bail!("table is unreachable")
            }

            fn subscribe(&self) -> Subscription {
                crate::backend::ChangeFeed::default().subscribe()
            }
        }

        let sync = FeedbackListSync::start(FailingBackend);
        let err = sync.loaded().await.unwrap_err();

        assert!(err.contains("table is unreachable"));
        let state = sync.state();
        assert!(!state.loading);
        assert!(state.entries.is_empty(), "no partial list on failure");
    }

    #[tokio::test]
    async fn test_shutdown_releases_subscription_exactly_once() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut sync = started(&backend).await;

        assert_eq!(backend.feed().subscriber_count(), 1);
        assert!(sync.is_running());

        sync.shutdown().await;

        assert_eq!(
            backend.feed().subscriber_count(),
            0,
            "teardown must release the subscription"
        );
        assert!(!sync.is_running());

        // Events after teardown reach nobody and change nothing
        backend
            .insert(create_test_entry("id-late", "Acme", "After teardown"))
            .unwrap();
        assert_eq!(sync.snapshot().len(), 0);

        // Second shutdown is a no-op
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_feed_closure_keeps_loaded_list() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend
            .insert(create_test_entry("id-a", "Acme", "Survivor"))
            .unwrap();

        let sync = started(&backend).await;
        assert_eq!(sync.snapshot().len(), 1);

        // Drop every publisher handle: the feed closes under the subscriber
        drop(backend);

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while sync.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("sync task should stop once the feed closes");

        // Stale but intact - stream failure never corrupts the list
        let state = sync.state();
        assert_eq!(state.entries.len(), 1);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_update_racing_ahead_of_insert_is_dropped() {
        let backend = SqliteBackend::in_memory().unwrap();
        let sync = started(&backend).await;
        let mut rx = sync.watch();

        // Push an update for an id the view has never seen, straight into
        // the feed (the store would reject it, the wire would not)
        backend.feed().publish(crate::backend::ChangeEvent::update(create_test_entry(
            "id-ghost", "Nowhere", "Too early",
        )));
        backend
            .insert(create_test_entry("id-real", "Acme", "Marker"))
            .unwrap();

        let state = wait_for_len(&mut rx, 1).await;
        assert_eq!(state.entries[0].id, "id-real");
        assert!(!state.entries.iter().any(|e| e.id == "id-ghost"));
    }
}

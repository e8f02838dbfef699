// Backend collaborator seam: the bulk-read + change-feed contract the sync
// core consumes, plus the SQLite-backed implementation used by the binaries.

use crate::db::{self, FeedbackEntry};
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Default buffered capacity of the change feed. Events raced during the
/// initial bulk read sit in this buffer until the sync task drains them.
pub const FEED_CAPACITY: usize = 256;

// ============================================================================
// CHANGE EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

/// One notification from the change feed.
///
/// Insert/Update carry the new record; Delete carries at least the old
/// record's id. Events missing their keying data are possible on the wire and
/// are dropped by the reconciler, never applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub new: Option<FeedbackEntry>,
    pub old_id: Option<String>,
}

impl ChangeEvent {
    pub fn insert(entry: FeedbackEntry) -> Self {
        ChangeEvent {
            kind: ChangeKind::Insert,
            new: Some(entry),
            old_id: None,
        }
    }

    pub fn update(entry: FeedbackEntry) -> Self {
        ChangeEvent {
            kind: ChangeKind::Update,
            new: Some(entry),
            old_id: None,
        }
    }

    pub fn delete(id: &str) -> Self {
        ChangeEvent {
            kind: ChangeKind::Delete,
            new: None,
            old_id: Some(id.to_string()),
        }
    }

    /// The id this event keys on, if present. Delete prefers the old record's
    /// id but accepts one delivered on `new`.
    pub fn entry_id(&self) -> Option<&str> {
        let id = match self.kind {
            ChangeKind::Insert | ChangeKind::Update => self.new.as_ref().map(|e| e.id.as_str()),
            ChangeKind::Delete => self
                .old_id
                .as_deref()
                .or_else(|| self.new.as_ref().map(|e| e.id.as_str())),
        };
        id.filter(|id| !id.is_empty())
    }
}

// ============================================================================
// STREAM ERRORS
// ============================================================================

/// Failure of the live subscription itself. Never fatal to already-loaded
/// data: the worst outcome is a list that stops receiving updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The subscriber fell behind the feed buffer and missed this many events.
    Lagged(u64),

    /// The feed was closed on the publishing side.
    Closed,

    /// `recv` was called after the subscription was released.
    Released,
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Lagged(n) => write!(f, "change feed lagged, {} events missed", n),
            StreamError::Closed => write!(f, "change feed closed"),
            StreamError::Released => write!(f, "subscription already released"),
        }
    }
}

impl std::error::Error for StreamError {}

// ============================================================================
// CHANGE FEED
// ============================================================================

/// Broadcast bus carrying `ChangeEvent`s from the backend to subscribers.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        ChangeFeed { tx }
    }

    /// Publish an event to every live subscriber. A feed with no subscribers
    /// swallows the event, same as a table nobody is watching.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Raw receiver for stream adapters (the server's SSE bridge). Component
    /// code should prefer `subscribe`.
    pub fn receiver(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

// ============================================================================
// SUBSCRIPTION
// ============================================================================

/// Handle on a live change stream.
///
/// Released exactly once: either by an explicit `unsubscribe` or by drop,
/// whichever comes first. Holding the handle is what keeps the stream open,
/// so every exit path - including setup failures - releases it.
pub struct Subscription {
    rx: Option<broadcast::Receiver<ChangeEvent>>,
}

impl Subscription {
    /// Wait for the next change event.
    pub async fn recv(&mut self) -> Result<ChangeEvent, StreamError> {
        let rx = self.rx.as_mut().ok_or(StreamError::Released)?;

        match rx.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(StreamError::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => Err(StreamError::Closed),
        }
    }

    /// Release the stream. Safe to call more than once; only the first call
    /// does anything.
    pub fn unsubscribe(&mut self) {
        self.rx = None;
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }
}

// ============================================================================
// BACKEND CONTRACT
// ============================================================================

/// The hosted table this dashboard mirrors, reduced to the two operations the
/// sync core needs: one full scan, and a live stream of subsequent changes.
pub trait FeedbackBackend {
    /// Full scan of the table, in whatever order the backend provides.
    fn bulk_read(&self) -> Result<Vec<FeedbackEntry>>;

    /// Open a live stream of change events for the whole table.
    fn subscribe(&self) -> Subscription;
}

// ============================================================================
// SQLITE BACKEND
// ============================================================================

/// Local SQLite implementation of the backend contract. Every mutation that
/// goes through this handle lands in the table and is published on the change
/// feed, so dashboards watching the feed stay current.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    feed: ChangeFeed,
}

impl SqliteBackend {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;
        db::setup_database(&conn)?;

        Ok(SqliteBackend {
            conn: Arc::new(Mutex::new(conn)),
            feed: ChangeFeed::default(),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::setup_database(&conn)?;

        Ok(SqliteBackend {
            conn: Arc::new(Mutex::new(conn)),
            feed: ChangeFeed::default(),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("feedback store lock poisoned")
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Insert a new entry, assigning identity if needed, and publish the
    /// insert on the change feed. Returns the stored entry.
    pub fn insert(&self, mut entry: FeedbackEntry) -> Result<FeedbackEntry> {
        entry.ensure_identity();
        db::insert_entry(&self.conn(), &entry)?;
        self.feed.publish(ChangeEvent::insert(entry.clone()));

        Ok(entry)
    }

    /// Replace the stored entry with the same id. Publishes only when a row
    /// actually changed; returns false for unknown ids.
    pub fn update(&self, entry: &FeedbackEntry) -> Result<bool> {
        let changed = db::update_entry(&self.conn(), entry)?;
        if changed {
            self.feed.publish(ChangeEvent::update(entry.clone()));
        }

        Ok(changed)
    }

    /// Delete by id. Publishes only when a row actually went away.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = db::delete_entry(&self.conn(), id)?;
        if removed {
            self.feed.publish(ChangeEvent::delete(id));
        }

        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Result<Option<FeedbackEntry>> {
        db::get_entry(&self.conn(), id)
    }

    pub fn entry_count(&self) -> Result<i64> {
        db::verify_count(&self.conn())
    }
}

impl FeedbackBackend for SqliteBackend {
    fn bulk_read(&self) -> Result<Vec<FeedbackEntry>> {
        db::get_all_entries(&self.conn())
    }

    fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[tokio::test]
    async fn test_mutations_are_published() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut sub = backend.subscribe();

        let stored = backend
            .insert(create_test_entry("", "Acme", "Solid process overall"))
            .unwrap();
        assert!(!stored.id.is_empty(), "insert should assign an id");

        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.entry_id(), Some(stored.id.as_str()));

        let mut revised = stored.clone();
        revised.one_line_summary = "Revised".to_string();
        assert!(backend.update(&revised).unwrap());

        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.new.unwrap().one_line_summary, "Revised");

        assert!(backend.delete(&stored.id).unwrap());

        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.entry_id(), Some(stored.id.as_str()));

        println!("✅ Mutation publishing test PASSED");
    }

    #[tokio::test]
    async fn test_silent_when_nothing_changed() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut sub = backend.subscribe();

        // Neither of these touches a row, so neither may publish
        let ghost = create_test_entry("id-ghost", "Nowhere", "Never inserted");
        assert!(!backend.update(&ghost).unwrap());
        assert!(!backend.delete("id-ghost").unwrap());

        backend
            .insert(create_test_entry("id-real", "Acme", "Marker event"))
            .unwrap();

        // The first event to arrive is the marker insert
        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.entry_id(), Some("id-real"));

        println!("✅ No-op silence test PASSED");
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_once() {
        let feed = ChangeFeed::default();
        assert_eq!(feed.subscriber_count(), 0);

        let mut sub = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        assert!(sub.is_active());

        sub.unsubscribe();
        assert_eq!(feed.subscriber_count(), 0);
        assert!(!sub.is_active());

        // Second release is a no-op, and recv reports the handle as released
        sub.unsubscribe();
        assert_eq!(sub.recv().await, Err(StreamError::Released));

        println!("✅ Unsubscribe-once test PASSED");
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let feed = ChangeFeed::default();

        {
            let _sub = feed.subscribe();
            assert_eq!(feed.subscriber_count(), 1);
        }

        assert_eq!(feed.subscriber_count(), 0);

        println!("✅ Drop-release test PASSED");
    }

    #[test]
    fn test_entry_id_requires_keying_data() {
        let no_record = ChangeEvent {
            kind: ChangeKind::Insert,
            new: None,
            old_id: None,
        };
        assert_eq!(no_record.entry_id(), None);

        let blank_id = ChangeEvent::update(create_test_entry("", "Acme", "No id yet"));
        assert_eq!(blank_id.entry_id(), None);

        let delete_via_new = ChangeEvent {
            kind: ChangeKind::Delete,
            new: Some(create_test_entry("id-a", "Acme", "x")),
            old_id: None,
        };
        assert_eq!(delete_via_new.entry_id(), Some("id-a"));

        println!("✅ Keying data test PASSED");
    }
}

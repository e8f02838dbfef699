// Feedback Board - Core Library
// Live-synced candidate-interview feedback list: one bulk read, then a
// change feed reconciled into the in-memory list. Exposed for the CLI
// dashboard, the API server, and tests.

pub mod backend;
pub mod db;
pub mod loader;
pub mod reconciler;
pub mod sync;

// Re-export commonly used types
pub use backend::{
    ChangeEvent, ChangeFeed, ChangeKind, FeedbackBackend, SqliteBackend, StreamError,
    Subscription, FEED_CAPACITY,
};
pub use db::{
    delete_entry, get_all_entries, get_entry, import_entries, insert_entry, load_csv,
    setup_database, update_entry, verify_count, FeedbackEntry,
};
pub use loader::{load_entries, FetchError};
pub use reconciler::{ApplyOutcome, ChangeReconciler, EntryList, InsertPosition};
pub use sync::{FeedbackListSync, ListState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

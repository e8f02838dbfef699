// 🔄 Change Reconciler - keep the loaded list in step with the change feed
//
// Applies insert/update/delete notifications to the in-memory entry list
// without ever producing two entries with the same id. Duplicate deliveries
// replace in place, updates for entries outside the view are dropped, and
// malformed events never reach the list.

use crate::backend::{ChangeEvent, ChangeKind};
use crate::db::FeedbackEntry;
use serde::{Deserialize, Serialize};

// ============================================================================
// ENTRY LIST
// ============================================================================

/// Ordered list of feedback entries with at most one entry per id.
///
/// Created empty, populated by one bulk load, then mutated only through
/// `ChangeReconciler::apply` until the owning component is torn down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryList {
    entries: Vec<FeedbackEntry>,
}

impl EntryList {
    pub fn new() -> Self {
        EntryList {
            entries: Vec::new(),
        }
    }

    /// Wrap a bulk-read result. Backend-provided order is accepted as-is.
    pub fn from_entries(entries: Vec<FeedbackEntry>) -> Self {
        EntryList { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.position_of(id).is_some()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Cloned snapshot for presenters.
    pub fn to_vec(&self) -> Vec<FeedbackEntry> {
        self.entries.clone()
    }
}

// ============================================================================
// INSERT PLACEMENT
// ============================================================================

/// Where a fresh insert lands in the list. The dashboard reads newest-at-top,
/// so `NewestFirst` (prepend) is the default and the documented policy of
/// this codebase; `OldestLast` exists for consumers that want feed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPosition {
    NewestFirst,
    OldestLast,
}

impl Default for InsertPosition {
    fn default() -> Self {
        InsertPosition::NewestFirst
    }
}

// ============================================================================
// APPLY OUTCOME
// ============================================================================

/// What applying one event did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyOutcome {
    /// Fresh insert, entry added at the configured position.
    Inserted,

    /// Insert for an id already present (duplicate delivery) - the existing
    /// entry was replaced in place instead of duplicated.
    ReplacedDuplicate,

    /// Update found its entry and replaced it in place, position unchanged.
    Updated,

    /// Update for an id not in the list - dropped, no synthetic insert.
    UnknownId,

    /// Delete removed its entry.
    Removed,

    /// Delete for an id not in the list - no-op.
    AlreadyGone,

    /// Event missing its keying data - dropped before touching the list.
    Malformed,
}

impl ApplyOutcome {
    /// Did the list change? Drives whether observers get notified.
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            ApplyOutcome::Inserted
                | ApplyOutcome::ReplacedDuplicate
                | ApplyOutcome::Updated
                | ApplyOutcome::Removed
        )
    }

    pub fn dropped(&self) -> bool {
        matches!(self, ApplyOutcome::UnknownId | ApplyOutcome::Malformed)
    }
}

// ============================================================================
// CHANGE RECONCILER
// ============================================================================

pub struct ChangeReconciler {
    /// Placement policy for fresh inserts (default: newest first)
    pub insert_position: InsertPosition,
}

impl ChangeReconciler {
    pub fn new() -> Self {
        ChangeReconciler {
            insert_position: InsertPosition::default(),
        }
    }

    pub fn with_insert_position(insert_position: InsertPosition) -> Self {
        ChangeReconciler { insert_position }
    }

    /// Apply one change event to the list.
    ///
    /// Never fails: events that cannot be applied are reported as dropped
    /// outcomes so a bad notification cannot tear down the stream. Applying
    /// the same event twice leaves the list exactly as applying it once.
    pub fn apply(&self, list: &mut EntryList, event: &ChangeEvent) -> ApplyOutcome {
        match event.kind {
            ChangeKind::Insert => {
                let entry = match event.new.as_ref() {
                    Some(entry) if !entry.id.is_empty() => entry,
                    _ => return ApplyOutcome::Malformed,
                };

                match list.position_of(&entry.id) {
                    // At-least-once delivery: same insert seen again replaces
                    // in place, it must never create a second row
                    Some(pos) => {
                        list.entries[pos] = entry.clone();
                        ApplyOutcome::ReplacedDuplicate
                    }
                    None => {
                        match self.insert_position {
                            InsertPosition::NewestFirst => list.entries.insert(0, entry.clone()),
                            InsertPosition::OldestLast => list.entries.push(entry.clone()),
                        }
                        ApplyOutcome::Inserted
                    }
                }
            }

            ChangeKind::Update => {
                let entry = match event.new.as_ref() {
                    Some(entry) if !entry.id.is_empty() => entry,
                    _ => return ApplyOutcome::Malformed,
                };

                match list.position_of(&entry.id) {
                    Some(pos) => {
                        list.entries[pos] = entry.clone();
                        ApplyOutcome::Updated
                    }
                    // Update raced ahead of its insert, or targets an entry
                    // outside this view: best-effort policy is to drop it
                    None => ApplyOutcome::UnknownId,
                }
            }

            ChangeKind::Delete => {
                let id = match event.entry_id() {
                    Some(id) => id,
                    None => return ApplyOutcome::Malformed,
                };

                match list.position_of(id) {
                    Some(pos) => {
                        list.entries.remove(pos);
                        ApplyOutcome::Removed
                    }
                    None => ApplyOutcome::AlreadyGone,
                }
            }
        }
    }
}

impl Default for ChangeReconciler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Minimal entry for reconciliation tests: identity plus a couple of
    /// descriptive fields to observe replacement. Fixed timestamp so list
    /// comparisons are exact.
    fn create_test_entry(id: &str, company: &str, summary: &str) -> FeedbackEntry {
        FeedbackEntry {
            id: id.to_string(),
            created_at: chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
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

    fn loaded_list(ids: &[(&str, &str)]) -> EntryList {
        EntryList::from_entries(
            ids.iter()
                .map(|(id, company)| create_test_entry(id, company, "summary"))
                .collect(),
        )
    }

    fn assert_unique_ids(list: &EntryList) {
        let mut seen = std::collections::HashSet::new();
        for entry in list.entries() {
            assert!(
                seen.insert(entry.id.clone()),
                "duplicate id in list: {}",
                entry.id
            );
        }
    }

    #[test]
    fn test_insert_new_entry() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X")]);

        let event = ChangeEvent::insert(create_test_entry("b", "Y", "fresh"));
        let outcome = reconciler.apply(&mut list, &event);

        assert_eq!(outcome, ApplyOutcome::Inserted);
        assert!(outcome.mutated());
        assert_eq!(list.len(), 2);
        assert!(list.contains_id("a"));
        assert!(list.contains_id("b"));
        assert_unique_ids(&list);

        println!("✅ Insert test PASSED");
    }

    #[test]
    fn test_insert_prepends_by_default() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X"), ("b", "Y")]);

        reconciler.apply(&mut list, &ChangeEvent::insert(create_test_entry("c", "Z", "newest")));

        assert_eq!(list.entries()[0].id, "c", "fresh insert lands at the top");
        assert_eq!(list.entries()[1].id, "a");
        assert_eq!(list.entries()[2].id, "b");

        println!("✅ Prepend placement test PASSED");
    }

    #[test]
    fn test_insert_appends_when_configured() {
        let reconciler = ChangeReconciler::with_insert_position(InsertPosition::OldestLast);
        let mut list = loaded_list(&[("a", "X")]);

        reconciler.apply(&mut list, &ChangeEvent::insert(create_test_entry("b", "Y", "later")));

        assert_eq!(list.entries()[0].id, "a");
        assert_eq!(list.entries()[1].id, "b");

        println!("✅ Append placement test PASSED");
    }

    #[test]
    fn test_duplicate_insert_replaces_in_place() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X")]);

        // At-least-once delivery: the same row arrives again, fields updated
        let event = ChangeEvent::insert(create_test_entry("a", "dup", "redelivered"));
        let outcome = reconciler.apply(&mut list, &event);

        assert_eq!(outcome, ApplyOutcome::ReplacedDuplicate);
        assert_eq!(list.len(), 1, "duplicate insert must not grow the list");
        assert_eq!(list.entries()[0].company_name, "dup");
        assert_unique_ids(&list);

        println!("✅ Duplicate insert test PASSED");
    }

    #[test]
    fn test_insert_twice_equals_insert_once() {
        let reconciler = ChangeReconciler::new();
        let event = ChangeEvent::insert(create_test_entry("b", "Y", "fresh"));

        let mut once = loaded_list(&[("a", "X")]);
        reconciler.apply(&mut once, &event);

        let mut twice = loaded_list(&[("a", "X")]);
        reconciler.apply(&mut twice, &event);
        reconciler.apply(&mut twice, &event);

        assert_eq!(once, twice, "dedup idempotence: twice == once");

        println!("✅ Idempotence test PASSED");
    }

    #[test]
    fn test_update_replaces_in_place() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X"), ("b", "Y")]);

        let event = ChangeEvent::update(create_test_entry("a", "Z", "revised"));
        let outcome = reconciler.apply(&mut list, &event);

        assert_eq!(outcome, ApplyOutcome::Updated);
        assert_eq!(list.len(), 2);
        assert_eq!(list.entries()[0].id, "a", "position unchanged");
        assert_eq!(list.entries()[0].company_name, "Z");

        println!("✅ Update-in-place test PASSED");
    }

    #[test]
    fn test_update_for_unknown_id_is_dropped() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X")]);
        let before = list.clone();

        let event = ChangeEvent::update(create_test_entry("ghost", "Y", "early"));
        let outcome = reconciler.apply(&mut list, &event);

        assert_eq!(outcome, ApplyOutcome::UnknownId);
        assert!(outcome.dropped());
        assert!(!outcome.mutated());
        assert_eq!(list, before, "update before insert leaves the list unchanged");

        println!("✅ Unknown-id update test PASSED");
    }

    #[test]
    fn test_delete_removes_entry() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X"), ("b", "Y")]);

        let outcome = reconciler.apply(&mut list, &ChangeEvent::delete("a"));

        assert_eq!(outcome, ApplyOutcome::Removed);
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries()[0].id, "b");

        println!("✅ Delete test PASSED");
    }

    #[test]
    fn test_delete_for_unknown_id_is_noop() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X")]);
        let before = list.clone();

        let outcome = reconciler.apply(&mut list, &ChangeEvent::delete("ghost"));

        assert_eq!(outcome, ApplyOutcome::AlreadyGone);
        assert_eq!(list, before);

        println!("✅ Delete no-op test PASSED");
    }

    #[test]
    fn test_malformed_events_are_dropped() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X")]);
        let before = list.clone();

        let missing_record = ChangeEvent {
            kind: ChangeKind::Insert,
            new: None,
            old_id: None,
        };
        let blank_id = ChangeEvent::update(create_test_entry("", "Y", "no id"));
        let keyless_delete = ChangeEvent {
            kind: ChangeKind::Delete,
            new: None,
            old_id: None,
        };

        for event in [&missing_record, &blank_id, &keyless_delete] {
            let outcome = reconciler.apply(&mut list, event);
            assert_eq!(outcome, ApplyOutcome::Malformed);
        }

        assert_eq!(list, before, "malformed events never touch the list");

        println!("✅ Malformed event test PASSED");
    }

    #[test]
    fn test_no_duplicates_after_any_sequence() {
        let reconciler = ChangeReconciler::new();
        let mut list = loaded_list(&[("a", "X"), ("b", "Y"), ("c", "Z")]);

        let events = vec![
            ChangeEvent::insert(create_test_entry("d", "W", "fresh")),
            ChangeEvent::insert(create_test_entry("a", "X2", "redelivered")),
            ChangeEvent::update(create_test_entry("b", "Y2", "revised")),
            ChangeEvent::delete("c"),
            ChangeEvent::insert(create_test_entry("c", "Z2", "reborn")),
            ChangeEvent::update(create_test_entry("ghost", "G", "dropped")),
            ChangeEvent::delete("ghost"),
            ChangeEvent::insert(create_test_entry("d", "W2", "redelivered again")),
        ];

        for event in &events {
            reconciler.apply(&mut list, event);
            assert_unique_ids(&list);
        }

        assert_eq!(list.len(), 4);
        assert_eq!(
            list.position_of("b"),
            Some(3),
            "no cross-id reordering from event arrival"
        );

        println!("✅ Sequence invariant test PASSED");
    }
}

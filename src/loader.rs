// Initial bulk read. One request for the whole table; either the full result
// set or a surfaced error, never a partial or cached list.

use crate::backend::FeedbackBackend;
use crate::db::FeedbackEntry;

/// Bulk read failure, carrying the backend-reported message for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        FetchError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bulk read failed: {}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// Fetch the full current contents of the table.
///
/// Entries come back in whatever order the backend provides. The read is
/// idempotent and safe to retry, but this core never retries on its own - a
/// failure is handed to the caller to surface.
pub fn load_entries<B: FeedbackBackend + ?Sized>(
    backend: &B,
) -> Result<Vec<FeedbackEntry>, FetchError> {
    backend
        .bulk_read()
        .map_err(|e| FetchError::new(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SqliteBackend, Subscription};
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

    /// Backend whose bulk read always fails, for the error path
    struct FailingBackend;

    impl FeedbackBackend for FailingBackend {
        fn bulk_read(&self) -> anyhow::Result<Vec<FeedbackEntry>> {
            anyhow::bail!("connection refused by host")
        }

        fn subscribe(&self) -> Subscription {
            crate::backend::ChangeFeed::default().subscribe()
        }
    }

    #[test]
    fn test_load_returns_full_table() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend
            .insert(create_test_entry("id-a", "Acme", "Solid process overall"))
            .unwrap();
        backend
            .insert(create_test_entry("id-b", "Globex", "Fast but impersonal"))
            .unwrap();

        let entries = load_entries(&backend).unwrap();
        assert_eq!(entries.len(), 2);

        println!("✅ Loader full-read test PASSED");
    }

    #[test]
    fn test_load_failure_carries_backend_message() {
        let result = load_entries(&FailingBackend);

        let err = result.unwrap_err();
        assert!(
            err.message().contains("connection refused"),
            "error should carry the backend-reported message, got: {}",
            err
        );

        println!("✅ Loader error-path test PASSED");
    }
}

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// A single candidate-interview feedback record.
///
/// `id` is the stable identity used for reconciliation against the change
/// feed; `created_at` is set once at creation. Everything else is descriptive
/// and opaque to the sync core - copied verbatim, inspected only for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Stable identity (UUID). Sole equality key for reconciliation.
    #[serde(default = "default_uuid")]
    pub id: String,

    /// Set at creation, immutable afterwards.
    #[serde(default = "default_created_at")]
    pub created_at: DateTime<Utc>,

    pub company_name: String,

    #[serde(default)]
    pub years_experience: String,

    #[serde(default)]
    pub interview_duration: String,

    #[serde(default)]
    pub interview_stage: String,

    #[serde(default)]
    pub communication_rating: Option<i64>,

    #[serde(default)]
    pub communication_reason: String,

    #[serde(default)]
    pub interviewer_experience: String,

    #[serde(default)]
    pub clarity_on_role: String,

    #[serde(default)]
    pub clarity_explain: String,

    #[serde(default)]
    pub frustration_point: String,

    #[serde(default)]
    pub positive_aspect: String,

    #[serde(default)]
    pub overall_rating: Option<i64>,

    // Early exports of the table called this column `one_line_sumr`; the
    // fixed spelling is canonical everywhere in this codebase.
    #[serde(default, alias = "one_line_sumr")]
    pub one_line_summary: String,

    #[serde(default)]
    pub opt_in_contact: bool,

    #[serde(default)]
    pub email: String,
}

// Helper functions for serde defaults
fn default_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_created_at() -> DateTime<Utc> {
    Utc::now()
}

impl FeedbackEntry {
    /// Compute content hash for import deduplication.
    /// NOTE: This is for DEDUPLICATION of re-imported rows, not IDENTITY!
    /// Identity = id (UUID), Deduplication = hash
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}{}{}{}",
            self.company_name,
            self.created_at.to_rfc3339(),
            self.one_line_summary,
            self.email
        ));
        format!("{:x}", hasher.finalize())
    }

    /// Fill in identity fields for a freshly created entry.
    pub fn ensure_identity(&mut self) {
        if self.id.is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
    }

    /// Shortened id for display, matching the dashboard's "a1b2c..." style.
    pub fn short_id(&self) -> String {
        if self.id.len() > 5 {
            format!("{}...", &self.id[..5])
        } else {
            self.id.clone()
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS feedback_entries (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_hash TEXT UNIQUE NOT NULL,
            id TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL,
            company_name TEXT NOT NULL,
            years_experience TEXT,
            interview_duration TEXT,
            interview_stage TEXT,
            communication_rating INTEGER,
            communication_reason TEXT,
            interviewer_experience TEXT,
            clarity_on_role TEXT,
            clarity_explain TEXT,
            frustration_point TEXT,
            positive_aspect TEXT,
            overall_rating INTEGER,
            one_line_summary TEXT,
            opt_in_contact INTEGER NOT NULL DEFAULT 0,
            email TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entries_created_at ON feedback_entries(created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entries_stage ON feedback_entries(interview_stage)",
        [],
    )?;

    Ok(())
}

const ENTRY_COLUMNS: &str = "id, created_at, company_name, years_experience, interview_duration,
        interview_stage, communication_rating, communication_reason,
        interviewer_experience, clarity_on_role, clarity_explain,
        frustration_point, positive_aspect, overall_rating, one_line_summary,
        opt_in_contact, email";

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedbackEntry> {
    let created_at_str: String = row.get(1)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|_| rusqlite::Error::InvalidQuery)?
        .with_timezone(&Utc);

    Ok(FeedbackEntry {
        id: row.get(0)?,
        created_at,
        company_name: row.get(2)?,
        years_experience: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        interview_duration: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        interview_stage: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        communication_rating: row.get(6)?,
        communication_reason: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        interviewer_experience: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        clarity_on_role: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        clarity_explain: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        frustration_point: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        positive_aspect: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
        overall_rating: row.get(13)?,
        one_line_summary: row.get::<_, Option<String>>(14)?.unwrap_or_default(),
        opt_in_contact: row.get(15)?,
        email: row.get::<_, Option<String>>(16)?.unwrap_or_default(),
    })
}

/// Insert a single entry. Fails on duplicate id or duplicate content hash.
pub fn insert_entry(conn: &Connection, entry: &FeedbackEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO feedback_entries (
            content_hash, id, created_at, company_name, years_experience,
            interview_duration, interview_stage, communication_rating,
            communication_reason, interviewer_experience, clarity_on_role,
            clarity_explain, frustration_point, positive_aspect,
            overall_rating, one_line_summary, opt_in_contact, email
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            entry.content_hash(),
            entry.id,
            entry.created_at.to_rfc3339(),
            entry.company_name,
            entry.years_experience,
            entry.interview_duration,
            entry.interview_stage,
            entry.communication_rating,
            entry.communication_reason,
            entry.interviewer_experience,
            entry.clarity_on_role,
            entry.clarity_explain,
            entry.frustration_point,
            entry.positive_aspect,
            entry.overall_rating,
            entry.one_line_summary,
            entry.opt_in_contact,
            entry.email,
        ],
    )?;

    Ok(())
}

/// Replace the stored row for `entry.id`. Returns false when no row has that id.
pub fn update_entry(conn: &Connection, entry: &FeedbackEntry) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE feedback_entries SET
            content_hash = ?1, company_name = ?2, years_experience = ?3,
            interview_duration = ?4, interview_stage = ?5,
            communication_rating = ?6, communication_reason = ?7,
            interviewer_experience = ?8, clarity_on_role = ?9,
            clarity_explain = ?10, frustration_point = ?11,
            positive_aspect = ?12, overall_rating = ?13,
            one_line_summary = ?14, opt_in_contact = ?15, email = ?16
         WHERE id = ?17",
        params![
            entry.content_hash(),
            entry.company_name,
            entry.years_experience,
            entry.interview_duration,
            entry.interview_stage,
            entry.communication_rating,
            entry.communication_reason,
            entry.interviewer_experience,
            entry.clarity_on_role,
            entry.clarity_explain,
            entry.frustration_point,
            entry.positive_aspect,
            entry.overall_rating,
            entry.one_line_summary,
            entry.opt_in_contact,
            entry.email,
            entry.id,
        ],
    )?;

    Ok(changed > 0)
}

/// Delete by id. Returns false when no row has that id.
pub fn delete_entry(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM feedback_entries WHERE id = ?1", params![id])?;

    Ok(changed > 0)
}

/// Full scan of the table, newest first.
pub fn get_all_entries(conn: &Connection) -> Result<Vec<FeedbackEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS}
         FROM feedback_entries
         ORDER BY created_at DESC, row_id DESC"
    ))?;

    let entries = stmt
        .query_map([], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

pub fn get_entry(conn: &Connection, id: &str) -> Result<Option<FeedbackEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS}
         FROM feedback_entries
         WHERE id = ?1"
    ))?;

    let mut rows = stmt.query_map(params![id], entry_from_row)?;

    match rows.next() {
        Some(entry) => Ok(Some(entry?)),
        None => Ok(None),
    }
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM feedback_entries", [], |row| row.get(0))?;

    Ok(count)
}

/// Load feedback entries from a CSV export of the table.
pub fn load_csv(csv_path: &Path) -> Result<Vec<FeedbackEntry>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut entries = Vec::new();

    for result in rdr.deserialize() {
        let mut entry: FeedbackEntry = result.context("Failed to deserialize feedback entry")?;
        entry.ensure_identity();
        entries.push(entry);
    }

    Ok(entries)
}

/// Bulk import with duplicate skip. Re-importing the same CSV inserts nothing:
/// rows are keyed by content hash, so at-least-once imports stay idempotent.
pub fn import_entries(conn: &Connection, entries: &[FeedbackEntry]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for entry in entries {
        match insert_entry(conn, entry) {
            Ok(()) => inserted += 1,
            Err(e) => {
                let is_duplicate = e.downcast_ref::<rusqlite::Error>().is_some_and(|e| {
                    matches!(
                        e,
                        rusqlite::Error::SqliteFailure(err, _)
                            if err.code == rusqlite::ErrorCode::ConstraintViolation
                    )
                });
                if is_duplicate {
                    duplicates += 1;
                } else {
                    return Err(e);
                }
            }
        }
    }

    println!("✓ Inserted: {} entries", inserted);
    println!("✓ Skipped duplicates: {}", duplicates);

    Ok(inserted)
}

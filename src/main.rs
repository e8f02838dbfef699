// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use feedback_board::{import_entries, load_csv, setup_database, verify_count};
use rusqlite::Connection;
use std::env;
use std::path::Path;

const DB_PATH: &str = "feedback.db";
const CSV_PATH: &str = "feedback_entries.csv";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("seed") => {
            // Import mode
            run_seed(args.get(2).map(String::as_str))?;
        }
        Some("demo") => {
            // Live demo with scripted traffic
            run_demo()?;
        }
        _ => {
            // Dashboard mode (default)
            run_board()?;
        }
    }

    Ok(())
}

fn run_seed(csv_arg: Option<&str>) -> Result<()> {
    println!("🗄️  Feedback Board - Seed Import (CSV → SQLite + WAL)");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let csv_path = Path::new(csv_arg.unwrap_or(CSV_PATH));
    let db_path = Path::new(DB_PATH);

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let entries = load_csv(csv_path)?;
    println!("✓ Loaded {} feedback entries from {:?}", entries.len(), csv_path);

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = Connection::open(db_path)?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 3. Insert entries
    println!("\n💾 Inserting entries...");
    import_entries(&conn, &entries)?;

    // 4. Verify count
    println!("\n🔍 Verifying database...");
    let count = verify_count(&conn)?;
    println!("✓ Database contains {} feedback entries", count);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Seed complete. Run `cargo run` for the live board.");

    Ok(())
}

#[cfg(feature = "tui")]
fn run_board() -> Result<()> {
    use feedback_board::{FeedbackListSync, SqliteBackend};

    println!("🖥️  Loading Feedback Board...\n");

    let db_path = Path::new(DB_PATH);

    if !db_path.exists() {
        eprintln!("❌ Database not found!");
        eprintln!("   Run: cargo run seed");
        eprintln!("   to import feedback entries first.");
        std::process::exit(1);
    }

    let backend = SqliteBackend::open(db_path)?;
    println!("✓ Database opened: {:?}", db_path);

    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let mut sync = FeedbackListSync::start(backend);
    if let Err(msg) = runtime.block_on(sync.loaded()) {
        eprintln!("❌ Initial load failed: {}", msg);
        runtime.block_on(sync.shutdown());
        std::process::exit(1);
    }

    println!("✓ Loaded {} entries\n", sync.snapshot().len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(&sync.state());
    ui::run_ui(&mut app, sync.watch())?;

    runtime.block_on(sync.shutdown());
    println!("\n✅ Board closed successfully");

    Ok(())
}

#[cfg(feature = "tui")]
fn run_demo() -> Result<()> {
    use feedback_board::{FeedbackListSync, SqliteBackend};

    println!("🎬 Feedback Board - Demo Mode (in-memory, scripted traffic)\n");

    let backend = SqliteBackend::in_memory()?;

    // A couple of entries exist before the board loads
    for (company, stage, rating, summary) in demo_entries().iter().take(2) {
        backend.insert(demo_entry(company, stage, *rating, summary))?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let mut sync = FeedbackListSync::start(backend.clone());
    runtime
        .block_on(sync.loaded())
        .map_err(|msg| anyhow::anyhow!("initial load failed: {}", msg))?;

    // Scripted traffic: inserts, an occasional revision, an occasional
    // retraction. Deterministic on purpose so reruns look the same.
    let traffic = tokio::spawn(drive_demo_traffic(backend));

    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(&sync.state());
    ui::run_ui(&mut app, sync.watch())?;

    traffic.abort();
    runtime.block_on(sync.shutdown());
    println!("\n✅ Demo closed successfully");

    Ok(())
}

#[cfg(feature = "tui")]
async fn drive_demo_traffic(backend: feedback_board::SqliteBackend) {
    use std::time::Duration;

    let script = demo_entries();
    let mut inserted: Vec<feedback_board::FeedbackEntry> = Vec::new();
    let mut step = 0usize;

    loop {
        tokio::time::sleep(Duration::from_secs(2)).await;

        let (company, stage, rating, summary) = &script[step % script.len()];

        match step % 5 {
            // Mostly inserts...
            0 | 1 | 2 => {
                if let Ok(entry) = backend.insert(demo_entry(company, stage, *rating, summary)) {
                    inserted.push(entry);
                }
            }
            // ...sometimes a revision of the latest entry...
            3 => {
                if let Some(entry) = inserted.last() {
                    let mut revised = entry.clone();
                    revised.one_line_summary = format!("{} (revised)", entry.one_line_summary);
                    revised.overall_rating = Some(5);
                    let _ = backend.update(&revised);
                }
            }
            // ...sometimes the oldest one is withdrawn
            _ => {
                if inserted.len() > 3 {
                    let entry = inserted.remove(0);
                    let _ = backend.delete(&entry.id);
                }
            }
        }

        step += 1;
    }
}

#[cfg(feature = "tui")]
fn demo_entry(
    company: &str,
    stage: &str,
    rating: i64,
    summary: &str,
) -> feedback_board::FeedbackEntry {
    feedback_board::FeedbackEntry {
        id: String::new(),
        created_at: chrono::Utc::now(),
        company_name: company.to_string(),
        years_experience: "3-5".to_string(),
        interview_duration: "60 min".to_string(),
        interview_stage: stage.to_string(),
        communication_rating: Some(rating),
        communication_reason: "Recruiter kept me in the loop".to_string(),
        interviewer_experience: "Senior panel, well prepared".to_string(),
        clarity_on_role: "Yes".to_string(),
        clarity_explain: "Role and team were described early on".to_string(),
        frustration_point: "Scheduling took two weeks".to_string(),
        positive_aspect: "Questions matched the actual job".to_string(),
        overall_rating: Some(rating),
        one_line_summary: summary.to_string(),
        opt_in_contact: rating >= 4,
        email: "candidate@example.com".to_string(),
    }
}

#[cfg(feature = "tui")]
fn demo_entries() -> Vec<(&'static str, &'static str, i64, &'static str)> {
    vec![
        ("Acme Corp", "Phone Screen", 4, "Friendly screen, clear next steps"),
        ("Globex", "Onsite", 2, "Five hours, no breaks, vague feedback"),
        ("Initech", "Technical", 5, "Best pairing interview I've had"),
        ("Umbrella Labs", "Phone Screen", 3, "Fine but felt scripted"),
        ("Stark Industries", "Onsite", 4, "Long day, genuinely hard problems"),
        ("Wayne Enterprises", "Final Round", 5, "Executives actually showed up on time"),
        ("Hooli", "Technical", 1, "Interviewer multitasked the whole hour"),
        ("Pied Piper", "Phone Screen", 4, "Short, sharp, respectful of my time"),
    ]
}

#[cfg(not(feature = "tui"))]
fn run_board() -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin feedback-server --features server");
    std::process::exit(1);
}

#[cfg(not(feature = "tui"))]
fn run_demo() -> Result<()> {
    run_board()
}

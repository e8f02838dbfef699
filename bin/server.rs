// Feedback Board - Web Server
// REST API + live change-feed bridge (SSE) over the synced feedback list

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{Html, IntoResponse, Json},
    routing::{get, put},
    Router,
};
use feedback_board::{FeedbackEntry, FeedbackListSync, SqliteBackend};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Shared application state
#[derive(Clone)]
struct AppState {
    backend: SqliteBackend,
    sync: Arc<FeedbackListSync>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn err(data: T, message: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(message),
        }
    }
}

/// Stats response
#[derive(Serialize)]
struct StatsResponse {
    total_entries: usize,
    average_overall: f64,
    average_communication: f64,
    opt_in_count: usize,
    by_stage: Vec<StageStat>,
}

#[derive(Serialize)]
struct StageStat {
    stage: String,
    count: usize,
    average_overall: f64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/entries - Current snapshot of the synced list (newest first)
async fn get_entries(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.sync.snapshot()))
}

/// GET /api/stats - Aggregates over the current snapshot
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.sync.snapshot();

    let mut overall_total = 0i64;
    let mut overall_count = 0usize;
    let mut comm_total = 0i64;
    let mut comm_count = 0usize;
    let mut opt_in_count = 0usize;

    let mut stage_stats: std::collections::HashMap<String, (usize, i64, usize)> =
        std::collections::HashMap::new();

    for entry in &entries {
        if let Some(rating) = entry.overall_rating {
            overall_total += rating;
            overall_count += 1;
        }
        if let Some(rating) = entry.communication_rating {
            comm_total += rating;
            comm_count += 1;
        }
        if entry.opt_in_contact {
            opt_in_count += 1;
        }

        let stage = if entry.interview_stage.is_empty() {
            "(unspecified)".to_string()
        } else {
            entry.interview_stage.clone()
        };
        let slot = stage_stats.entry(stage).or_insert((0, 0, 0));
        slot.0 += 1;
        if let Some(rating) = entry.overall_rating {
            slot.1 += rating;
            slot.2 += 1;
        }
    }

    let avg = |total: i64, count: usize| {
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    };

    let by_stage: Vec<StageStat> = stage_stats
        .into_iter()
        .map(|(stage, (count, total, rated))| StageStat {
            stage,
            count,
            average_overall: avg(total, rated),
        })
        .collect();

    let stats = StatsResponse {
        total_entries: entries.len(),
        average_overall: avg(overall_total, overall_count),
        average_communication: avg(comm_total, comm_count),
        opt_in_count,
        by_stage,
    };

    Json(ApiResponse::ok(stats))
}

/// GET /api/stages/:stage - Entries for one interview stage
async fn get_stage_entries(
    State(state): State<AppState>,
    Path(stage): Path<String>,
) -> impl IntoResponse {
    // Decode URL-encoded stage name
    let decoded_stage = urlencoding::decode(&stage)
        .unwrap_or_else(|_| stage.clone().into())
        .into_owned();

    let entries: Vec<FeedbackEntry> = state
        .sync
        .snapshot()
        .into_iter()
        .filter(|e| {
            decoded_stage == "all" || e.interview_stage.eq_ignore_ascii_case(&decoded_stage)
        })
        .collect();

    Json(ApiResponse::ok(entries))
}

/// POST /api/entries - Submit a new feedback entry
async fn create_entry(
    State(state): State<AppState>,
    Json(entry): Json<FeedbackEntry>,
) -> impl IntoResponse {
    match state.backend.insert(entry) {
        Ok(stored) => (StatusCode::CREATED, Json(ApiResponse::ok(Some(stored)))).into_response(),
        Err(e) => {
            eprintln!("Error inserting entry: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(None::<FeedbackEntry>, e.to_string())),
            )
                .into_response()
        }
    }
}

/// PUT /api/entries/:id - Replace an existing entry
async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut entry): Json<FeedbackEntry>,
) -> impl IntoResponse {
    // The path id wins over whatever the body carries
    entry.id = id;

    match state.backend.update(&entry) {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::ok(Some(entry)))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(
                None::<FeedbackEntry>,
                format!("no entry with id {}", entry.id),
            )),
        )
            .into_response(),
        Err(e) => {
            eprintln!("Error updating entry {}: {}", entry.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(None::<FeedbackEntry>, e.to_string())),
            )
                .into_response()
        }
    }
}

/// DELETE /api/entries/:id - Remove an entry
async fn delete_entry(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.backend.delete(&id) {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::ok(true))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(false, format!("no entry with id {}", id))),
        )
            .into_response(),
        Err(e) => {
            eprintln!("Error deleting entry {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(false, e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/events - Change feed bridged to Server-Sent Events
async fn events(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.backend.feed().receiver();
    let changes = BroadcastStream::new(rx).filter_map(|res| res.ok()).map(|ev| {
        let data = serde_json::to_string(&ev).unwrap_or_else(|_| "{}".to_string());
        Ok::<Event, Infallible>(Event::default().event(ev.kind.name()).data(data))
    });

    let initial = tokio_stream::once(Ok::<Event, Infallible>(
        Event::default().event("CONNECTED").data("{}"),
    ));
    let stream = initial.chain(changes);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("hb"))
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Feedback Board - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "feedback.db".to_string());
    let db_path = std::path::Path::new(&db_path);

    let backend = match SqliteBackend::open(db_path) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("❌ Failed to open database at {:?}: {}", db_path, e);
            eprintln!("   Run: cargo run seed");
            eprintln!("   to import feedback entries first.");
            std::process::exit(1);
        }
    };
    println!("✓ Database opened: {:?}", db_path);

    // The synced list the read endpoints serve from; mutations go through
    // the backend, land on the feed, and flow back into this component
    let mut sync = FeedbackListSync::start(backend.clone());
    if let Err(msg) = sync.loaded().await {
        eprintln!("❌ Initial load failed: {}", msg);
        sync.shutdown().await;
        std::process::exit(1);
    }
    println!("✓ Loaded {} entries", sync.snapshot().len());

    let state = AppState {
        backend,
        sync: Arc::new(sync),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/entries", get(get_entries).post(create_entry))
        .route("/entries/:id", put(update_entry).delete(delete_entry))
        .route("/stats", get(get_stats))
        .route("/stages/:stage", get(get_stage_entries))
        .route("/events", get(events))
        .with_state(state.clone());

    // Build main router
    let app = Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/entries");
    println!("   SSE: http://localhost:3000/api/events");
    println!("   UI:  http://localhost:3000");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

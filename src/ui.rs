use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use feedback_board::{FeedbackEntry, ListState};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::HashMap;
use std::io;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Board,
    Stages,
    Views,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Board => Page::Stages,
            Page::Stages => Page::Views,
            Page::Views => Page::Board,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Board => Page::Views,
            Page::Stages => Page::Board,
            Page::Views => Page::Stages,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterType {
    None,
    AllEntries,
    OptInOnly,
    HighRating,
    LowRating,
    ByStage(String),
}

pub struct App {
    pub entries: Vec<FeedbackEntry>,
    pub filtered_entries: Vec<FeedbackEntry>,
    pub state: TableState,
    pub current_page: Page,
    pub stages_state: TableState,
    pub show_detail: bool,
    pub active_filter: FilterType,
    pub loading: bool,
    pub error: Option<String>,
    pub missed_events: u64,
    pub live: bool,
}

impl App {
    pub fn new(initial: &ListState) -> Self {
        let mut state = TableState::default();
        if !initial.entries.is_empty() {
            state.select(Some(0));
        }

        let mut stages_state = TableState::default();
        stages_state.select(Some(0));

        Self {
            entries: initial.entries.clone(),
            filtered_entries: initial.entries.clone(),
            state,
            current_page: Page::Board,
            stages_state,
            show_detail: false,
            active_filter: FilterType::None,
            loading: initial.loading,
            error: initial.error.clone(),
            missed_events: initial.missed_events,
            live: true,
        }
    }

    /// Pull a fresh snapshot from the sync cell into the view, keeping the
    /// active filter and clamping the selection.
    pub fn refresh(&mut self, snapshot: &ListState) {
        self.entries = snapshot.entries.clone();
        self.loading = snapshot.loading;
        self.error = snapshot.error.clone();
        self.missed_events = snapshot.missed_events;
        self.apply_filter(self.active_filter.clone());
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_entry(&self) -> Option<&FeedbackEntry> {
        self.state
            .selected()
            .and_then(|i| self.filtered_entries.get(i))
    }

    pub fn apply_filter(&mut self, filter: FilterType) {
        self.active_filter = filter.clone();

        self.filtered_entries = match filter {
            FilterType::None | FilterType::AllEntries => self.entries.clone(),
            FilterType::OptInOnly => self
                .entries
                .iter()
                .filter(|e| e.opt_in_contact)
                .cloned()
                .collect(),
            FilterType::HighRating => self
                .entries
                .iter()
                .filter(|e| e.overall_rating.is_some_and(|r| r >= 4))
                .cloned()
                .collect(),
            FilterType::LowRating => self
                .entries
                .iter()
                .filter(|e| e.overall_rating.is_some_and(|r| r <= 2))
                .cloned()
                .collect(),
            FilterType::ByStage(ref stage) => self
                .entries
                .iter()
                .filter(|e| {
                    &e.interview_stage == stage
                        || (stage == "(unspecified)" && e.interview_stage.is_empty())
                })
                .cloned()
                .collect(),
        };

        // Keep the selection in range after a live mutation shrank the list
        match self.state.selected() {
            Some(i) if i >= self.filtered_entries.len() => {
                if self.filtered_entries.is_empty() {
                    self.state.select(None);
                } else {
                    self.state.select(Some(self.filtered_entries.len() - 1));
                }
            }
            None if !self.filtered_entries.is_empty() => self.state.select(Some(0)),
            _ => {}
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(FilterType::None);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn stage_summary(&self) -> Vec<(String, usize, f64)> {
        let mut summary: HashMap<String, (usize, i64, usize)> = HashMap::new();

        for entry in &self.entries {
            let stage = if entry.interview_stage.is_empty() {
                "(unspecified)".to_string()
            } else {
                entry.interview_stage.clone()
            };
            let slot = summary.entry(stage).or_insert((0, 0, 0));
            slot.0 += 1;
            if let Some(rating) = entry.overall_rating {
                slot.1 += rating;
                slot.2 += 1;
            }
        }

        let mut result: Vec<_> = summary
            .into_iter()
            .map(|(stage, (count, total, rated))| {
                let avg = if rated > 0 {
                    total as f64 / rated as f64
                } else {
                    0.0
                };
                (stage, count, avg)
            })
            .collect();

        result.sort_by(|a, b| b.1.cmp(&a.1));
        result
    }

    pub fn stages_next(&mut self) {
        let len = self.stage_summary().len();
        if len == 0 {
            return;
        }
        let i = match self.stages_state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.stages_state.select(Some(i));
    }

    pub fn stages_previous(&mut self) {
        let len = self.stage_summary().len();
        if len == 0 {
            return;
        }
        let i = match self.stages_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.stages_state.select(Some(i));
    }

    pub fn selected_stage(&self) -> Option<String> {
        let summary = self.stage_summary();
        self.stages_state
            .selected()
            .and_then(|i| summary.get(i).map(|(stage, _, _)| stage.clone()))
    }

    pub fn stats(&self) -> BoardStats {
        let mut stats = BoardStats::default();

        for entry in &self.entries {
            if entry.opt_in_contact {
                stats.opt_in_count += 1;
            }
            if let Some(rating) = entry.overall_rating {
                stats.rated_count += 1;
                stats.rating_total += rating;
            }
        }
        stats.total = self.entries.len();

        stats
    }

    pub fn next(&mut self) {
        let len = self.filtered_entries.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered_entries.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.filtered_entries.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 10).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(10),
            None => 0,
        };
        self.state.select(Some(i));
    }
}

#[derive(Default)]
pub struct BoardStats {
    pub total: usize,
    pub opt_in_count: usize,
    pub rated_count: usize,
    pub rating_total: i64,
}

impl BoardStats {
    pub fn average_rating(&self) -> f64 {
        if self.rated_count == 0 {
            0.0
        } else {
            self.rating_total as f64 / self.rated_count as f64
        }
    }
}

/// Run the live dashboard until the user quits. `state_rx` is the sync
/// component's watch cell; every mutation it publishes shows up on the next
/// frame without user input.
pub fn run_ui(app: &mut App, state_rx: watch::Receiver<ListState>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, state_rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut state_rx: watch::Receiver<ListState>,
) -> io::Result<()> {
    loop {
        // Fold in anything the sync task published since the last frame
        match state_rx.has_changed() {
            Ok(true) => {
                let snapshot = state_rx.borrow_and_update().clone();
                app.refresh(&snapshot);
            }
            Ok(false) => {}
            // Sender gone: the sync component was torn down, keep showing
            // the last snapshot but flag the board as no longer live
            Err(_) => app.live = false,
        }

        terminal.draw(|f| ui(f, app))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter if app.current_page == Page::Stages => {
                    if let Some(stage) = app.selected_stage() {
                        app.apply_filter(FilterType::ByStage(stage));
                        app.current_page = Page::Board;
                    }
                }
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') => {
                    app.clear_filter();
                    app.current_page = Page::Board;
                }
                KeyCode::Char('1') if app.current_page == Page::Views => {
                    app.apply_filter(FilterType::AllEntries);
                    app.current_page = Page::Board;
                }
                KeyCode::Char('2') if app.current_page == Page::Views => {
                    app.apply_filter(FilterType::OptInOnly);
                    app.current_page = Page::Board;
                }
                KeyCode::Char('3') if app.current_page == Page::Views => {
                    app.apply_filter(FilterType::HighRating);
                    app.current_page = Page::Board;
                }
                KeyCode::Char('4') if app.current_page == Page::Views => {
                    app.apply_filter(FilterType::LowRating);
                    app.current_page = Page::Board;
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if app.current_page == Page::Stages {
                        app.stages_next();
                    } else {
                        app.next();
                    }
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    if app.current_page == Page::Stages {
                        app.stages_previous();
                    } else {
                        app.previous();
                    }
                }
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.filtered_entries.is_empty() {
                        app.state.select(Some(app.filtered_entries.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    // Detail panel splits the board page, teaser on the left, full entry on
    // the right
    if app.show_detail && app.current_page == Page::Board {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);

        render_board(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Board => render_board(f, chunks[1], app),
            Page::Stages => render_stages(f, chunks[1], app),
            Page::Views => render_views(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();

    let pages = vec![
        (Page::Board, "Feedback Board"),
        (Page::Stages, "Stages"),
        (Page::Views, "Views"),
    ];

    let mut tab_spans = vec![];
    for (i, (page, name)) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(*name, style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Entries: {}", stats.total),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Avg ★ {:.1}", stats.average_rating()),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  |  "));

    if app.loading {
        tab_spans.push(Span::styled("LOADING", Style::default().fg(Color::Yellow)));
    } else if app.error.is_some() {
        tab_spans.push(Span::styled("ERROR", Style::default().fg(Color::Red)));
    } else if !app.live {
        tab_spans.push(Span::styled("OFFLINE", Style::default().fg(Color::Red)));
    } else if app.missed_events > 0 {
        tab_spans.push(Span::styled(
            format!("STALE ({} missed)", app.missed_events),
            Style::default().fg(Color::Yellow),
        ));
    } else {
        tab_spans.push(Span::styled("● LIVE", Style::default().fg(Color::Green)));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_board(f: &mut Frame, area: Rect, app: &mut App) {
    if app.loading {
        let loading = Paragraph::new("Loading feedback entries...")
            .block(Block::default().borders(Borders::ALL).title(" Feedback Entries "));
        f.render_widget(loading, area);
        return;
    }

    if let Some(msg) = &app.error {
        let error = Paragraph::new(format!("Error: {}", msg))
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(" Feedback Entries "));
        f.render_widget(error, area);
        return;
    }

    if app.filtered_entries.is_empty() {
        let empty = Paragraph::new("No feedback entries found.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" Feedback Entries "));
        f.render_widget(empty, area);
        return;
    }

    let header_cells = ["Created", "Company", "Stage", "★", "Summary"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered_entries.iter().map(|entry| {
        let rating_color = match entry.overall_rating {
            Some(r) if r >= 4 => Color::Green,
            Some(r) if r <= 2 => Color::Red,
            Some(_) => Color::Yellow,
            None => Color::DarkGray,
        };

        let rating = entry
            .overall_rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());

        let cells = vec![
            Cell::from(entry.created_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::from(truncate(&entry.company_name, 24)),
            Cell::from(truncate(&entry.interview_stage, 16)),
            Cell::from(rating).style(Style::default().fg(rating_color)),
            // Teaser only; the full text lives in the detail panel
            Cell::from(truncate(&entry.one_line_summary, 48)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(17),
            Constraint::Length(26),
            Constraint::Length(18),
            Constraint::Length(4),
            Constraint::Min(30),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Feedback Entries "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_stages(f: &mut Frame, area: Rect, app: &mut App) {
    let summary = app.stage_summary();

    let header_cells = ["Stage", "Entries", "Avg Overall"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = summary.iter().map(|(stage, count, avg)| {
        let color = if *avg >= 4.0 {
            Color::Green
        } else if *avg > 0.0 && *avg <= 2.0 {
            Color::Red
        } else {
            Color::White
        };

        let cells = vec![
            Cell::from(stage.clone()),
            Cell::from(format!("{}", count)),
            Cell::from(format!("{:.1}", avg)).style(Style::default().fg(color)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(28),
            Constraint::Length(12),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Stages - Summary by Interview Stage "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.stages_state);
}

fn render_views(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();
    let marker = |filter: &FilterType| {
        if app.active_filter == *filter {
            Span::styled(
                "→",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw(" ")
        }
    };

    let content = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Quick Views & Filters",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("  ╔══════════════════════════════════════════════════╗"),
        Line::from(vec![
            Span::raw("  ║ "),
            marker(&FilterType::AllEntries),
            Span::styled("1", Style::default().fg(Color::Yellow)),
            Span::raw(". All Entries               "),
            Span::styled(
                format!("{:>5}", stats.total),
                Style::default().fg(Color::White),
            ),
            Span::raw("             ║"),
        ]),
        Line::from(vec![
            Span::raw("  ║ "),
            marker(&FilterType::OptInOnly),
            Span::styled("2", Style::default().fg(Color::Yellow)),
            Span::raw(". Opted In To Contact       "),
            Span::styled(
                format!("{:>5}", stats.opt_in_count),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("             ║"),
        ]),
        Line::from(vec![
            Span::raw("  ║ "),
            marker(&FilterType::HighRating),
            Span::styled("3", Style::default().fg(Color::Yellow)),
            Span::raw(". High Rating (4-5)         "),
            Span::styled("    ★", Style::default().fg(Color::Green)),
            Span::raw("             ║"),
        ]),
        Line::from(vec![
            Span::raw("  ║ "),
            marker(&FilterType::LowRating),
            Span::styled("4", Style::default().fg(Color::Yellow)),
            Span::raw(". Low Rating (1-2)          "),
            Span::styled("    ★", Style::default().fg(Color::Red)),
            Span::raw("             ║"),
        ]),
        Line::from("  ╚══════════════════════════════════════════════════╝"),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "  Hint: ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ),
            Span::styled(
                "Press 1-4 to filter, c to clear",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Views - Quick Access Filters "),
    );

    f.render_widget(paragraph, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let entry = match app.selected_entry() {
        Some(e) => e,
        None => {
            let no_selection = Paragraph::new("No entry selected").block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(" Entry Details "),
            );
            f.render_widget(no_selection, area);
            return;
        }
    };

    let label = |text: &str| {
        Span::styled(
            format!("  {}: ", text),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };
    let rating = |value: Option<i64>| match value {
        Some(r) => Span::styled(
            format!("{}/5", r),
            Style::default().fg(if r >= 4 {
                Color::Green
            } else if r <= 2 {
                Color::Red
            } else {
                Color::Yellow
            }),
        ),
        None => Span::styled("n/a", Style::default().fg(Color::DarkGray)),
    };

    let content = vec![
        Line::from(""),
        Line::from(vec![label("Entry ID"), Span::raw(entry.short_id())]),
        Line::from(""),
        Line::from(vec![
            label("Created At"),
            Span::raw(entry.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ]),
        Line::from(""),
        Line::from(vec![label("Company"), Span::raw(&entry.company_name)]),
        Line::from(""),
        Line::from(vec![label("Stage"), Span::raw(&entry.interview_stage)]),
        Line::from(""),
        Line::from(vec![
            label("Duration"),
            Span::raw(&entry.interview_duration),
        ]),
        Line::from(""),
        Line::from(vec![
            label("Experience"),
            Span::raw(&entry.years_experience),
        ]),
        Line::from(""),
        Line::from(vec![label("Overall"), rating(entry.overall_rating)]),
        Line::from(vec![
            label("Communication"),
            rating(entry.communication_rating),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  SUMMARY",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(&entry.one_line_summary, 38),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(""),
        Line::from(vec![label("Positive"), Span::raw("")]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(&entry.positive_aspect, 38),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(""),
        Line::from(vec![label("Frustration"), Span::raw("")]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(&entry.frustration_point, 38),
                Style::default().fg(Color::Red),
            ),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![
            label("Contact"),
            if entry.opt_in_contact {
                Span::styled(&entry.email, Style::default().fg(Color::Green))
            } else {
                Span::styled("not opted in", Style::default().fg(Color::DarkGray))
            },
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Entry Details "),
    );

    f.render_widget(detail_panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.filtered_entries.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if app.active_filter != FilterType::None && app.active_filter != FilterType::AllEntries {
        let filter_name = match &app.active_filter {
            FilterType::OptInOnly => "OPT-IN",
            FilterType::HighRating => "HIGH RATING",
            FilterType::LowRating => "LOW RATING",
            FilterType::ByStage(stage) => stage.as_str(),
            _ => "CUSTOM",
        };
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", filter_name),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Details | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    if text.len() <= width {
        text.to_string()
    } else {
        let mut result = String::new();
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut current_line = String::new();

        for word in words {
            if current_line.len() + word.len() + 1 <= width {
                if !current_line.is_empty() {
                    current_line.push(' ');
                }
                current_line.push_str(word);
            } else {
                if !result.is_empty() {
                    result.push_str("\n  ");
                }
                result.push_str(&current_line);
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            if !result.is_empty() {
                result.push_str("\n  ");
            }
            result.push_str(&current_line);
        }

        result
    }
}

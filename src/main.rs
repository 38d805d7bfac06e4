use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use blaseball_terminal::state::{
    self, AppState, GameSummary, Screen, apply_delta, apply_live_event, apply_schedule,
};
use blaseball_terminal::stats_fetch;
use blaseball_terminal::stream::{self, ShutdownHandle};
use blaseball_terminal::sync::SharedState;
use blaseball_terminal::team_fetch;

struct App {
    state: AppState,
    should_quit: bool,
    shared: Arc<SharedState>,
    watched: Arc<AtomicUsize>,
    tx: mpsc::Sender<state::Delta>,
}

impl App {
    fn new(shared: Arc<SharedState>, watched: Arc<AtomicUsize>, tx: mpsc::Sender<state::Delta>) -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
            shared,
            watched,
            tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.select_game(1),
            KeyCode::Char('k') | KeyCode::Up => self.select_game(-1),
            KeyCode::Char('t') | KeyCode::Char('T') => self.toggle_screen(),
            KeyCode::Esc => self.state.screen = Screen::Live,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn select_game(&mut self, step: i64) {
        let len = self.state.games.len();
        if len == 0 {
            return;
        }
        let next = (self.state.selected_game as i64 + step).rem_euclid(len as i64) as usize;
        if next == self.state.selected_game {
            return;
        }
        self.state.selected_game = next;
        // The stream thread picks the new index up on its next frame, not
        // retroactively.
        self.watched.store(next, Ordering::SeqCst);
        let label = self.state.watched_game().map(GameSummary::label);
        if let Some(label) = label {
            self.state.push_log(format!("[INFO] Tuned in to {label}"));
        }
    }

    fn toggle_screen(&mut self) {
        self.state.screen = match self.state.screen {
            Screen::Live => Screen::Teams,
            Screen::Teams => Screen::Live,
        };
    }

    /// Per-tick drain of the handoff cell. Only this method (on the render
    /// loop) consumes it.
    fn drain_handoff(&mut self) {
        if let Some(snapshot) = self.shared.take_schedule()
            && apply_schedule(&mut self.state, snapshot)
        {
            // The selector may have been clamped back to game 0.
            self.watched
                .store(self.state.selected_game, Ordering::SeqCst);
            let day = self.state.day.unwrap_or_default();
            let games = self.state.games.len();
            self.state
                .push_log(format!("[INFO] Day {day}: {games} games on the slate"));
        }

        if let Some(event) = self.shared.take_event()
            && let Some(request) = apply_live_event(&mut self.state, event)
        {
            stats_fetch::spawn_stats_fetch(self.tx.clone(), request);
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let shared = Arc::new(SharedState::new());
    let watched = Arc::new(AtomicUsize::new(0));
    let shutdown = ShutdownHandle::new();
    let (tx, rx) = mpsc::channel();

    stream::spawn_supervisor(
        Arc::clone(&shared),
        Arc::clone(&watched),
        tx.clone(),
        shutdown.clone(),
    );
    team_fetch::spawn_team_fetch(tx.clone());

    let mut app = App::new(shared, watched, tx);
    let res = run_app(&mut terminal, &mut app, rx);

    // Close the stream before tearing the terminal down; close is idempotent
    // and the fetch threads die with the process.
    shutdown.close();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn render_tick_rate() -> Duration {
    let ms = std::env::var("RENDER_TICK_MS")
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(100)
        .clamp(20, 1000);
    Duration::from_millis(ms)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = render_tick_rate();
    let mut last_tick = Instant::now();

    loop {
        app.drain_handoff();
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(&app.state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Live => render_live(frame, chunks[1], &app.state),
        Screen::Teams => render_teams(frame, chunks[1], &app.state),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer =
        Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let day = state
        .day
        .map(|d| format!("Day {d}"))
        .unwrap_or_else(|| "Day --".to_string());
    let watched = state
        .watched_game()
        .map(GameSummary::label)
        .unwrap_or_else(|| "no game".to_string());
    format!(
        "BLASEBALL TERMINAL | {day} | {watched} | stream: {}",
        state.stream_phase.label()
    )
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Live => {
            "j/k/↑/↓ Tune game | t Teams | ? Help | q Quit".to_string()
        }
        Screen::Teams => "t/Esc Back | ? Help | q Quit".to_string(),
    }
}

fn render_live(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(40),
            Constraint::Min(30),
            Constraint::Length(30),
        ])
        .split(area);

    let games = Paragraph::new(game_list_text(state))
        .block(Block::default().title("Games").borders(Borders::ALL));
    frame.render_widget(games, columns[0]);

    let middle = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(1)])
        .split(columns[1]);

    let situation = Paragraph::new(situation_text(state))
        .block(Block::default().title("Situation").borders(Borders::ALL));
    frame.render_widget(situation, middle[0]);

    let plays = Paragraph::new(play_log_text(state, middle[1]))
        .block(Block::default().title("Play Log").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(plays, middle[1]);

    let batter = Paragraph::new(batter_text(state))
        .block(Block::default().title("At Bat").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(batter, columns[2]);
}

fn game_list_text(state: &AppState) -> String {
    if state.games.is_empty() {
        return "Waiting for today's schedule".to_string();
    }
    state
        .games
        .iter()
        .enumerate()
        .map(|(idx, game)| {
            let prefix = if idx == state.selected_game { "> " } else { "  " };
            format!("{prefix}{}", game.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn situation_text(state: &AppState) -> String {
    let Some(event) = &state.current else {
        return "No event yet".to_string();
    };
    let mut lines = vec![
        state::inning_label(event),
        state::weather_label(event.weather_code),
        state::count_label(event.count),
    ];
    let bases = state::bases_lines(event);
    if bases.is_empty() {
        lines.push("Bases empty".to_string());
    } else {
        lines.extend(bases);
    }
    lines.join("\n")
}

fn play_log_text(state: &AppState, area: Rect) -> String {
    if state.plays.is_empty() {
        return "Waiting for the first play".to_string();
    }
    let visible = (area.height.saturating_sub(2) as usize).max(1);
    let start = state.plays.len().saturating_sub(visible);
    state
        .plays
        .iter()
        .skip(start)
        .map(|row| format!("{:>4}  {}", row.sequence, row.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn batter_text(state: &AppState) -> String {
    let Some(panel) = &state.batter else {
        return "(unknown player)".to_string();
    };
    let stats = match &panel.stats {
        Some(stats) => format!("AVG: {:.3}\nHR: {}", stats.batting_average, stats.home_runs),
        None => "AVG: --\nHR: --".to_string(),
    };
    format!("{} ({})\n{stats}", panel.player_name, panel.player_id)
}

fn render_teams(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(game) = state.watched_game() else {
        let empty = Paragraph::new("No game selected")
            .block(Block::default().title("Teams").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_team_card(frame, columns[0], state, &game.away_team_name, "Away");
    render_team_card(frame, columns[1], state, &game.home_team_name, "Home");
}

fn render_team_card(frame: &mut Frame, area: Rect, state: &AppState, name: &str, side: &str) {
    let text = match state.teams.get(name) {
        Some(team) => format!(
            "{}\n{}\n{}",
            team.full_name,
            team.team_slogan.as_deref().unwrap_or("(slogan)"),
            team.division.as_deref().unwrap_or("(division)"),
        ),
        None => format!("{name}\n(slogan)\n(division)"),
    };
    let card = Paragraph::new(text)
        .block(Block::default().title(side.to_string()).borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(card, area);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(50, 50, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Blaseball Terminal - Help",
        "",
        "  j/k or ↑/↓   Tune in to another game",
        "  t            Toggle team viewer",
        "  Esc          Back to live view",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Game changes apply from the next stream message.",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

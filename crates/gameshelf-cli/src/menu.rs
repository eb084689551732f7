//! Interactive game selection menu

use crate::commands::Shelf;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use gameshelf_library::Game;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io;
use std::time::Duration;
use tracing::{error, info};

/// Current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Games,
    GameInfo,
}

/// Menu state
pub struct App {
    shelf: Shelf,

    view: View,

    games_state: ListState,

    /// Catalog rows, in ID order
    games: Vec<Game>,

    status: String,

    /// Game to launch once the terminal is handed back
    pending_launch: Option<i64>,

    should_quit: bool,
}

impl App {
    pub fn new(shelf: Shelf) -> Result<Self> {
        let mut app = Self {
            shelf,
            view: View::Games,
            games_state: ListState::default(),
            games: Vec::new(),
            status: "Ready".to_string(),
            pending_launch: None,
            should_quit: false,
        };
        app.reload()?;
        Ok(app)
    }

    /// Re-read the catalog, keeping the selection in range
    fn reload(&mut self) -> Result<()> {
        self.games = self.shelf.store.list()?;

        let selected = match (self.games_state.selected(), self.games.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
        self.games_state.select(selected);
        Ok(())
    }

    fn handle_input(&mut self, key: KeyCode) -> Result<()> {
        match self.view {
            View::Games => self.handle_games_input(key)?,
            View::GameInfo => self.handle_game_info_input(key)?,
        }
        Ok(())
    }

    fn handle_games_input(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Up | KeyCode::Char('w') => self.select_prev_game(),
            KeyCode::Down | KeyCode::Char('s') => self.select_next_game(),
            KeyCode::Enter => self.request_launch(),
            KeyCode::Char('x') => {
                if self.selected_game().is_some() {
                    self.view = View::GameInfo;
                }
            }
            KeyCode::Char('d') => self.delete_selected_game()?,
            KeyCode::Char('r') => self.rescan()?,
            KeyCode::Char('e') => self.scan_epic()?,
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn handle_game_info_input(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Enter => self.request_launch(),
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                self.view = View::Games;
            }
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn select_prev_game(&mut self) {
        if self.games.is_empty() {
            return;
        }

        let i = match self.games_state.selected() {
            Some(0) | None => self.games.len() - 1,
            Some(i) => i - 1,
        };
        self.games_state.select(Some(i));
    }

    fn select_next_game(&mut self) {
        if self.games.is_empty() {
            return;
        }

        let i = match self.games_state.selected() {
            Some(i) if i + 1 < self.games.len() => i + 1,
            _ => 0,
        };
        self.games_state.select(Some(i));
    }

    fn selected_game(&self) -> Option<&Game> {
        self.games_state.selected().and_then(|i| self.games.get(i))
    }

    fn request_launch(&mut self) {
        if let Some((status, id)) = self
            .selected_game()
            .map(|game| (format!("Launching {}...", game.title), game.id))
        {
            self.status = status;
            self.pending_launch = Some(id);
        }
    }

    fn take_pending_launch(&mut self) -> Option<i64> {
        self.pending_launch.take()
    }

    /// Launch a game, waiting for executables to exit
    fn launch(&mut self, id: i64) {
        let title = self
            .games
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.title.clone())
            .unwrap_or_else(|| id.to_string());

        match self.shelf.executor.run(&self.shelf.store, id) {
            Ok(()) => {
                info!("Finished {}", title);
                self.status = format!("Played {}", title);
            }
            Err(e) => {
                error!("Failed to launch {}: {}", title, e);
                self.status = format!("Error: {}", e);
            }
        }
    }

    fn delete_selected_game(&mut self) -> Result<()> {
        let Some(game) = self.selected_game() else {
            return Ok(());
        };
        let (id, title) = (game.id, game.title.clone());

        self.shelf.store.delete(id)?;
        self.status = format!("Deleted {}", title);
        self.reload()
    }

    fn rescan(&mut self) -> Result<()> {
        match self.shelf.scan(None) {
            Ok(report) if report.nothing_found() => self.status = "No games found".to_string(),
            Ok(report) => self.status = format!("Added {} games", report.games_added),
            Err(e) => {
                error!("Scan failed: {:#}", e);
                self.status = format!("Error: {}", e);
            }
        }
        self.reload()
    }

    fn scan_epic(&mut self) -> Result<()> {
        let platforms = self.shelf.platforms();
        match platforms.scan_epic(&mut self.shelf.store) {
            Ok(0) => self.status = "No new Epic games".to_string(),
            Ok(added) => self.status = format!("Added {} Epic games", added),
            Err(e) => {
                error!("Epic scan failed: {}", e);
                self.status = format!("Error: {}", e);
            }
        }
        self.reload()
    }
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], app);

    match app.view {
        View::Games => draw_games_view(frame, chunks[1], app),
        View::GameInfo => draw_game_info_view(frame, chunks[1], app),
    }

    draw_footer(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let title = match app.view {
        View::Games => format!("Gameshelf - {} games", app.games.len()),
        View::GameInfo => "Gameshelf - Game Info".to_string(),
    };

    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn draw_games_view(frame: &mut Frame, area: Rect, app: &mut App) {
    let items: Vec<ListItem> = app
        .games
        .iter()
        .map(|game| ListItem::new(format!("{:>3}  {}", game.id, game.title)))
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Games"))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.games_state);
}

fn draw_game_info_view(frame: &mut Frame, area: Rect, app: &App) {
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let content = match app.selected_game() {
        Some(game) => {
            let mut lines = vec![
                Line::from(vec![Span::styled("Title: ", bold), Span::raw(&game.title)]),
                Line::from(vec![
                    Span::styled("ID: ", bold),
                    Span::raw(game.id.to_string()),
                ]),
                Line::from(vec![
                    Span::styled("Target: ", bold),
                    Span::raw(&game.launch_target),
                ]),
                Line::from(vec![Span::styled("Added: ", bold), Span::raw(&game.added_at)]),
            ];

            if let Some(cover) = &game.cover_art_name {
                lines.push(Line::from(vec![
                    Span::styled("Cover art: ", bold),
                    Span::raw(cover),
                ]));
            }

            Text::from(lines)
        }
        None => Text::raw("No game selected"),
    };

    let paragraph = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title("Game Info"))
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.view {
        View::Games => "[↑↓] Navigate  [Enter] Launch  [X] Info  [D] Delete  [R] Rescan  [E] Epic  [Q] Quit",
        View::GameInfo => "[Enter] Launch  [B] Back",
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));

    let status = Paragraph::new(app.status.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(help, chunks[0]);
    frame.render_widget(status, chunks[1]);
}

/// Take over the terminal until the user quits
pub fn run(shelf: Shelf) -> Result<()> {
    let mut app = App::new(shelf)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    while !app.should_quit {
        terminal.draw(|f| draw_ui(f, app))?;

        if let Some(id) = app.take_pending_launch() {
            // The game gets the real terminal while it runs
            disable_raw_mode()?;
            execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

            app.launch(id);

            execute!(terminal.backend_mut(), EnterAlternateScreen)?;
            enable_raw_mode()?;
            terminal.clear()?;
            continue;
        }

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_input(key.code)?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gameshelf_config::{ConfigHandle, LauncherConfig};
    use tempfile::TempDir;

    fn app(dir: &TempDir, titles: &[&str]) -> App {
        let config = LauncherConfig {
            db_path: dir.path().join("launcher.db"),
            scan_directory: dir.path().join("games"),
            ..Default::default()
        };
        let mut shelf = Shelf::open(ConfigHandle::new(config)).unwrap();
        for title in titles {
            shelf
                .store
                .add(title, &format!("/missing/{}.exe", title), None)
                .unwrap();
        }
        App::new(shelf).unwrap()
    }

    #[test]
    fn test_navigation_wraps() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, &["A", "B", "C"]);
        assert_eq!(app.games_state.selected(), Some(0));

        app.handle_input(KeyCode::Up).unwrap();
        assert_eq!(app.games_state.selected(), Some(2));
        app.handle_input(KeyCode::Down).unwrap();
        assert_eq!(app.games_state.selected(), Some(0));
    }

    #[test]
    fn test_delete_reloads_and_clamps() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, &["A", "B"]);
        app.handle_input(KeyCode::Down).unwrap();

        app.handle_input(KeyCode::Char('d')).unwrap();
        assert_eq!(app.games.len(), 1);
        assert_eq!(app.games[0].title, "A");
        assert_eq!(app.games_state.selected(), Some(0));
        assert_eq!(app.status, "Deleted B");
    }

    #[test]
    fn test_enter_defers_launch_to_event_loop() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, &["A", "Ghost"]);
        app.handle_input(KeyCode::Down).unwrap();

        app.handle_input(KeyCode::Enter).unwrap();
        assert_eq!(app.status, "Launching Ghost...");
        assert_eq!(app.take_pending_launch(), Some(2));
        assert_eq!(app.take_pending_launch(), None);
    }

    #[test]
    fn test_failed_launch_sets_status() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, &["Ghost"]);

        app.handle_input(KeyCode::Enter).unwrap();
        let id = app.take_pending_launch().unwrap();
        app.launch(id);
        assert!(app.status.starts_with("Error:"));
        assert!(!app.should_quit);
    }

    #[test]
    fn test_rescan_missing_directory_reports_error() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, &[]);

        app.handle_input(KeyCode::Char('r')).unwrap();
        assert!(app.status.starts_with("Error:"));
        assert!(app.games_state.selected().is_none());
    }

    #[test]
    fn test_quit() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, &[]);
        app.handle_input(KeyCode::Char('q')).unwrap();
        assert!(app.should_quit);
    }
}

use std::{cmp, io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use flightgame_core::{
    save::{SaveEntry, SaveManager},
    game::GameStatus,
    stats::record_outcome,
    Airport, Difficulty, GameEngine, GameState, Outcome, RankedAirport, StatsStore,
};
use rand::rngs::StdRng;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_NAME_LEN: usize = 32;
const DEFAULT_PLAYER: &str = "Player";
const MENU_ITEMS: [&str; 3] = ["New Game", "Continue", "Quit"];
const TITLE: [&str; 2] = ["F L I G H T   G A M E", "hop between airports before the clock runs out"];

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Menu,
    Continue,
    Picker,
    Play,
}

/// Single-line text input for the player name. The cursor counts chars.
#[derive(Debug, Clone)]
struct NamePrompt {
    input: String,
    cursor: usize,
    default: String,
}

impl NamePrompt {
    fn new(default: String) -> Self {
        Self {
            cursor: default.chars().count(),
            input: default.clone(),
            default,
        }
    }

    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.char_len() as isize) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn insert(&mut self, ch: char) {
        if self.char_len() >= MAX_NAME_LEN || ch.is_control() {
            return;
        }
        let idx = self.byte_index();
        self.input.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    fn value(&self) -> String {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            self.default.clone()
        } else {
            trimmed.to_string()
        }
    }
}

/// Filterable list of eligible start airports.
#[derive(Debug, Clone)]
struct StartPicker {
    player: String,
    airports: Vec<Airport>,
    filtered: Vec<usize>,
    filter: String,
    cursor: usize,
    offset: usize,
    difficulty: Difficulty,
}

impl StartPicker {
    fn new(player: String, mut airports: Vec<Airport>) -> Self {
        airports.sort_by(|a, b| a.ident.cmp(&b.ident));
        let mut picker = Self {
            player,
            airports,
            filtered: Vec::new(),
            filter: String::new(),
            cursor: 0,
            offset: 0,
            difficulty: Difficulty::default(),
        };
        picker.apply_filter();
        picker
    }

    fn apply_filter(&mut self) {
        let needle = self.filter.trim().to_lowercase();
        self.filtered = self
            .airports
            .iter()
            .enumerate()
            .filter(|(_, airport)| airport_matches(airport, &needle))
            .map(|(idx, _)| idx)
            .collect();
        self.cursor = self.cursor.min(self.filtered.len().saturating_sub(1));
    }

    fn push_filter(&mut self, ch: char) {
        self.filter.push(ch);
        self.cursor = 0;
        self.offset = 0;
        self.apply_filter();
    }

    fn pop_filter(&mut self) {
        self.filter.pop();
        self.apply_filter();
    }

    fn selected(&self) -> Option<&Airport> {
        self.filtered
            .get(self.cursor)
            .and_then(|idx| self.airports.get(*idx))
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.filtered.len() as isize - 1) as usize;
    }

    fn ensure_visible(&mut self, height: usize) {
        let height = height.max(1);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
        self.offset = self.offset.min(self.filtered.len().saturating_sub(height));
    }

    fn cycle_difficulty(&mut self) {
        let idx = Difficulty::ALL
            .iter()
            .position(|difficulty| *difficulty == self.difficulty)
            .unwrap_or(0);
        self.difficulty = Difficulty::ALL[(idx + 1) % Difficulty::ALL.len()];
    }
}

fn airport_matches(airport: &Airport, needle: &str) -> bool {
    needle.is_empty()
        || airport.ident.to_lowercase().contains(needle)
        || airport.name.to_lowercase().contains(needle)
}

#[derive(Debug, Clone)]
struct LastHop {
    destination: String,
    distance: f64,
    flight_time: f64,
    outcome: Outcome,
}

/// A game in progress together with its save file and destination list.
#[derive(Debug, Clone)]
struct PlayState {
    game: GameState,
    save: Option<SaveEntry>,
    rows: Vec<RankedAirport>,
    reachable_only: bool,
    cursor: usize,
    last_hop: Option<LastHop>,
}

impl PlayState {
    fn new(game: GameState, save: Option<SaveEntry>) -> Self {
        Self {
            game,
            save,
            rows: Vec::new(),
            reachable_only: false,
            cursor: 0,
            last_hop: None,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.rows.len() as isize - 1) as usize;
    }

    fn selected(&self) -> Option<&RankedAirport> {
        self.rows.get(self.cursor)
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal client playing against an in-process [`GameEngine`].
pub struct FlightApp {
    engine: GameEngine,
    stats: Arc<dyn StatsStore>,
    save_manager: SaveManager,
    saves: Vec<SaveEntry>,
    rng: StdRng,
    screen: Screen,
    ui: UiState,
    name_prompt: Option<NamePrompt>,
    picker: Option<StartPicker>,
    play: Option<PlayState>,
    theme: Theme,
}

impl FlightApp {
    pub fn new(
        engine: GameEngine,
        stats: Arc<dyn StatsStore>,
        save_manager: SaveManager,
        rng: StdRng,
    ) -> Self {
        Self {
            engine,
            stats,
            save_manager,
            saves: Vec::new(),
            rng,
            screen: Screen::Menu,
            ui: UiState::default(),
            name_prompt: None,
            picker: None,
            play: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        match self.refresh_saves() {
            Ok(()) => {
                let active = self.saves.iter().filter(|entry| !entry.finished).count();
                self.ui.set_status(format!(
                    "{} airports available • {active} game(s) in progress",
                    self.engine.directory().eligible().len()
                ));
            }
            Err(err) => self.ui.set_status(format!("Failed to load saves: {err}")),
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let result = self.event_loop(&mut terminal, event_rx).await;
        restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut event_rx: mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.ui.should_quit {
                break;
            }
            match event_rx.recv().await {
                Some(AppEvent::Input(event)) => {
                    if let Err(err) = self.handle_input(event) {
                        error!(?err, "Input handling failed");
                        self.ui.set_status(format!("Error: {err}"));
                    }
                }
                Some(AppEvent::Tick) => {}
                None => break,
            }
        }
        Ok(())
    }

    fn refresh_saves(&mut self) -> Result<()> {
        self.saves = self.save_manager.entries()?;
        Ok(())
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.ui.should_quit = true;
            return Ok(());
        }
        if self.name_prompt.is_some() {
            return self.handle_name_prompt_key(key);
        }
        match self.screen {
            Screen::Menu => self.handle_menu_key(key),
            Screen::Continue => self.handle_continue_key(key),
            Screen::Picker => self.handle_picker_key(key),
            Screen::Play => self.handle_play_key(key),
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.ui.should_quit = true;
            }
            KeyCode::Char('j') | KeyCode::Down => self.ui.move_menu_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.ui.move_menu_cursor(-1),
            KeyCode::Enter => match self.ui.menu_cursor {
                0 => self.prompt_new_game(),
                1 => self.open_continue(),
                2 => self.ui.should_quit = true,
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn prompt_new_game(&mut self) {
        let default = self
            .saves
            .first()
            .map(|entry| entry.player_name.clone())
            .unwrap_or_else(|| DEFAULT_PLAYER.to_string());
        self.name_prompt = Some(NamePrompt::new(default));
        self.ui.set_status("Enter your name".to_string());
    }

    fn handle_name_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(prompt) = self.name_prompt.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.name_prompt = None;
                self.ui.set_status("New game cancelled".to_string());
            }
            KeyCode::Enter => {
                let name = prompt.value();
                self.name_prompt = None;
                self.open_picker(name);
            }
            KeyCode::Left => prompt.move_cursor(-1),
            KeyCode::Right => prompt.move_cursor(1),
            KeyCode::Home => prompt.move_home(),
            KeyCode::End => prompt.move_end(),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    prompt.insert(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open_picker(&mut self, player: String) {
        let airports = self.engine.directory().eligible();
        if airports.is_empty() {
            self.ui
                .set_status("No eligible airports in the directory".to_string());
            return;
        }
        self.ui
            .set_status(format!("Choose a starting airport for {player}"));
        self.picker = Some(StartPicker::new(player, airports));
        self.screen = Screen::Picker;
    }

    fn handle_picker_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(picker) = self.picker.as_mut() else {
            self.screen = Screen::Menu;
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.picker = None;
                self.screen = Screen::Menu;
                self.ui.set_status("New game cancelled".to_string());
            }
            KeyCode::Down => picker.move_cursor(1),
            KeyCode::Up => picker.move_cursor(-1),
            KeyCode::PageDown => picker.move_cursor(self.ui.list_height.max(1) as isize),
            KeyCode::PageUp => picker.move_cursor(-(self.ui.list_height.max(1) as isize)),
            KeyCode::Tab => {
                picker.cycle_difficulty();
                let budget = self.engine.rules().budget_for(picker.difficulty);
                self.ui.set_status(format!(
                    "Difficulty {}: {:.0} min / {:.0} km",
                    picker.difficulty, budget.time, budget.distance
                ));
            }
            KeyCode::Backspace => picker.pop_filter(),
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    picker.push_filter(ch);
                }
            }
            KeyCode::Enter => self.start_game(),
            _ => {}
        }
        Ok(())
    }

    fn start_game(&mut self) {
        let Some(picker) = self.picker.as_ref() else {
            return;
        };
        let Some(airport) = picker.selected() else {
            self.ui
                .set_status("No airport matches the filter".to_string());
            return;
        };
        let start = airport.ident.clone();
        let player = picker.player.clone();
        let difficulty = picker.difficulty;

        let new_game = match self
            .engine
            .start_game(&player, &start, difficulty, &mut self.rng)
        {
            Ok(new_game) => new_game,
            Err(err) => {
                warn!(%player, %start, "Could not start game: {err}");
                self.ui.set_status(format!("Could not start game: {err}"));
                return;
            }
        };
        self.picker = None;

        let goals = new_game.state.goal_airports.join(", ");
        let mut play = PlayState::new(new_game.state, None);
        play.rows = new_game.locations;
        let mut status = format!("Departing {start}. Reach: {goals}");
        if let Err(err) = self.autosave(&mut play) {
            status = format!("{status} (save failed: {err})");
        }
        self.ui.set_status(status);
        self.play = Some(play);
        self.screen = Screen::Play;
    }

    fn open_continue(&mut self) {
        match self.refresh_saves() {
            Ok(()) => {
                self.screen = Screen::Continue;
                self.ui
                    .move_continue_cursor(0, self.saves.len(), self.ui.list_height.max(1));
                if self.saves.is_empty() {
                    self.ui.set_status("No saves available".to_string());
                } else {
                    self.ui.set_status("Select a game to continue".to_string());
                }
            }
            Err(err) => self.ui.set_status(format!("Failed to load saves: {err}")),
        }
    }

    fn handle_continue_key(&mut self, key: KeyEvent) -> Result<()> {
        let total = self.saves.len();
        let visible = self.ui.list_height.max(1);
        match key.code {
            KeyCode::Esc => {
                self.screen = Screen::Menu;
                self.ui.set_status("Returned to main menu".to_string());
            }
            KeyCode::Char('j') | KeyCode::Down => self.ui.move_continue_cursor(1, total, visible),
            KeyCode::Char('k') | KeyCode::Up => self.ui.move_continue_cursor(-1, total, visible),
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(entry) = self.saves.get(self.ui.continue_cursor).cloned() {
                    self.save_manager.remove(&entry)?;
                    self.refresh_saves()?;
                    self.ui
                        .move_continue_cursor(0, self.saves.len(), visible);
                    self.ui
                        .set_status(format!("Deleted save for {}", entry.player_name));
                }
            }
            KeyCode::Enter => {
                if let Some(entry) = self.saves.get(self.ui.continue_cursor).cloned() {
                    self.resume(entry)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn resume(&mut self, entry: SaveEntry) -> Result<()> {
        let game = self.save_manager.load(&entry)?.into_state();
        info!(player = %game.player_name, at = %game.current_airport, "Resuming game");
        let finished = game.is_finished();
        let mut play = PlayState::new(game, Some(entry));
        self.refresh_rows(&mut play);
        if finished {
            self.ui
                .set_status("This game is already finished".to_string());
        } else {
            self.ui.set_status(format!(
                "Welcome back, {}. Goals left: {}",
                play.game.player_name,
                play.game.goal_airports.join(", ")
            ));
        }
        self.play = Some(play);
        self.screen = Screen::Play;
        Ok(())
    }

    fn handle_play_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(mut play) = self.play.take() else {
            self.screen = Screen::Menu;
            return Ok(());
        };

        if play.game.is_finished() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                self.leave_play();
            } else {
                self.play = Some(play);
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.play = Some(play);
                self.leave_play();
                return Ok(());
            }
            KeyCode::Char('j') | KeyCode::Down => play.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => play.move_cursor(-1),
            KeyCode::Char('r') => {
                play.reachable_only = !play.reachable_only;
                play.cursor = 0;
                self.refresh_rows(&mut play);
                self.ui.set_status(if play.reachable_only {
                    "Showing reachable destinations".to_string()
                } else {
                    "Showing nearest airports".to_string()
                });
            }
            KeyCode::Enter => match play.selected().cloned() {
                Some(row) if row.active => {
                    self.ui.set_status(format!("You are already at {}", row.id));
                }
                Some(row) => self.fly(&mut play, &row.id),
                None => self.ui.set_status("No destination selected".to_string()),
            },
            _ => {}
        }
        self.play = Some(play);
        Ok(())
    }

    fn fly(&mut self, play: &mut PlayState, destination: &str) {
        let report = match self.engine.fly_to(&mut play.game, destination) {
            Ok(report) => report,
            Err(err) => {
                self.ui.set_status(format!("Cannot fly to {destination}: {err}"));
                return;
            }
        };
        record_outcome(self.stats.as_ref(), &play.game, &report);

        let mut status = match report.outcome {
            Outcome::Continue => format!(
                "Landed at {} after {:.0} km",
                report.destination, report.distance
            ),
            Outcome::GoalReached => format!(
                "Goal reached: {}. Remaining: {}",
                report.destination,
                play.game.goal_airports.join(", ")
            ),
            Outcome::Victory => format!(
                "Victory! All goals reached in {} hops. Press Enter to return",
                play.game.hops()
            ),
            Outcome::Restart => {
                "Out of time or distance. Back to the start with fresh budgets".to_string()
            }
            Outcome::Stranded => format!(
                "Game over: no airport is within reach of {}. Press Enter to return",
                play.game.current_airport
            ),
        };
        play.last_hop = report.flown.then(|| LastHop {
            destination: report.destination.clone(),
            distance: report.distance,
            flight_time: report.flight_time,
            outcome: report.outcome,
        });
        play.cursor = 0;
        if play.reachable_only {
            self.refresh_rows(play);
        } else {
            play.rows = report.locations;
        }
        if let Err(err) = self.autosave(play) {
            status = format!("{status} (save failed: {err})");
        }
        self.ui.set_status(status);
    }

    fn refresh_rows(&mut self, play: &mut PlayState) {
        let rows = if play.reachable_only {
            self.engine.reachable(&play.game)
        } else {
            self.engine.locations(&play.game)
        };
        match rows {
            Ok(rows) => {
                play.rows = rows;
                play.move_cursor(0);
            }
            Err(err) => {
                play.rows.clear();
                self.ui.set_status(format!("Failed to list airports: {err}"));
            }
        }
    }

    fn autosave(&self, play: &mut PlayState) -> Result<()> {
        let result = match play.save.as_ref() {
            Some(entry) => self.save_manager.update_save(entry, &play.game),
            None => self.save_manager.create_save(&play.game),
        };
        match result {
            Ok(entry) => {
                play.save = Some(entry);
                Ok(())
            }
            Err(err) => {
                error!(?err, "Autosave failed");
                Err(err)
            }
        }
    }

    fn leave_play(&mut self) {
        if let Some(play) = self.play.take() {
            info!(player = %play.game.player_name, "Left game");
        }
        if let Err(err) = self.refresh_saves() {
            warn!("Failed to refresh saves: {err}");
        }
        self.screen = Screen::Menu;
        self.ui.set_status("Game saved".to_string());
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Menu => self.draw_menu(frame),
            Screen::Continue => self.draw_continue(frame),
            Screen::Picker => self.draw_picker(frame),
            Screen::Play => self.draw_play(frame),
        }
        if let Some(prompt) = &self.name_prompt {
            self.render_name_prompt(frame, prompt);
        }
    }

    fn draw_menu(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5.min(area.height)),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(area);

        let title: Vec<Line> = TITLE
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let style = if idx == 0 {
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.muted)
                };
                Line::from(Span::styled(*line, style))
            })
            .collect();
        let banner = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(banner, layout[0]);

        let menu_height = (MENU_ITEMS.len() as u16)
            .saturating_mul(2)
            .saturating_add(2)
            .min(layout[1].height);
        let menu_width = 28.min(layout[1].width.max(1));
        let menu_area = centered_rect(menu_width, menu_height, layout[1]);

        let menu_lines: Vec<Line> = MENU_ITEMS
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                if idx == self.ui.menu_cursor {
                    Line::from(Span::styled(
                        format!("▶ {item}"),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(Span::styled(
                        format!("  {item}"),
                        Style::default().fg(self.theme.primary_fg),
                    ))
                }
            })
            .collect();

        let menu = Paragraph::new(menu_lines)
            .block(Block::default().borders(Borders::ALL).title("Menu"))
            .alignment(Alignment::Center);
        frame.render_widget(menu, menu_area);
        self.render_status(frame, layout[2]);
    }

    fn draw_continue(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(area);

        let visible = (chunks[0].height.saturating_sub(2) as usize).max(1);
        self.ui.list_height = visible;
        let total = self.saves.len();
        self.ui.move_continue_cursor(0, total, visible);

        let mut list_state = ListState::default();
        let items: Vec<ListItem> = if total == 0 {
            vec![ListItem::new(Line::from("  No saves found"))]
        } else {
            list_state.select(Some(
                self.ui.continue_cursor.saturating_sub(self.ui.continue_offset),
            ));
            let end = cmp::min(self.ui.continue_offset + visible, total);
            self.saves[self.ui.continue_offset..end]
                .iter()
                .map(|entry| {
                    let state = if entry.finished {
                        Span::styled(" finished ", Style::default().fg(self.theme.success))
                    } else {
                        Span::styled(" in flight", Style::default().fg(self.theme.warning))
                    };
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("{:<20} at {:<6}", entry.player_name, entry.current_airport)),
                        state,
                        Span::styled(
                            format!("  [{}]", entry.updated_at.format("%Y-%m-%d %H:%M")),
                            Style::default().fg(self.theme.muted),
                        ),
                    ]))
                })
                .collect()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Continue  (Enter resume · d delete · Esc back)"),
            )
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, chunks[0], &mut list_state);
        self.render_status(frame, chunks[1]);
    }

    fn draw_picker(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let visible = body[0].height.saturating_sub(2) as usize;
        self.ui.list_height = visible;
        let theme = self.theme.clone();
        let rules = self.engine.rules().clone();
        let Some(picker) = self.picker.as_mut() else {
            return;
        };
        picker.ensure_visible(visible);

        let filter = Paragraph::new(Line::from(vec![
            Span::styled("Filter: ", Style::default().fg(theme.accent)),
            Span::raw(picker.filter.clone()),
        ]))
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Start airport for {}  (type to filter · Tab difficulty · Esc back)",
            picker.player
        )));
        frame.render_widget(filter, rows[0]);

        let mut list_state = ListState::default();
        let end = cmp::min(picker.offset + visible.max(1), picker.filtered.len());
        let items: Vec<ListItem> = picker.filtered[picker.offset..end]
            .iter()
            .filter_map(|idx| picker.airports.get(*idx))
            .map(|airport| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<6}", airport.ident),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(airport.name.clone()),
                ]))
            })
            .collect();
        if !items.is_empty() {
            list_state.select(Some(picker.cursor.saturating_sub(picker.offset)));
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Airports ({}/{})",
                picker.filtered.len(),
                picker.airports.len()
            )))
            .highlight_style(Style::default().bg(theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, body[0], &mut list_state);

        let budget = rules.budget_for(picker.difficulty);
        let mut details = vec![
            Line::from(vec![
                Span::styled("Difficulty: ", Style::default().fg(theme.accent)),
                Span::raw(picker.difficulty.to_string()),
            ]),
            Line::from(format!("Time budget: {}", format_minutes(budget.time))),
            Line::from(format!("Distance budget: {:.0} km", budget.distance)),
            Line::from(format!("Goals to reach: {}", rules.goal_count.max(1))),
            Line::from(""),
        ];
        if let Some(airport) = picker.selected() {
            details.push(Line::from(Span::styled(
                airport.display_name(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            details.push(Line::from(format!(
                "{:.4}, {:.4}  {}",
                airport.latitude, airport.longitude, airport.iso_country
            )));
        }
        let details = Paragraph::new(details)
            .block(Block::default().borders(Borders::ALL).title("Details"))
            .wrap(Wrap { trim: true });
        frame.render_widget(details, body[1]);

        self.render_status(frame, rows[2]);
    }

    fn draw_play(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let Some(play) = self.play.as_ref() else {
            let paragraph = Paragraph::new("No game loaded")
                .block(Block::default().borders(Borders::ALL).title("Play"))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(3)])
            .split(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
            .split(rows[0]);
        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(6),
            ])
            .split(columns[1]);

        self.render_destinations(frame, columns[0], play);
        self.render_budget_gauge(
            frame,
            side[0],
            "Time",
            play.game.remaining_time,
            play.game.starting_budget.time,
            format_minutes(play.game.remaining_time),
        );
        self.render_budget_gauge(
            frame,
            side[1],
            "Distance",
            play.game.remaining_distance,
            play.game.starting_budget.distance,
            format!("{:.0} km", play.game.remaining_distance),
        );
        self.render_play_info(frame, side[2], play);
        self.render_status(frame, rows[1]);
    }

    fn render_destinations(&self, frame: &mut Frame, area: Rect, play: &PlayState) {
        let items: Vec<ListItem> = play
            .rows
            .iter()
            .map(|row| {
                let mut style = Style::default().fg(self.theme.primary_fg);
                if !row.reachable {
                    style = style.fg(self.theme.muted);
                }
                if play.game.is_goal(&row.id) {
                    style = style.fg(self.theme.warning).add_modifier(Modifier::BOLD);
                }
                let marker = if row.active {
                    "◉"
                } else if play.game.is_goal(&row.id) {
                    "★"
                } else if play.game.has_visited(&row.id) {
                    "·"
                } else {
                    " "
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{marker} {:<6}", row.id), style),
                    Span::styled(format!("{:<28}", truncate(&row.name, 28)), style),
                    Span::styled(
                        format!("{:>7.1} km {:>8}", row.distance, format_minutes(row.flight_time)),
                        style,
                    ),
                ]))
            })
            .collect();

        let title = if play.reachable_only {
            "Reachable destinations  (r nearest · Enter fly · Esc menu)"
        } else {
            "Nearest airports  (r reachable · Enter fly · Esc menu)"
        };
        let mut list_state = ListState::default();
        if !play.rows.is_empty() {
            list_state.select(Some(play.cursor));
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_budget_gauge(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        remaining: f64,
        total: f64,
        label: String,
    ) {
        let ratio = if total > 0.0 {
            (remaining / total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let color = if ratio > 0.5 {
            self.theme.success
        } else if ratio > 0.2 {
            self.theme.warning
        } else {
            self.theme.danger
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .gauge_style(Style::default().fg(color))
            .ratio(ratio)
            .label(label);
        frame.render_widget(gauge, area);
    }

    fn render_play_info(&self, frame: &mut Frame, area: Rect, play: &PlayState) {
        let game = &play.game;
        let label = Style::default().fg(self.theme.accent);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Pilot: ", label),
                Span::raw(format!("{} ({})", game.player_name, game.difficulty)),
            ]),
            Line::from(vec![
                Span::styled("At: ", label),
                Span::raw(game.current_airport.clone()),
            ]),
            Line::from(vec![
                Span::styled("Goals: ", label),
                Span::styled(
                    if game.goal_airports.is_empty() {
                        "none left".to_string()
                    } else {
                        game.goal_airports.join(", ")
                    },
                    Style::default()
                        .fg(self.theme.warning)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Route: ", label),
                Span::raw(game.visited_airports.join(" → ")),
            ]),
        ];
        if let Some(hop) = &play.last_hop {
            let color = match hop.outcome {
                Outcome::Victory | Outcome::GoalReached => self.theme.success,
                Outcome::Restart | Outcome::Stranded => self.theme.danger,
                Outcome::Continue => self.theme.primary_fg,
            };
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("Last hop: ", label),
                Span::styled(
                    format!(
                        "{} {:.1} km, {} ({})",
                        hop.destination,
                        hop.distance,
                        format_minutes(hop.flight_time),
                        hop.outcome.as_str()
                    ),
                    Style::default().fg(color),
                ),
            ]));
        }
        let ending = match game.status {
            GameStatus::Active => None,
            GameStatus::Won => Some((
                "Game won. Press Enter to return to the menu.",
                self.theme.success,
            )),
            GameStatus::Lost => Some((
                "Game over: out of reach of every airport. Press Enter to return to the menu.",
                self.theme.danger,
            )),
        };
        if let Some((text, color)) = ending {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                text,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Flight"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_name_prompt(&self, frame: &mut Frame, prompt: &NamePrompt) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(50_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let height = 7_u16.min(frame_area.height.saturating_sub(2)).max(5_u16);
        let area = centered_rect(width, height, frame_area);

        frame.render_widget(Clear, area);

        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(prompt.input.clone()),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" continue  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);
        let paragraph = Paragraph::new(vec![
            Line::from("Pilot name"),
            input_line,
            Line::from(""),
            helper,
            Line::from(format!("Default: {}", prompt.default)),
        ])
        .block(Block::default().borders(Borders::ALL).title("New Game"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);

        let cursor_x =
            (area.x + 3 + prompt.cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 2);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let secondary = format!("Saves tracked: {}  (auto-save enabled)", self.saves.len());
        let paragraph = Paragraph::new(vec![
            Line::from(self.ui.status.clone()),
            Line::from(Span::styled(secondary, Style::default().fg(self.theme.muted))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    status: String,
    should_quit: bool,
    menu_cursor: usize,
    continue_cursor: usize,
    continue_offset: usize,
    list_height: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: "Ready".to_string(),
            should_quit: false,
            menu_cursor: 0,
            continue_cursor: 0,
            continue_offset: 0,
            list_height: 1,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn move_menu_cursor(&mut self, delta: isize) {
        let idx = self.menu_cursor as isize + delta;
        self.menu_cursor = idx.clamp(0, MENU_ITEMS.len() as isize - 1) as usize;
    }

    fn move_continue_cursor(&mut self, delta: isize, total: usize, visible: usize) {
        if total == 0 {
            self.continue_cursor = 0;
            self.continue_offset = 0;
            return;
        }
        let idx = self.continue_cursor as isize + delta;
        self.continue_cursor = idx.clamp(0, total as isize - 1) as usize;
        let visible = visible.max(1);
        if self.continue_cursor < self.continue_offset {
            self.continue_offset = self.continue_cursor;
        } else if self.continue_cursor >= self.continue_offset + visible {
            self.continue_offset = self.continue_cursor + 1 - visible;
        }
        self.continue_offset = self.continue_offset.min(total.saturating_sub(visible));
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn format_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as u64;
    format!("{}h {:02}m", total / 60, total % 60)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

//! Full-screen terminal mode.
//!
//! Renders past, current and upcoming lyric lines centered on screen with a
//! status line underneath. The loop `select!`s over session updates, key
//! events forwarded from a reader thread, and the expiry of a short status
//! toast. `/` opens a search prompt in the status line; while it is open all
//! keys edit the prompt.

use crate::detect::UNKNOWN_ARTIST;
use crate::event::Command;
use crate::state::Update;
use crate::ui::modern_helpers::{WrappedCache, draw_ui_with_cache};
use crate::ui::styles::LyricStyles;
use crossterm::{
    event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MediaKeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Sleep;

/// Seconds moved by the arrow keys.
pub const SEEK_STEP: f64 = 5.0;

const TOAST_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Artist,
    Title,
}

/// The artist/title prompt opened with `/`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchForm {
    pub artist: String,
    pub title: String,
    pub field: SearchField,
}

impl SearchForm {
    fn new() -> Self {
        Self {
            artist: String::new(),
            title: String::new(),
            field: SearchField::Artist,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self.field {
            SearchField::Artist => &mut self.artist,
            SearchField::Title => &mut self.title,
        }
    }

    fn switch_field(&mut self) {
        self.field = match self.field {
            SearchField::Artist => SearchField::Title,
            SearchField::Title => SearchField::Artist,
        };
    }

    /// The search to issue, or `None` while the title is blank.
    fn submit(&self) -> Option<Command> {
        let title = self.title.trim();
        if title.is_empty() {
            return None;
        }
        let artist = match self.artist.trim() {
            "" => UNKNOWN_ARTIST,
            a => a,
        };
        Some(Command::Search {
            artist: artist.to_string(),
            title: title.to_string(),
        })
    }

    /// Status-line rendering with a cursor on the active field.
    pub fn prompt_line(&self) -> String {
        let (a, t) = match self.field {
            SearchField::Artist => ("_", ""),
            SearchField::Title => ("", "_"),
        };
        format!(
            "Artist: {}{}  Title: {}{}  [Tab] switch [Enter] search [Esc] cancel",
            self.artist, a, self.title, t
        )
    }
}

/// UI state for the full-screen mode
pub struct ModernUIState {
    pub last_update: Option<Update>,
    pub wrapped_cache: WrappedCache,
    pub car_mode: bool,
    pub styles: LyricStyles,
    pub toast: Option<String>,
    pub search: Option<SearchForm>,
    /// First visible row of unsynced text.
    pub scroll: usize,
    pub should_exit: bool,
}

impl ModernUIState {
    pub fn new(car_mode: bool) -> Self {
        Self {
            last_update: None,
            wrapped_cache: None,
            car_mode,
            styles: LyricStyles::for_mode(car_mode),
            toast: None,
            search: None,
            scroll: 0,
            should_exit: false,
        }
    }

    fn showing_unsynced(&self) -> bool {
        self.last_update
            .as_ref()
            .is_some_and(|u| u.err.is_none() && !u.loading && u.unsynced.is_some())
    }

    /// Length of the loaded synced song, if any.
    fn synced_duration(&self) -> Option<f64> {
        self.last_update
            .as_ref()
            .filter(|u| !u.lines.is_empty() && u.duration > 0.0)
            .map(|u| u.duration)
    }

    fn set_car_mode(&mut self, on: bool) {
        self.car_mode = on;
        self.styles = LyricStyles::for_mode(on);
        self.toast = Some(if on { "Car mode on" } else { "Car mode off" }.to_string());
    }
}

/// Run the full-screen UI until the user quits or the session ends.
/// `open_search` starts with the search prompt open.
pub async fn display_lyrics_modern(
    mut rx: mpsc::Receiver<Update>,
    cmd_tx: mpsc::Sender<Command>,
    car_mode: bool,
    open_search: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    enable_raw_mode().map_err(to_boxed_err)?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(to_boxed_err)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(to_boxed_err)?;

    let result = run(&mut terminal, &mut rx, &cmd_tx, car_mode, open_search).await;

    disable_raw_mode().map_err(to_boxed_err)?;
    execute!(io::stdout(), LeaveAlternateScreen).map_err(to_boxed_err)?;
    let _ = cmd_tx.send(Command::Shutdown).await;
    result
}

async fn run<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    rx: &mut mpsc::Receiver<Update>,
    cmd_tx: &mpsc::Sender<Command>,
    car_mode: bool,
    open_search: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut state = ModernUIState::new(car_mode);
    if open_search {
        state.search = Some(SearchForm::new());
    }
    let mut toast_sleep: Option<Pin<Box<Sleep>>> = None;

    // A real OS thread polls crossterm and forwards events; it exits once the
    // receiver is dropped.
    let (event_tx, mut event_rx) = mpsc::channel(32);
    thread::spawn(move || {
        loop {
            match crossterm::event::poll(Duration::from_millis(100)) {
                Ok(true) => {
                    if let Ok(ev) = crossterm::event::read()
                        && event_tx.blocking_send(ev).is_err()
                    {
                        break;
                    }
                }
                Ok(false) => {
                    if event_tx.is_closed() {
                        break;
                    }
                }
                Err(_) => thread::sleep(Duration::from_millis(100)),
            }
        }
    });

    redraw(terminal, &mut state)?;
    while !state.should_exit {
        tokio::select! {
            biased;

            maybe_event = event_rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        let toast_before = state.toast.clone();
                        for cmd in process_event(event, &mut state) {
                            if cmd_tx.send(cmd).await.is_err() {
                                state.should_exit = true;
                            }
                        }
                        if state.toast.is_some() && state.toast != toast_before {
                            toast_sleep = Some(Box::pin(tokio::time::sleep(TOAST_DURATION)));
                        }
                    }
                    None => state.should_exit = true,
                }
            }

            update = rx.recv() => process_update(update, &mut state),

            _ = async {
                match &mut toast_sleep {
                    Some(s) => s.as_mut().await,
                    None => futures_util::future::pending::<()>().await,
                }
            } => {
                state.toast = None;
                toast_sleep = None;
            }
        }
        if !state.should_exit {
            redraw(terminal, &mut state)?;
        }
    }
    Ok(())
}

fn redraw<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &mut ModernUIState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let prompt = state.search.as_ref().map(SearchForm::prompt_line);
    draw_ui_with_cache(
        terminal,
        &state.last_update,
        &mut state.wrapped_cache,
        &mut state.scroll,
        &state.styles,
        state.car_mode,
        prompt.as_deref().or(state.toast.as_deref()),
    )
}

/// Store a session update, dropping the wrap cache and scroll offset when a
/// new transcript arrived.
fn process_update(update: Option<Update>, state: &mut ModernUIState) {
    let Some(update) = update else {
        state.should_exit = true;
        return;
    };
    let same_lines = state
        .last_update
        .as_ref()
        .is_some_and(|prev| Arc::ptr_eq(&prev.lines, &update.lines));
    if !same_lines {
        state.wrapped_cache = None;
        state.scroll = 0;
    }
    state.last_update = Some(update);
}

/// Map a terminal event to session commands. UI-local keys (car mode,
/// scrolling, the search prompt, quit) only touch `state`.
fn process_event(event: Event, state: &mut ModernUIState) -> Vec<Command> {
    let Event::Key(key) = event else {
        // Resizes and the like only need a redraw.
        return Vec::new();
    };
    if key.kind != KeyEventKind::Press {
        return Vec::new();
    }
    if state.search.is_some() {
        return search_commands(key, state);
    }
    key_commands(key, state)
}

fn search_commands(key: KeyEvent, state: &mut ModernUIState) -> Vec<Command> {
    let Some(form) = state.search.as_mut() else {
        return Vec::new();
    };
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.should_exit = true;
        }
        KeyCode::Esc => state.search = None,
        KeyCode::Tab | KeyCode::BackTab => form.switch_field(),
        KeyCode::Backspace => {
            form.field_mut().pop();
        }
        KeyCode::Enter if form.field == SearchField::Artist => form.switch_field(),
        KeyCode::Enter => {
            if let Some(cmd) = form.submit() {
                state.search = None;
                return vec![cmd];
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            form.field_mut().push(ch);
        }
        _ => {}
    }
    Vec::new()
}

fn key_commands(key: KeyEvent, state: &mut ModernUIState) -> Vec<Command> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.should_exit = true;
            vec![]
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.should_exit = true;
            vec![]
        }
        KeyCode::Char('c') => {
            let on = !state.car_mode;
            state.set_car_mode(on);
            vec![]
        }
        KeyCode::Char('/') => {
            state.search = Some(SearchForm::new());
            vec![]
        }
        KeyCode::Char('x') => {
            state.search = Some(SearchForm::new());
            vec![Command::Clear]
        }
        KeyCode::Char(' ') => vec![Command::Toggle],
        KeyCode::Media(MediaKeyCode::PlayPause) => vec![Command::Toggle],
        KeyCode::Media(MediaKeyCode::Play) => vec![Command::Play],
        KeyCode::Media(MediaKeyCode::Pause) => vec![Command::Pause],
        KeyCode::Left => vec![Command::SeekBy(-SEEK_STEP)],
        KeyCode::Right => vec![Command::SeekBy(SEEK_STEP)],
        // Digits jump to tenths of the song: 0 is the start, 5 the middle.
        KeyCode::Char(d @ '0'..='9') => match (state.synced_duration(), d.to_digit(10)) {
            (Some(duration), Some(n)) => vec![Command::SeekTo(duration * f64::from(n) / 10.0)],
            _ => vec![],
        },
        KeyCode::Up if state.showing_unsynced() => {
            state.scroll = state.scroll.saturating_sub(1);
            vec![]
        }
        KeyCode::Down if state.showing_unsynced() => {
            state.scroll += 1;
            vec![]
        }
        KeyCode::Char('r') => vec![Command::Reset],
        KeyCode::Enter if state.last_update.as_ref().is_some_and(|u| u.err.is_some()) => {
            vec![Command::Retry]
        }
        _ => vec![],
    }
}

fn to_boxed_err<E: std::error::Error + Send + Sync + 'static>(
    e: E,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

//! App — event loop and key handling.
//!
//! A `tokio::mpsc` channel carries `AppMessage` events in from a blocking
//! crossterm reader task; a periodic tick drives redraws so asynchronous
//! status changes from the engine show up without a keypress.

use std::io;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, widgets::ListState, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use fmdial_core::playback::PlaybackStatus;
use fmdial_core::{Catalog, Player, Station, Tuner};

use crate::mpv::MpvEngine;
use crate::ui;

const VOLUME_STEP: u8 = 5;

enum AppMessage {
    Event(Event),
}

pub struct App {
    pub tuner: Tuner,
    pub player: Player<MpvEngine>,
    engine: MpvEngine,
    rng: StdRng,

    pub list_state: ListState,
    pub error_message: Option<String>,
    pub show_help: bool,
    pub last_status: PlaybackStatus,
    pub filter: String,
    pub filter_active: bool,

    should_quit: bool,
}

impl App {
    pub fn new(tuner: Tuner, player: Player<MpvEngine>, engine: MpvEngine) -> Self {
        let mut list_state = ListState::default();
        list_state.select(tuner.cursor());
        Self {
            tuner,
            player,
            engine,
            rng: StdRng::from_entropy(),
            list_state,
            error_message: None,
            show_help: false,
            last_status: PlaybackStatus::Stopped,
            filter: String::new(),
            filter_active: false,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (event_tx, mut rx) = mpsc::channel::<AppMessage>(64);

        // ── Background task: keyboard events ──────────────────────────────────
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Redraw tick — picks up engine status changes between keypresses.
        let mut tick = tokio::time::interval(Duration::from_millis(200));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            self.sync_status();
            terminal.draw(|f| ui::draw(f, &mut self))?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    match msg {
                        AppMessage::Event(Event::Key(key)) => self.handle_key(key),
                        AppMessage::Event(_) => {}
                    }
                }
                _ = tick.tick() => {}
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        info!("shutting down");
        self.engine.quit();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Fold the engine's latest report into the UI. Transitions into `Error`
    /// raise the error popup; everything else clears it.
    fn sync_status(&mut self) {
        let status = self.player.status();
        if status != self.last_status {
            debug!("playback status: {} -> {}", self.last_status.label(), status.label());
            if status == PlaybackStatus::Error {
                let name = self
                    .tuner
                    .current()
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| "stream".to_string());
                self.error_message = Some(format!("{} failed to play", name));
            } else {
                self.error_message = None;
            }
            self.last_status = status;
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Any key closes the overlays first.
        if self.show_help {
            self.show_help = false;
            return;
        }
        if self.error_message.is_some()
            && matches!(key.code, KeyCode::Esc | KeyCode::Char(' '))
        {
            self.error_message = None;
            return;
        }

        // ── Filter input mode ─────────────────────────────────────────────────
        if self.filter_active {
            match key.code {
                KeyCode::Esc => {
                    self.filter.clear();
                    self.filter_active = false;
                }
                // Confirm filter — close input bar, keep filter applied.
                KeyCode::Enter => self.filter_active = false,
                KeyCode::Backspace => {
                    self.filter.pop();
                    self.clamp_to_filter();
                }
                KeyCode::Up => self.step(false),
                KeyCode::Down => self.step(true),
                KeyCode::Char(c) => {
                    self.filter.push(c);
                    self.clamp_to_filter();
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc if !self.filter.is_empty() => self.filter.clear(),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') | KeyCode::Char('h') => self.show_help = true,
            KeyCode::Char('/') => {
                self.filter.clear();
                self.filter_active = true;
            }

            KeyCode::Up | KeyCode::Left | KeyCode::Char('k') => self.step(false),
            KeyCode::Down | KeyCode::Right | KeyCode::Char('j') => self.step(true),
            KeyCode::Home => self.jump(0),
            KeyCode::End => self.jump(self.tuner.catalog().len().saturating_sub(1)),

            KeyCode::Enter => self.tune_current(),
            KeyCode::Char('r') => self.tune_random(),
            KeyCode::Char(' ') => self.toggle_pause(),
            KeyCode::Char('s') => {
                if let Err(e) = self.player.stop() {
                    debug!("stop ignored: {}", e);
                }
            }

            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_volume(true),
            KeyCode::Char('-') | KeyCode::Char('_') => self.nudge_volume(false),

            _ => {}
        }
    }

    /// Move the dial one station. Restarts playback on the new station if
    /// something was playing, like a real tuning knob. With a filter applied
    /// the dial only stops on matching stations.
    fn step(&mut self, forward: bool) {
        if !self.filter.is_empty() {
            let indices = filtered_indices(self.tuner.catalog(), &self.filter);
            if let Some(target) = step_match(&indices, self.tuner.cursor(), forward) {
                self.jump(target);
            }
            return;
        }
        let was_playing = self.player.status() == PlaybackStatus::Playing;
        let moved = if forward {
            self.tuner.next()
        } else {
            self.tuner.previous()
        };
        match moved {
            Ok(station) => {
                debug!("tuned to {}", station.name);
                if was_playing {
                    self.tune_current();
                }
            }
            Err(e) => warn!("tuning failed: {}", e),
        }
    }

    /// Snap the cursor onto the first match after a filter edit. Does not
    /// restart playback; the user is still typing.
    fn clamp_to_filter(&mut self) {
        if self.filter.is_empty() {
            return;
        }
        let indices = filtered_indices(self.tuner.catalog(), &self.filter);
        if let Some(&first) = indices.first() {
            if self.tuner.cursor().map_or(true, |c| !indices.contains(&c)) {
                let _ = self.tuner.select(first);
            }
        }
    }

    fn jump(&mut self, index: usize) {
        let was_playing = self.player.status() == PlaybackStatus::Playing;
        match self.tuner.select(index) {
            Ok(_) => {
                if was_playing {
                    self.tune_current();
                }
            }
            Err(e) => warn!("tuning failed: {}", e),
        }
    }

    fn tune_random(&mut self) {
        match self.tuner.random(&mut self.rng) {
            Ok(station) => {
                info!("random tune: {}", station.name);
                self.tune_current();
            }
            Err(e) => warn!("tuning failed: {}", e),
        }
    }

    fn tune_current(&mut self) {
        let Some(station) = self.tuner.current() else {
            return;
        };
        let (name, url) = (station.name.clone(), station.url.clone());
        info!("loading {} ({})", name, url);
        if let Err(e) = self.player.load(&url) {
            warn!("load failed: {}", e);
            self.error_message = Some(format!("{}: {}", name, e));
        } else {
            self.error_message = None;
        }
    }

    fn toggle_pause(&mut self) {
        let result = match self.player.status() {
            PlaybackStatus::Playing => self.player.pause(),
            PlaybackStatus::Paused => self.player.play(),
            // Nothing playable yet: treat space as "play what's selected".
            PlaybackStatus::Stopped | PlaybackStatus::Error => {
                self.tune_current();
                return;
            }
        };
        if let Err(e) = result {
            warn!("pause toggle failed: {}", e);
        }
    }

    fn nudge_volume(&mut self, up: bool) {
        let current = self.player.volume();
        let target = if up {
            current.saturating_add(VOLUME_STEP).min(100)
        } else {
            current.saturating_sub(VOLUME_STEP)
        };
        if target == current {
            return;
        }
        if let Err(e) = self.player.set_volume(target) {
            warn!("volume change failed: {}", e);
        }
    }
}

// ── Station search ────────────────────────────────────────────────────────────

/// Returns true if every whitespace-separated term of `query` appears in
/// `text`, case-insensitively.
pub fn search_matches(query: &str, text: &str) -> bool {
    let t = text.to_lowercase();
    query
        .split_whitespace()
        .all(|term| t.contains(&term.to_lowercase()))
}

/// Returns true if `query` matches the station's name or frequency.
pub fn station_matches(query: &str, station: &Station) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    search_matches(query, &station.name) || search_matches(query, &station.frequency)
}

/// Catalog indices of the stations matching `query`, in catalog order.
pub fn filtered_indices(catalog: &Catalog, query: &str) -> Vec<usize> {
    catalog
        .stations()
        .iter()
        .enumerate()
        .filter(|(_, s)| station_matches(query, s))
        .map(|(i, _)| i)
        .collect()
}

/// Next/previous entry of `indices` relative to `current`, wrapping at both
/// ends. Snaps to the first match when the cursor is outside the matches.
fn step_match(indices: &[usize], current: Option<usize>, forward: bool) -> Option<usize> {
    if indices.is_empty() {
        return None;
    }
    let pos = current.and_then(|c| indices.iter().position(|&i| i == c));
    Some(match pos {
        Some(p) if forward => indices[(p + 1) % indices.len()],
        Some(p) => indices[if p == 0 { indices.len() - 1 } else { p - 1 }],
        None => indices[0],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str, frequency: &str) -> Station {
        Station {
            name: name.to_string(),
            url: format!("https://example.com/{name}"),
            frequency: frequency.to_string(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_stations(vec![
            station("Jazz FM", "98.5"),
            station("Classic Rock", "101.0"),
            station("Late Night Jazz", "103.2"),
            station("News 24", "88.1"),
        ])
    }

    #[test]
    fn test_search_matches_is_case_insensitive() {
        assert!(search_matches("jazz", "Late Night Jazz"));
        assert!(search_matches("late jazz", "Late Night Jazz"));
        assert!(!search_matches("rock", "Late Night Jazz"));
    }

    #[test]
    fn test_station_matches_name_and_frequency() {
        let s = station("Jazz FM", "98.5");
        assert!(station_matches("jazz", &s));
        assert!(station_matches("98.5", &s));
        assert!(station_matches("", &s));
        assert!(!station_matches("rock", &s));
    }

    #[test]
    fn test_filtered_indices_preserve_order() {
        assert_eq!(filtered_indices(&catalog(), "jazz"), vec![0, 2]);
        assert_eq!(filtered_indices(&catalog(), ""), vec![0, 1, 2, 3]);
        assert!(filtered_indices(&catalog(), "polka").is_empty());
    }

    #[test]
    fn test_step_match_wraps_within_matches() {
        let indices = vec![0, 2];
        assert_eq!(step_match(&indices, Some(0), true), Some(2));
        assert_eq!(step_match(&indices, Some(2), true), Some(0));
        assert_eq!(step_match(&indices, Some(0), false), Some(2));
        // Cursor on a non-matching station snaps to the first match.
        assert_eq!(step_match(&indices, Some(1), true), Some(0));
        assert_eq!(step_match(&indices, None, true), Some(0));
        assert_eq!(step_match(&[], Some(0), true), None);
    }
}

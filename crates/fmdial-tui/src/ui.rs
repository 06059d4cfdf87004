use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use fmdial_core::playback::PlaybackStatus;

use crate::app::App;

// ── Color palette ─────────────────────────────────────────────────────────────
const C_ACCENT: Color = Color::Rgb(255, 95, 95);
const C_PLAYING: Color = Color::Rgb(80, 200, 120);
const C_PAUSED: Color = Color::Rgb(255, 184, 80);
const C_MUTED: Color = Color::Rgb(72, 72, 88);
const C_SEPARATOR: Color = Color::Rgb(40, 40, 52);
const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
const C_SELECTION_BG: Color = Color::Rgb(28, 28, 40);
const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
const C_FREQ: Color = Color::Rgb(80, 140, 200);
const C_FILTER_BG: Color = Color::Rgb(20, 20, 32);
const C_FILTER_FG: Color = Color::Rgb(255, 200, 80);

pub fn draw(f: &mut Frame, app: &mut App) {
    let area = f.area();

    let filter_h: u16 = if app.filter_active { 1 } else { 0 };

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),        // header (now playing + clock + vol)
            Constraint::Length(1),        // separator
            Constraint::Length(filter_h), // filter bar (hidden when inactive)
            Constraint::Length(3),        // frequency display
            Constraint::Min(3),           // station list
            Constraint::Length(1),        // separator
            Constraint::Length(1),        // keybindings
        ])
        .split(area);

    draw_header(f, app, outer[0]);
    draw_separator(f, outer[1]);
    if app.filter_active {
        draw_filter_bar(f, app, outer[2]);
    }
    draw_dial(f, app, outer[3]);
    draw_station_list(f, app, outer[4]);
    draw_separator(f, outer[5]);
    draw_keybindings(f, outer[6]);

    // Overlays
    if app.show_help {
        draw_help_overlay(f, area);
    }
    if let Some(error) = app.error_message.clone() {
        draw_error_popup(f, &error, area);
    }
}

// ── Header (now playing) ──────────────────────────────────────────────────────

fn status_glyph(status: PlaybackStatus) -> (&'static str, Color, &'static str) {
    match status {
        PlaybackStatus::Playing => ("▶", C_PLAYING, ""),
        PlaybackStatus::Paused => ("⏸", C_PAUSED, "paused"),
        PlaybackStatus::Error => ("⛔", C_ACCENT, "error"),
        PlaybackStatus::Stopped => ("■", C_MUTED, "stopped"),
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let hchunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(14)])
        .split(area);

    let left = if let Some(station) = app.tuner.current() {
        let (icon, icon_color, status_text) = status_glyph(app.last_status);
        let mut spans = vec![
            Span::raw(" "),
            Span::styled(icon, Style::default().fg(icon_color)),
            Span::raw(" "),
            Span::styled("📻 ", Style::default().fg(C_MUTED)),
            Span::styled(
                station.name.as_str(),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ),
        ];
        if !status_text.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(status_text, Style::default().fg(icon_color)));
        }
        // Filter hint while the input bar is hidden.
        if !app.filter.is_empty() && !app.filter_active {
            spans.push(Span::styled("  /", Style::default().fg(C_MUTED)));
            spans.push(Span::styled(
                app.filter.as_str(),
                Style::default().fg(C_FILTER_FG),
            ));
        }
        Line::from(spans)
    } else {
        Line::from(vec![
            Span::raw(" "),
            Span::styled("■  nothing playing", Style::default().fg(C_MUTED)),
        ])
    };
    f.render_widget(Paragraph::new(left), hchunks[0]);

    // Right: clock + volume percent
    let clock = Local::now().format("%H:%M").to_string();
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(clock, Style::default().fg(C_MUTED)),
            Span::styled(
                format!("  {:>3}%", app.player.volume()),
                Style::default().fg(C_SECONDARY),
            ),
        ]))
        .alignment(Alignment::Right),
        hchunks[1],
    );
}

// ── Frequency display ─────────────────────────────────────────────────────────

/// Big center readout, styled after a radio faceplate: frequency on the left,
/// station name on the right.
fn draw_dial(f: &mut Frame, app: &App, area: Rect) {
    let (freq, name) = match app.tuner.current() {
        Some(s) if !s.frequency.is_empty() => (format!("{} MHz", s.frequency), s.name.clone()),
        Some(s) => ("--.- MHz".to_string(), s.name.clone()),
        None => ("--.- MHz".to_string(), String::new()),
    };

    let line = Line::from(vec![
        Span::styled(
            freq,
            Style::default().fg(C_FREQ).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(name, Style::default().fg(C_PRIMARY)),
    ]);
    let widget = Paragraph::new(line)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(C_PANEL_BORDER)),
        )
        .alignment(Alignment::Center);
    f.render_widget(widget, area);
}

// ── Filter bar ────────────────────────────────────────────────────────────────

fn draw_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let total = app.tuner.catalog().len();
    let match_count = crate::app::filtered_indices(app.tuner.catalog(), &app.filter).len();
    let count_str = format!(" {}/{} ", match_count, total);

    let used = 3 + app.filter.width() + 1 + count_str.len(); // "/ " + query + cursor + count
    let padding = (area.width as usize).saturating_sub(used);

    let line = Line::from(vec![
        Span::styled(" / ", Style::default().fg(C_MUTED).bg(C_FILTER_BG)),
        Span::styled(
            app.filter.as_str(),
            Style::default()
                .fg(C_FILTER_FG)
                .bg(C_FILTER_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("█", Style::default().fg(C_FILTER_FG).bg(C_FILTER_BG)), // cursor
        Span::styled(" ".repeat(padding), Style::default().bg(C_FILTER_BG)),
        Span::styled(count_str, Style::default().fg(C_MUTED).bg(C_FILTER_BG)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

// ── Station list ──────────────────────────────────────────────────────────────

fn draw_station_list(f: &mut Frame, app: &mut App, area: Rect) {
    let cursor = app.tuner.cursor();
    let status = app.last_status;
    let name_width = (area.width as usize).saturating_sub(14);

    let indices = crate::app::filtered_indices(app.tuner.catalog(), &app.filter);
    let items: Vec<ListItem> = indices
        .iter()
        .map(|&idx| {
            let station = &app.tuner.catalog().stations()[idx];
            let is_current = cursor == Some(idx);
            let icon = if is_current {
                status_glyph(status).0
            } else {
                " "
            };
            let freq = if station.frequency.is_empty() {
                "     ".to_string()
            } else {
                format!("{:>5}", station.frequency)
            };
            let style = if is_current {
                Style::default().fg(C_PRIMARY).bg(C_SELECTION_BG)
            } else {
                Style::default().fg(C_SECONDARY)
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!(" {} ", icon)),
                Span::styled(freq, Style::default().fg(C_FREQ)),
                Span::raw("  "),
                Span::styled(truncate(&station.name, name_width), style),
            ]))
        })
        .collect();

    // Selection is the cursor's position within the filtered view.
    let selected = cursor.and_then(|c| indices.iter().position(|&i| i == c));
    app.list_state.select(selected);

    let list = List::new(items)
        .highlight_style(Style::default().bg(C_SELECTION_BG).add_modifier(Modifier::BOLD));
    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn truncate(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut w = 0;
    for ch in s.chars() {
        let cw = ch.width().unwrap_or(0);
        if w + cw + 1 > max_width {
            break;
        }
        out.push(ch);
        w += cw;
    }
    out.push('…');
    out
}

// ── Separator ─────────────────────────────────────────────────────────────────

fn draw_separator(f: &mut Frame, area: Rect) {
    f.render_widget(
        Paragraph::new("─".repeat(area.width as usize)).style(Style::default().fg(C_SEPARATOR)),
        area,
    );
}

// ── Keybindings bar ───────────────────────────────────────────────────────────

fn draw_keybindings(f: &mut Frame, area: Rect) {
    let pairs: &[(&str, &str)] = &[
        ("↑↓", "tune"),
        ("enter", "play"),
        ("spc", "pause"),
        ("s", "stop"),
        ("r", "random"),
        ("/", "filter"),
        ("+/-", "vol"),
        ("?", "help"),
        ("q", "quit"),
    ];

    let mut spans = vec![Span::raw("  ")];
    for (i, (key, label)) in pairs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("   ", Style::default()));
        }
        spans.push(Span::styled(
            *key,
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!(" {}", label),
            Style::default().fg(C_MUTED),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Help overlay ──────────────────────────────────────────────────────────────

fn draw_help_overlay(f: &mut Frame, area: Rect) {
    let popup = centered_rect(50, 20, area);

    let help_lines: Vec<Line> = vec![
        Line::from(Span::styled(
            " keyboard shortcuts",
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        help_row("↑ / ↓, ← / →", "previous / next station"),
        help_row("home / end", "jump to first / last"),
        help_row("enter", "play selected station"),
        help_row("space", "pause / resume"),
        help_row("s", "stop playback"),
        help_row("r", "random station"),
        help_row("+ / -", "volume up / down"),
        Line::from(""),
        help_row("/", "filter stations"),
        help_row("esc (in filter)", "clear filter"),
        help_row("enter (in filter)", "confirm filter"),
        Line::from(""),
        help_row("?", "toggle this help"),
        help_row("q", "quit"),
        Line::from(""),
        Line::from(Span::styled(
            " press any key to close",
            Style::default().fg(C_MUTED),
        )),
    ];

    let widget = Paragraph::new(help_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(C_PANEL_BORDER))
                .style(Style::default().bg(Color::Rgb(18, 18, 26))),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup);
    f.render_widget(widget, popup);
}

fn help_row<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<14}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc, Style::default().fg(C_SECONDARY)),
    ])
}

// ── Error popup ───────────────────────────────────────────────────────────────

fn draw_error_popup(f: &mut Frame, msg: &str, area: Rect) {
    let popup = centered_rect(60, 5, area);
    let widget = Paragraph::new(msg)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(C_ACCENT))
                .title(" error "),
        )
        .style(Style::default().fg(C_ACCENT))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, popup);
    f.render_widget(widget, popup);
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}

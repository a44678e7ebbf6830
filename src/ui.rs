//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, Padding, Paragraph, Sparkline, Wrap},
};
use std::time::Duration;

use crate::app::{App, LibraryView, Pane};
use crate::config::{ControlsSettings, UiSettings};
use crate::library;
use crate::player::{PlaybackState, Player};
use crate::playlist::{SourceKind, Track};

/// One row of the library pane: either a group to drill into or a song.
pub enum LibraryRow {
    Group(String),
    Song(Track),
}

impl LibraryRow {
    pub fn label(&self) -> String {
        match self {
            LibraryRow::Group(name) => name.clone(),
            LibraryRow::Song(track) => song_label(track),
        }
    }
}

fn song_label(track: &Track) -> String {
    match track.artist.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(artist) => format!("{} - {}", artist, track.title),
        None => track.title.clone(),
    }
}

/// The rows the library pane currently shows, given its view and
/// drill-down. Shared with the event loop so selection indices always
/// agree with what is on screen.
pub fn library_rows(app: &App, tracks: &[Track]) -> Vec<LibraryRow> {
    match (app.library_view, app.library_group.as_deref()) {
        (LibraryView::Songs, _) => tracks.iter().cloned().map(LibraryRow::Song).collect(),
        (LibraryView::Albums, None) => library::albums(tracks)
            .into_iter()
            .map(LibraryRow::Group)
            .collect(),
        (LibraryView::Artists, None) => library::artists(tracks)
            .into_iter()
            .map(LibraryRow::Group)
            .collect(),
        (LibraryView::Genres, None) => library::genres(tracks)
            .into_iter()
            .map(LibraryRow::Group)
            .collect(),
        (LibraryView::Albums, Some(group)) => library::by_album(tracks, group)
            .into_iter()
            .cloned()
            .map(LibraryRow::Song)
            .collect(),
        (LibraryView::Artists, Some(group)) => library::by_artist(tracks, group)
            .into_iter()
            .cloned()
            .map(LibraryRow::Song)
            .collect(),
        (LibraryView::Genres, Some(group)) => library::by_genre(tracks, group)
            .into_iter()
            .cloned()
            .map(LibraryRow::Song)
            .collect(),
    }
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn kind_tag(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Local => "[file]",
        SourceKind::Stream => "[stream]",
        SourceKind::Embedded => "[video]",
    }
}

fn controls_text(controls: &ControlsSettings) -> String {
    format!(
        "[Tab] pane | [enter] play/open | [space] play/pause | [h/l] prev/next | [H/L] scrub -/+{}s | [+/-] volume | [a] stream [v] video [c] collection [i] import | [d] remove | [m] grouping | [q] quit",
        controls.scrub_seconds
    )
}

fn pane_list<'a>(
    title: String,
    rows: Vec<String>,
    selected: usize,
    focused: bool,
) -> (List<'a>, ratatui::widgets::ListState) {
    let items: Vec<ListItem> = rows.into_iter().map(ListItem::new).collect();
    let has_items = !items.is_empty();

    let border_style = if focused {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ratatui::widgets::ListState::default();
    if has_items {
        state.select(Some(selected));
    }
    (list, state)
}

/// Render the entire UI into the provided `frame`.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    player: &Player,
    library_tracks: &[Track],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let mut constraints = vec![
        Constraint::Length(3), // header
        Constraint::Length(3), // status
        Constraint::Min(8),    // panes
        Constraint::Length(3), // progress
    ];
    if ui_settings.show_visualizer {
        constraints.push(Constraint::Length(4));
    }
    constraints.push(Constraint::Length(3)); // footer

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" vivace ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status line
    let status = {
        let mut parts: Vec<String> = Vec::new();
        parts.push(
            match player.state() {
                PlaybackState::Stopped => "Stopped",
                PlaybackState::Playing => "Playing",
                PlaybackState::Paused => "Paused",
            }
            .to_string(),
        );
        parts.push(format!("Volume: {}%", player.volume()));
        if let Some(track) = player.current_track() {
            parts.push(format!(
                "Song: {} {}",
                song_label(track),
                kind_tag(track.source.kind())
            ));
        }
        parts.join("  |  ")
    };
    let status_par = Paragraph::new(status)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Playlist and library panes side by side.
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    {
        let cursor = player.playlist().cursor();
        let rows: Vec<String> = player
            .playlist()
            .tracks()
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let marker = if cursor == Some(i) { "* " } else { "  " };
                format!("{marker}{} {}", song_label(t), kind_tag(t.source.kind()))
            })
            .collect();
        let (list, mut state) = pane_list(
            format!(" playlist ({}) ", rows.len()),
            rows,
            app.playlist_selected,
            app.pane == Pane::Playlist,
        );
        frame.render_stateful_widget(list, panes[0], &mut state);
    }

    {
        let rows: Vec<String> = library_rows(app, library_tracks)
            .iter()
            .map(LibraryRow::label)
            .collect();
        let title = match &app.library_group {
            Some(group) => format!(" library: {} / {} ", app.library_view.label(), group),
            None => format!(" library: {} ", app.library_view.label()),
        };
        let (list, mut state) =
            pane_list(title, rows, app.library_selected, app.pane == Pane::Library);
        frame.render_stateful_widget(list, panes[1], &mut state);
    }

    // Progress gauge
    {
        let (elapsed, total) = player.progress();
        let (ratio, label) = match total {
            Some(total) if !total.is_zero() => (
                (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0),
                format!("{} / {}", format_mmss(elapsed), format_mmss(total)),
            ),
            _ => (0.0, format_mmss(elapsed)),
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" progress "))
            .ratio(ratio)
            .label(label);
        frame.render_widget(gauge, chunks[3]);
    }

    let mut next_chunk = 4;
    if ui_settings.show_visualizer {
        let data: Vec<u64> = app
            .spectrum
            .iter()
            .map(|&b| (b * 1000.0).min(1000.0) as u64)
            .collect();
        let sparkline = Sparkline::default()
            .block(Block::default().borders(Borders::ALL).title(" spectrum "))
            .data(&data);
        frame.render_widget(sparkline, chunks[next_chunk]);
        next_chunk += 1;
    }

    // Footer: active prompt wins, then a status message, then the
    // controls reference.
    let footer_text = if let Some(prompt) = &app.prompt {
        format!("{}: {}_", prompt.kind.label(), prompt.input)
    } else if let Some(message) = app.message() {
        message.to_string()
    } else {
        controls_text(controls_settings)
    };
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[next_chunk]);
}

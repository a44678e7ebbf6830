//! Main terminal event loop: input handling, engine ticks, UI drawing.

use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::{Pane, Prompt, PromptKind};
use crate::importer::ImportError;
use crate::library::{import_path, local_track};
use crate::mpris::ControlCmd;
use crate::player::{spectrum, PlaybackState};
use crate::playlist::{
    parse_collection_url, parse_stream_url, parse_video_url, video_watch_url, Track,
};
use crate::ui;

use super::Runtime;

pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    rt: &mut Runtime,
    control_tx: &Sender<ControlCmd>,
    control_rx: &Receiver<ControlCmd>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        // Desktop controls first, so media keys stay responsive even
        // while a prompt is open.
        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, rt) {
                return Ok(());
            }
        }

        // Engine tick: adapters report end-of-track and embedded
        // signals, the engine reacts, and its notices reach the UI.
        rt.player.poll();
        while let Ok(event) = rt.events.try_recv() {
            rt.player.handle_event(event);
        }
        for notice in rt.player.take_notices() {
            rt.app.set_message(notice);
        }
        rt.app.tick();

        keep_selections_in_range(rt);

        rt.app.spectrum = if rt.settings.ui.show_visualizer
            && rt.player.state() == PlaybackState::Playing
        {
            spectrum(rt.player.tap())
        } else {
            Vec::new()
        };

        terminal.draw(|f| {
            ui::draw(
                f,
                &rt.app,
                &rt.player,
                &rt.library_tracks,
                &rt.settings.ui,
                &rt.settings.controls,
            )
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if rt.app.prompt.is_some() {
                    handle_prompt_key(key, rt);
                } else if handle_key(key, rt, control_tx) {
                    break;
                }
            }
        }
    }

    rt.player.stop();
    Ok(())
}

fn keep_selections_in_range(rt: &mut Runtime) {
    let playlist_len = rt.player.playlist().len();
    if playlist_len == 0 {
        rt.app.playlist_selected = 0;
    } else if rt.app.playlist_selected >= playlist_len {
        rt.app.playlist_selected = playlist_len - 1;
    }

    let library_len = ui::library_rows(&rt.app, &rt.library_tracks).len();
    if library_len == 0 {
        rt.app.library_selected = 0;
    } else if rt.app.library_selected >= library_len {
        rt.app.library_selected = library_len - 1;
    }
}

/// Returns `true` when the loop should exit.
fn handle_control_cmd(cmd: ControlCmd, rt: &mut Runtime) -> bool {
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => {
            if rt.player.state() != PlaybackState::Playing {
                rt.player.toggle_play_pause();
            }
        }
        ControlCmd::Pause => {
            if rt.player.state() == PlaybackState::Playing {
                rt.player.toggle_play_pause();
            }
        }
        ControlCmd::PlayPause => rt.player.toggle_play_pause(),
        ControlCmd::Stop => rt.player.stop(),
        ControlCmd::Next => rt.player.next(),
        ControlCmd::Prev => rt.player.previous(),
    }
    false
}

fn handle_prompt_key(key: KeyEvent, rt: &mut Runtime) {
    match key.code {
        KeyCode::Esc => rt.app.cancel_prompt(),
        KeyCode::Backspace => rt.app.pop_prompt_char(),
        KeyCode::Enter => {
            if let Some(prompt) = rt.app.take_prompt() {
                submit_prompt(prompt, rt);
            }
        }
        KeyCode::Char(c) if !c.is_control() => rt.app.push_prompt_char(c),
        _ => {}
    }
}

/// Returns `true` when the loop should exit.
fn handle_key(key: KeyEvent, rt: &mut Runtime, control_tx: &Sender<ControlCmd>) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => rt.app.toggle_pane(),
        KeyCode::Char('j') | KeyCode::Down => {
            let len = focused_len(rt);
            rt.app.select_next(len);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let len = focused_len(rt);
            rt.app.select_prev(len);
        }
        KeyCode::Enter => activate_selection(rt),
        KeyCode::Esc => {
            if rt.app.pane == Pane::Library && rt.app.library_group.is_some() {
                rt.app.leave_group();
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            // Behave like MPRIS PlayPause.
            let _ = control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => scrub(rt, 1),
        KeyCode::Char('H') => scrub(rt, -1),
        KeyCode::Char('+') | KeyCode::Char('=') => rt.player.volume_up(),
        KeyCode::Char('-') => rt.player.volume_down(),
        KeyCode::Char('d') => {
            if rt.app.pane == Pane::Playlist {
                if let Some(removed) = rt.player.remove(rt.app.playlist_selected) {
                    rt.app.set_message(format!("Removed \"{}\"", removed.title));
                    let len = rt.player.playlist().len();
                    rt.app.clamp_selection(len);
                }
            }
        }
        KeyCode::Char('m') => rt.app.cycle_library_view(),
        KeyCode::Char('a') => rt.app.open_prompt(PromptKind::Stream),
        KeyCode::Char('v') => rt.app.open_prompt(PromptKind::Video),
        KeyCode::Char('c') => rt.app.open_prompt(PromptKind::Collection),
        KeyCode::Char('i') => rt.app.open_prompt(PromptKind::ImportPath),
        _ => {}
    }
    false
}

fn focused_len(rt: &Runtime) -> usize {
    match rt.app.pane {
        Pane::Playlist => rt.player.playlist().len(),
        Pane::Library => ui::library_rows(&rt.app, &rt.library_tracks).len(),
    }
}

fn activate_selection(rt: &mut Runtime) {
    match rt.app.pane {
        Pane::Playlist => rt.player.select_track(rt.app.playlist_selected),
        Pane::Library => {
            let rows = ui::library_rows(&rt.app, &rt.library_tracks);
            match rows.into_iter().nth(rt.app.library_selected) {
                Some(ui::LibraryRow::Group(name)) => rt.app.enter_group(name),
                Some(ui::LibraryRow::Song(track)) => queue_track(rt, track),
                None => {}
            }
        }
    }
}

fn queue_track(rt: &mut Runtime, track: Track) {
    let title = track.title.clone();
    if rt.player.append_unique(track) {
        rt.app.set_message(format!("Queued \"{title}\""));
    } else {
        rt.app.set_message(format!("\"{title}\" is already queued"));
    }
}

/// Scrub by the configured step, expressed to the engine as a fraction
/// of the whole track.
fn scrub(rt: &mut Runtime, direction: i64) {
    let (elapsed, total) = rt.player.progress();
    let Some(total) = total.filter(|t| !t.is_zero()) else {
        return;
    };
    let step = rt.settings.controls.scrub_seconds as i64 * direction;
    let target = (elapsed.as_secs() as i64 + step).max(0) as u64;
    let fraction = (target as f64 / total.as_secs_f64()).clamp(0.0, 1.0);
    rt.player.seek(fraction);
}

fn submit_prompt(prompt: Prompt, rt: &mut Runtime) {
    let input = prompt.input.trim().to_string();
    if input.is_empty() {
        return;
    }
    match prompt.kind {
        PromptKind::Stream => match parse_stream_url(&input) {
            Ok(url) => queue_track(rt, Track::stream(url)),
            Err(e) => rt.app.set_message(e.to_string()),
        },
        PromptKind::Video => match parse_video_url(&input) {
            Ok(id) => {
                let track = Track::embedded(&id, video_watch_url(&id));
                queue_track(rt, track);
            }
            Err(e) => rt.app.set_message(e.to_string()),
        },
        PromptKind::Collection => match parse_collection_url(&input) {
            Ok(id) => import_collection(rt, &id),
            Err(e) => rt.app.set_message(e.to_string()),
        },
        PromptKind::ImportPath => import_directory(rt, &input),
    }
}

fn import_collection(rt: &mut Runtime, collection_id: &str) {
    let player = &mut rt.player;
    match rt
        .importer
        .import_collection(collection_id, |track| player.append_unique(track))
    {
        Ok(outcome) => rt.app.set_message(format!(
            "Imported {} tracks from \"{}\"",
            outcome.added, outcome.title
        )),
        Err(e @ ImportError::MissingCredential) => rt.app.set_message(e.to_string()),
        Err(ImportError::Aborted { added, reason }) => rt
            .app
            .set_message(format!("Import stopped after {added} tracks: {reason}")),
    }
}

fn import_directory(rt: &mut Runtime, input: &str) {
    match import_path(Path::new(input), &rt.settings.library, rt.store.as_mut()) {
        Ok(added) => {
            match rt.store.get_all() {
                Ok(stored) => {
                    rt.library_tracks = stored.iter().map(local_track).collect();
                }
                Err(e) => rt.app.set_message(format!("Library reload failed: {e}")),
            }
            rt.app
                .set_message(format!("Imported {added} files into the library"));
        }
        Err(e) => rt.app.set_message(format!("Import failed: {e}")),
    }
}

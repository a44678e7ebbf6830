//! UI-side application model.
//!
//! Playback truth lives in the engine; `App` only tracks what the panes
//! show: focus, selections, the library drill-down, the active prompt
//! and the transient status message.

use std::time::{Duration, Instant};

/// How long a status message stays on screen.
pub const MESSAGE_TTL: Duration = Duration::from_secs(4);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pane {
    Playlist,
    Library,
}

/// How the library pane groups its rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LibraryView {
    Songs,
    Albums,
    Artists,
    Genres,
}

impl LibraryView {
    pub fn label(&self) -> &'static str {
        match self {
            LibraryView::Songs => "Songs",
            LibraryView::Albums => "Albums",
            LibraryView::Artists => "Artists",
            LibraryView::Genres => "Genres",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PromptKind {
    Stream,
    Video,
    Collection,
    ImportPath,
}

impl PromptKind {
    pub fn label(&self) -> &'static str {
        match self {
            PromptKind::Stream => "Stream URL",
            PromptKind::Video => "Video URL",
            PromptKind::Collection => "Collection URL",
            PromptKind::ImportPath => "Import directory",
        }
    }
}

/// A line-input prompt at the bottom of the screen.
#[derive(Clone, Debug)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

pub struct App {
    pub pane: Pane,
    pub playlist_selected: usize,
    pub library_selected: usize,
    pub library_view: LibraryView,
    /// Group name drilled into (album/artist/genre), if any.
    pub library_group: Option<String>,
    pub prompt: Option<Prompt>,
    message: Option<(String, Instant)>,
    pub spectrum: Vec<f32>,
}

impl App {
    pub fn new() -> Self {
        Self {
            pane: Pane::Playlist,
            playlist_selected: 0,
            library_selected: 0,
            library_view: LibraryView::Songs,
            library_group: None,
            prompt: None,
            message: None,
            spectrum: Vec::new(),
        }
    }

    pub fn toggle_pane(&mut self) {
        self.pane = match self.pane {
            Pane::Playlist => Pane::Library,
            Pane::Library => Pane::Playlist,
        };
    }

    fn selection(&mut self) -> &mut usize {
        match self.pane {
            Pane::Playlist => &mut self.playlist_selected,
            Pane::Library => &mut self.library_selected,
        }
    }

    /// Move the focused pane's selection down, wrapping at the end.
    pub fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let sel = self.selection();
        *sel = (*sel + 1) % len;
    }

    /// Move the focused pane's selection up, wrapping at the start.
    pub fn select_prev(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let sel = self.selection();
        *sel = (*sel + len - 1) % len;
    }

    /// Keep the selection in range after the list shrinks.
    pub fn clamp_selection(&mut self, len: usize) {
        let sel = self.selection();
        if len == 0 {
            *sel = 0;
        } else if *sel >= len {
            *sel = len - 1;
        }
    }

    /// Cycle the library grouping; leaves any drill-down.
    pub fn cycle_library_view(&mut self) {
        self.library_view = match self.library_view {
            LibraryView::Songs => LibraryView::Albums,
            LibraryView::Albums => LibraryView::Artists,
            LibraryView::Artists => LibraryView::Genres,
            LibraryView::Genres => LibraryView::Songs,
        };
        self.library_group = None;
        self.library_selected = 0;
    }

    pub fn enter_group(&mut self, name: String) {
        self.library_group = Some(name);
        self.library_selected = 0;
    }

    pub fn leave_group(&mut self) {
        self.library_group = None;
        self.library_selected = 0;
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(Prompt {
            kind,
            input: String::new(),
        });
    }

    pub fn push_prompt_char(&mut self, c: char) {
        if let Some(prompt) = &mut self.prompt {
            prompt.input.push(c);
        }
    }

    pub fn pop_prompt_char(&mut self) {
        if let Some(prompt) = &mut self.prompt {
            prompt.input.pop();
        }
    }

    /// Close the prompt and hand its contents to the caller.
    pub fn take_prompt(&mut self) -> Option<Prompt> {
        self.prompt.take()
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some((text.into(), Instant::now()));
    }

    /// The status message, if it has not expired.
    pub fn message(&self) -> Option<&str> {
        match &self.message {
            Some((text, since)) if since.elapsed() < MESSAGE_TTL => Some(text),
            _ => None,
        }
    }

    /// Drop an expired message so the line frees up.
    pub fn tick(&mut self) {
        if let Some((_, since)) = &self.message {
            if since.elapsed() >= MESSAGE_TTL {
                self.message = None;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate_message(&mut self, age: Duration) {
        if let Some((_, since)) = &mut self.message {
            *since = Instant::now() - age;
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

use super::*;
use std::time::Duration;

#[test]
fn pane_toggle_flips_between_playlist_and_library() {
    let mut app = App::new();
    assert_eq!(app.pane, Pane::Playlist);
    app.toggle_pane();
    assert_eq!(app.pane, Pane::Library);
    app.toggle_pane();
    assert_eq!(app.pane, Pane::Playlist);
}

#[test]
fn selection_wraps_in_both_directions() {
    let mut app = App::new();
    app.select_prev(3);
    assert_eq!(app.playlist_selected, 2);
    app.select_next(3);
    assert_eq!(app.playlist_selected, 0);

    // Each pane keeps its own selection.
    app.toggle_pane();
    app.select_next(5);
    assert_eq!(app.library_selected, 1);
    assert_eq!(app.playlist_selected, 0);
}

#[test]
fn selection_is_a_noop_on_an_empty_list() {
    let mut app = App::new();
    app.select_next(0);
    app.select_prev(0);
    assert_eq!(app.playlist_selected, 0);
}

#[test]
fn clamp_pulls_selection_back_after_removal() {
    let mut app = App::new();
    app.playlist_selected = 4;
    app.clamp_selection(3);
    assert_eq!(app.playlist_selected, 2);
    app.clamp_selection(0);
    assert_eq!(app.playlist_selected, 0);
}

#[test]
fn library_view_cycles_and_resets_drilldown() {
    let mut app = App::new();
    app.enter_group("Album X".to_string());
    app.library_selected = 7;

    app.cycle_library_view();
    assert_eq!(app.library_view, LibraryView::Albums);
    assert_eq!(app.library_group, None);
    assert_eq!(app.library_selected, 0);

    app.cycle_library_view();
    app.cycle_library_view();
    app.cycle_library_view();
    assert_eq!(app.library_view, LibraryView::Songs);
}

#[test]
fn prompt_lifecycle_collects_input() {
    let mut app = App::new();
    app.open_prompt(PromptKind::Stream);
    for c in "https://x.example.com/a.mp3".chars() {
        app.push_prompt_char(c);
    }
    app.pop_prompt_char();
    app.push_prompt_char('3');

    let prompt = app.take_prompt().unwrap();
    assert_eq!(prompt.kind, PromptKind::Stream);
    assert_eq!(prompt.input, "https://x.example.com/a.mp3");
    assert!(app.prompt.is_none());
}

#[test]
fn cancelled_prompt_discards_input() {
    let mut app = App::new();
    app.open_prompt(PromptKind::Video);
    app.push_prompt_char('x');
    app.cancel_prompt();
    assert!(app.take_prompt().is_none());
}

#[test]
fn messages_expire_after_the_ttl() {
    let mut app = App::new();
    app.set_message("Imported 49 tracks");
    assert_eq!(app.message(), Some("Imported 49 tracks"));

    app.backdate_message(MESSAGE_TTL + Duration::from_secs(1));
    assert_eq!(app.message(), None);

    app.tick();
    app.set_message("fresh");
    assert_eq!(app.message(), Some("fresh"));
}

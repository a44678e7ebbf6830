//! Process wiring and the terminal event loop.

use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};

mod event_loop;
mod startup;

pub use startup::Runtime;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = startup::load_settings();

    let (control_tx, control_rx) = mpsc::channel();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());

    let mut runtime = startup::build(settings, mpris)?;

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &mut runtime, &control_tx, &control_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Let in-flight metadata refreshes land before the process exits.
    runtime.gateway.drain_revalidations();

    run_result
}

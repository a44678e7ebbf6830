use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod gateway;
mod importer;
mod library;
mod mpris;
mod player;
mod playlist;
mod runtime;
mod ui;

/// Log to a file; the terminal itself belongs to the UI.
fn init_logging() {
    let Some(dir) = config::default_state_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::options()
        .create(true)
        .append(true)
        .open(dir.join("vivace.log"))
    else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    runtime::run()
}

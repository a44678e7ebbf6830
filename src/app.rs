//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds pane focus, per-pane
//! selections, the active input prompt and the transient status message.

mod model;

pub use model::*;

#[cfg(test)]
mod tests;

//! Playback engine.
//!
//! One [`Player`] owns the playlist cursor and two source adapters: a
//! rodio-backed adapter for local files and direct streams, and an
//! adapter around the embedded third-party video player. The engine is
//! single-threaded; adapters report completion and failure through an
//! [`AdapterEvent`] channel the runtime drains back into
//! [`Player::handle_event`].

mod adapter;
mod embedded;
mod engine;
mod output;
mod visualizer;

pub use adapter::*;
pub use embedded::*;
pub use engine::*;
pub use output::*;
pub use visualizer::*;

#[cfg(test)]
mod tests;

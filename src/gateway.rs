//! Request-interception caching gateway.
//!
//! Every remote fetch the player makes goes through one [`Gateway`] that
//! sits between callers and the network. Requests are classified by shape
//! and served with a per-class caching strategy backed by a generation
//! scoped [`CacheStore`]. The gateway also owns the `blob:` registry that
//! turns in-memory audio bytes into fetchable locators.

mod backend;
mod classify;
mod service;
mod store;
mod types;

pub use backend::*;
pub use classify::*;
pub use service::*;
pub use store::*;
pub use types::*;

#[cfg(test)]
mod tests;

//! Depot Server - the network face of the depot repository manager
//!
//! Exposes branch and package management plus a live self-upgrade over
//! HTTP:
//! - `branches`: branch listing and creation
//! - `packages`: per-branch package store (list, fetch, publish, remove)
//! - `index`: index rebuild orchestration around the external indexer
//! - `upgrade`: replace-executable-and-restart protocol
//! - `serve`: router assembly and the accept loop
//!
//! Mutating operations on one branch are serialized through `locks`; work
//! on distinct branches proceeds concurrently.

pub mod branches;
pub mod error;
pub mod index;
pub mod locks;
pub mod packages;
pub mod serve;
pub mod state;
pub mod upgrade;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{Result, ServerError};
pub use serve::{router, serve};
pub use state::AppState;
pub use upgrade::RESTART_EXIT_CODE;

/// Literal rendered for empty branch and package listings.
pub const NO_ENTRIES: &str = "No entries.";

//! # FreeAgent Invoice Cache Builder
//!
//! Incrementally mirrors a paginated remote collection (FreeAgent invoices
//! and credit notes) into a local content-addressed file store. The process
//! is short-lived and meant to be invoked repeatedly by a scheduler: each
//! invocation fetches exactly one page, writes every item on it exactly once,
//! and advances a durable progress record, until the mirror reaches the end
//! of the remote collection.
//!
//! ## Guarantees
//!
//! - **Idempotence**: an item file, once written, is never rewritten;
//!   refetching a page produces skips, not duplicates
//! - **Resumability**: progress is saved atomically once per invocation, so
//!   the process can be killed at any point and resumed with no lost work
//! - **Monotonic progress**: `current_page` only ever advances
//!
//! ## Architecture
//!
//! - [`state`] - the persisted progress record, atomic writes, run locking
//! - [`fetcher`] - page transport and pagination metadata parsing
//! - [`identity`] - self-URL to `(kind, id)` resolution
//! - [`output`] - the idempotent item cache
//! - [`catchup`] - the orchestrating per-invocation state machine
//! - [`config`] - on-disk credentials and fetch parameters
//! - [`cli`] - command surface and exit-code mapping

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Catchup orchestration
pub mod catchup;

/// CLI command implementations
pub mod cli;

/// On-disk API configuration
pub mod config;

/// Remote collection fetching
pub mod fetcher;

/// Item identity resolution
pub mod identity;

/// Local item cache
pub mod output;

/// Catchup progress state
pub mod state;

pub use identity::{ItemIdentity, ItemKind};
pub use state::ProgressState;

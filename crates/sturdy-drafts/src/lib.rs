//! # sturdy-drafts
//!
//! Durable, machine-local storage of unsaved editor code, so drafts survive
//! restarts and accidental navigation without server round-trips.
//!
//! ## Modules
//!
//! - `record` — the draft record held per editing context
//! - `keys` — composite key construction
//! - `session` — opaque per-run session identifiers
//! - `store` — the draft database (open/save/load/delete/sweep)
//! - `snippets` — per-language starter code used when no draft exists
//! - `sweeper` — background retention sweep task

pub mod keys;
pub mod record;
pub mod session;
pub mod snippets;
pub mod store;
pub mod sweeper;

pub use record::DraftRecord;
pub use store::DraftStore;
pub use sweeper::DraftSweeper;

//! # sturdy-auth
//!
//! Access token lifecycle management for the CodeSturdy client.
//!
//! ## Modules
//!
//! - `claims` — fail-closed inspection of the expiry claim embedded in a token
//! - `store` — write-through token storage (in-memory value + file mirror)
//! - `observer` — the callback seam notifying application state of token events
//! - `manager` — refresh exchange against the platform, with coalesced retries

pub mod claims;
pub mod manager;
pub mod observer;
pub mod store;

pub use claims::{TokenStatus, inspect, is_expired};
pub use manager::{RefreshResponse, TokenManager};
pub use observer::TokenObserver;
pub use store::TokenStore;

//! The callback seam between token lifecycle events and application state.
//!
//! Higher-level state (an authentication store, a UI model) reacts to token
//! refreshes and expiries by registering an observer, so the token manager
//! never depends on that state directly.

use crate::manager::RefreshResponse;

/// Receives token lifecycle notifications from the [`TokenManager`].
///
/// Both methods default to no-ops; implementors override what they need.
///
/// [`TokenManager`]: crate::manager::TokenManager
pub trait TokenObserver: Send + Sync {
    /// A refresh exchange succeeded and the new token is already stored.
    fn on_refreshed(&self, _response: &RefreshResponse) {}

    /// The refresh credential was rejected; stored tokens have been cleared
    /// and the user must log in again.
    fn on_expired(&self) {}
}

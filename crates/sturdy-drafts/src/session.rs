//! Opaque session identifiers scoping draft records.
//!
//! A session identifier lives as long as the client process, the analog of
//! the browser's tab-scoped session storage. It is random and opaque;
//! nothing outside the draft store interprets it.

use uuid::Uuid;

/// Prefix distinguishing judge-session identifiers in stored keys.
const SESSION_PREFIX: &str = "judge-";

/// Generates a fresh opaque session identifier.
pub fn generate_session_id() -> String {
    format!("{SESSION_PREFIX}{}", Uuid::new_v4())
}

//! The draft record held per editing context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One in-progress, unsubmitted code buffer.
///
/// Identity is the composite of session, problem, section, and language;
/// writing the same identity again overwrites the prior value. No history
/// is retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Composite primary key (see [`crate::keys::draft`]).
    pub id: String,
    /// Session this draft belongs to.
    pub session_id: String,
    /// Problem being worked on.
    pub problem_id: i64,
    /// Course section the problem was opened from.
    pub section_id: i64,
    /// Editor language at capture time.
    pub language: String,
    /// The draft code text.
    pub code: String,
    /// Capture instant, used by the retention sweep.
    pub timestamp: DateTime<Utc>,
    /// Human-readable saved-at label shown in the editor.
    pub saved_at: String,
}

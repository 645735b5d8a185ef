//! Composite key construction for the draft store.
//!
//! Centralising key construction prevents typos and keeps the identity
//! contract in one place: one draft per (session, problem, section,
//! language) tuple. Session scope keeps visits from clobbering each
//! other's drafts; language scope keeps a Python draft from overwriting a
//! C++ draft for the same problem.

/// Primary key for a draft record.
pub fn draft(session_id: &str, problem_id: i64, section_id: i64, language: &str) -> String {
    format!("{session_id}:{problem_id}:{section_id}:{language}")
}

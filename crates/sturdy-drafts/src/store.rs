//! The draft database.
//!
//! An ordered map keyed by the composite draft id, with secondary indexes
//! on session id, problem id, and capture instant maintained on every
//! write. The whole map is snapshotted to a single JSON file after each
//! mutation (temp file + rename), the client's equivalent of the browser's
//! origin-local database. Concurrent processes are last-write-wins, as in
//! the browser original.
//!
//! Connection state machine: Uninitialized -> Opening -> Ready. [`init`]
//! performs the open; every other operation opens implicitly when needed.
//!
//! [`init`]: DraftStore::init

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use sturdy_core::config::drafts::DraftsConfig;
use sturdy_core::error::{AppError, ErrorKind};
use sturdy_core::result::AppResult;

use crate::keys;
use crate::record::DraftRecord;
use crate::session;
use crate::snippets;

/// On-disk snapshot format version.
const SCHEMA_VERSION: u32 = 1;

/// Serialized shape of the snapshot file. Indexes are not persisted; they
/// are rebuilt from the record list on open.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    records: Vec<DraftRecord>,
}

/// In-memory database: primary map plus secondary indexes.
#[derive(Debug, Default)]
struct DraftDb {
    records: BTreeMap<String, DraftRecord>,
    by_session: HashMap<String, BTreeSet<String>>,
    by_problem: HashMap<i64, BTreeSet<String>>,
    by_time: BTreeSet<(DateTime<Utc>, String)>,
}

impl DraftDb {
    fn from_records(records: Vec<DraftRecord>) -> Self {
        let mut db = Self::default();
        for record in records {
            db.insert(record);
        }
        db
    }

    /// Upserts a record, keeping every index consistent.
    fn insert(&mut self, record: DraftRecord) {
        self.remove(&record.id.clone());
        self.by_session
            .entry(record.session_id.clone())
            .or_default()
            .insert(record.id.clone());
        self.by_problem
            .entry(record.problem_id)
            .or_default()
            .insert(record.id.clone());
        self.by_time.insert((record.timestamp, record.id.clone()));
        self.records.insert(record.id.clone(), record);
    }

    /// Removes a record by primary key, keeping every index consistent.
    fn remove(&mut self, id: &str) -> Option<DraftRecord> {
        let record = self.records.remove(id)?;
        if let Some(ids) = self.by_session.get_mut(&record.session_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_session.remove(&record.session_id);
            }
        }
        if let Some(ids) = self.by_problem.get_mut(&record.problem_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_problem.remove(&record.problem_id);
            }
        }
        self.by_time.remove(&(record.timestamp, record.id.clone()));
        Some(record)
    }

    /// Keys of every record captured strictly before `cutoff`.
    fn keys_older_than(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        self.by_time
            .range(..(cutoff, String::new()))
            .map(|(_, id)| id.clone())
            .collect()
    }

    fn keys_for_session(&self, session_id: &str) -> Vec<String> {
        self.by_session
            .get(session_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Durable storage of unsaved code per (session, problem, section,
/// language) editing context.
#[derive(Debug)]
pub struct DraftStore {
    /// Snapshot file location.
    path: PathBuf,
    /// Retention window for the age-based sweep.
    retention: Duration,
    /// Session identifier, generated lazily on first use.
    session_id: OnceLock<String>,
    /// `None` until opened; see the module docs for the state machine.
    db: Mutex<Option<DraftDb>>,
}

impl DraftStore {
    /// Creates a store for the configured snapshot path, with a fresh
    /// session identifier generated on first use.
    pub fn new(config: &DraftsConfig) -> Self {
        Self {
            path: PathBuf::from(&config.db_path),
            retention: Duration::days(config.retention_days as i64),
            session_id: OnceLock::new(),
            db: Mutex::new(None),
        }
    }

    /// Creates a store scoped to an existing session identifier, the analog
    /// of reading one back from session storage.
    pub fn with_session_id(config: &DraftsConfig, session_id: impl Into<String>) -> Self {
        let store = Self::new(config);
        let _ = store.session_id.set(session_id.into());
        store
    }

    /// Returns the session identifier, generating one on first use.
    pub fn session_id(&self) -> &str {
        self.session_id.get_or_init(session::generate_session_id)
    }

    /// Opens the database, creating an empty one if no snapshot exists.
    /// Idempotent: only the first call performs the open.
    pub async fn init(&self) -> AppResult<()> {
        let mut guard = self.db.lock().await;
        Self::ensure_open(&self.path, &mut guard).await?;
        Ok(())
    }

    /// Upserts the draft for (current session, problem, section, language),
    /// stamping a fresh capture instant. Any prior value for that exact key
    /// is overwritten.
    pub async fn save_session_code(
        &self,
        problem_id: i64,
        section_id: i64,
        language: &str,
        code: &str,
    ) -> AppResult<DraftRecord> {
        let session_id = self.session_id().to_string();
        let now = Utc::now();
        let record = DraftRecord {
            id: keys::draft(&session_id, problem_id, section_id, language),
            session_id,
            problem_id,
            section_id,
            language: language.to_string(),
            code: code.to_string(),
            timestamp: now,
            saved_at: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        };

        let mut guard = self.db.lock().await;
        let db = Self::ensure_open(&self.path, &mut guard).await?;
        db.insert(record.clone());
        Self::persist(&self.path, db, "Failed to save session code").await?;
        tracing::debug!(id = %record.id, "Draft saved");
        Ok(record)
    }

    /// Looks up the draft for the exact composite key, if any.
    pub async fn get_session_code(
        &self,
        problem_id: i64,
        section_id: i64,
        language: &str,
    ) -> AppResult<Option<DraftRecord>> {
        let key = keys::draft(self.session_id(), problem_id, section_id, language);
        let mut guard = self.db.lock().await;
        let db = Self::ensure_open(&self.path, &mut guard).await?;
        Ok(db.records.get(&key).cloned())
    }

    /// Returns the draft code for a key, falling back to the language's
    /// canned starter snippet (or an empty buffer) when no draft exists.
    pub async fn code_or_default(
        &self,
        problem_id: i64,
        section_id: i64,
        language: &str,
    ) -> AppResult<String> {
        match self
            .get_session_code(problem_id, section_id, language)
            .await?
        {
            Some(record) => Ok(record.code),
            None => Ok(snippets::default_snippet(language).unwrap_or("").to_string()),
        }
    }

    /// Returns every draft belonging to the current session, newest first.
    pub async fn get_all_session_codes(&self) -> AppResult<Vec<DraftRecord>> {
        let session_id = self.session_id().to_string();
        let mut guard = self.db.lock().await;
        let db = Self::ensure_open(&self.path, &mut guard).await?;

        let mut records: Vec<DraftRecord> = db
            .keys_for_session(&session_id)
            .iter()
            .filter_map(|id| db.records.get(id).cloned())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Returns every draft for a problem across all sessions, via the
    /// problem-id index. Used by tutor-side draft inspection.
    pub async fn get_problem_codes(&self, problem_id: i64) -> AppResult<Vec<DraftRecord>> {
        let mut guard = self.db.lock().await;
        let db = Self::ensure_open(&self.path, &mut guard).await?;

        let ids = db
            .by_problem
            .get(&problem_id)
            .map(|ids| ids.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| db.records.get(id).cloned())
            .collect())
    }

    /// Removes the draft for the exact composite key. Returns whether a
    /// record existed. Called after a successful submission so later loads
    /// fall through to server-authoritative state.
    pub async fn delete_session_code(
        &self,
        problem_id: i64,
        section_id: i64,
        language: &str,
    ) -> AppResult<bool> {
        let key = keys::draft(self.session_id(), problem_id, section_id, language);
        let mut guard = self.db.lock().await;
        let db = Self::ensure_open(&self.path, &mut guard).await?;

        let existed = db.remove(&key).is_some();
        if existed {
            Self::persist(&self.path, db, "Failed to delete session code").await?;
            tracing::debug!(id = %key, "Draft deleted");
        }
        Ok(existed)
    }

    /// Deletes every draft for the current session. Returns the count
    /// removed. Drafts belonging to other sessions are untouched.
    pub async fn clear_current_session(&self) -> AppResult<u64> {
        let session_id = self.session_id().to_string();
        let mut guard = self.db.lock().await;
        let db = Self::ensure_open(&self.path, &mut guard).await?;

        let ids = db.keys_for_session(&session_id);
        let removed = ids.iter().filter(|id| db.remove(id.as_str()).is_some()).count() as u64;
        if removed > 0 {
            Self::persist(&self.path, db, "Failed to clear session data").await?;
        }
        tracing::debug!(session_id, removed, "Session drafts cleared");
        Ok(removed)
    }

    /// Deletes every draft older than the retention window, regardless of
    /// session, scanning via the capture-instant index. Returns the count
    /// removed. Intended to run opportunistically, once per client start.
    pub async fn cleanup_old_data(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - self.retention;
        let mut guard = self.db.lock().await;
        let db = Self::ensure_open(&self.path, &mut guard).await?;

        let ids = db.keys_older_than(cutoff);
        let removed = ids.iter().filter(|id| db.remove(id.as_str()).is_some()).count() as u64;
        if removed > 0 {
            Self::persist(&self.path, db, "Failed to clean up old drafts").await?;
            tracing::info!(removed, %cutoff, "Old drafts cleaned up");
        }
        Ok(removed)
    }

    /// Releases the in-memory database; the snapshot file remains. The next
    /// operation reopens implicitly.
    pub async fn close(&self) {
        *self.db.lock().await = None;
    }

    /// Tears down the store entirely: in-memory state and snapshot file.
    pub async fn delete_database(&self) -> AppResult<()> {
        let mut guard = self.db.lock().await;
        *guard = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                "Failed to delete draft database",
                e,
            )),
        }
    }

    async fn ensure_open<'a>(
        path: &PathBuf,
        guard: &'a mut Option<DraftDb>,
    ) -> AppResult<&'a mut DraftDb> {
        if guard.is_none() {
            *guard = Some(Self::open(path).await?);
        }
        match guard.as_mut() {
            Some(db) => Ok(db),
            None => Err(AppError::internal("Draft database failed to open")),
        }
    }

    async fn open(path: &PathBuf) -> AppResult<DraftDb> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No draft snapshot, starting empty");
                return Ok(DraftDb::default());
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    "Failed to open draft database",
                    e,
                ));
            }
        };

        let snapshot: SnapshotFile = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to open draft database", e)
        })?;
        if snapshot.version != SCHEMA_VERSION {
            return Err(AppError::storage(format!(
                "Unsupported draft database version {}",
                snapshot.version
            )));
        }

        Ok(DraftDb::from_records(snapshot.records))
    }

    async fn persist(path: &PathBuf, db: &DraftDb, context: &'static str) -> AppResult<()> {
        let snapshot = SnapshotFile {
            version: SCHEMA_VERSION,
            records: db.records.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| AppError::with_source(ErrorKind::Storage, context, e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Storage, context, e))?;
        }

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, context, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, context, e))?;
        Ok(())
    }
}

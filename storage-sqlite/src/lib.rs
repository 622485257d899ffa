#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! # HomeIQ Storage SQLite
//!
//! A libSQL-backed [`StorageBackend`](homeiq_core::storage::StorageBackend)
//! implementation: one JSON-blob table per repository named in spec §3, plus
//! the narrow set of indexed columns each repository's lookups actually need
//! (identity keys, status, foreign keys). Everything else — the
//! [`PatternFilter`]/[`SynergyFilter`] predicates, status filtering on
//! suggestions — runs in Rust over the deserialized rows, matching the scale
//! of a single household rather than a multi-tenant fleet.
//!
//! Modeled on the teacher's `memory-storage-turso` crate: an
//! `Arc<libsql::Database>`-backed struct, an `initialize_schema` that is safe
//! to call repeatedly, and the core `StorageBackend` trait implemented
//! directly against SQL rather than through a connection-pool/cache stack
//! (dropped here — see `DESIGN.md`).
//!
//! ## Example
//!
//! ```no_run
//! use homeiq_storage_sqlite::SqliteStorage;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let storage = SqliteStorage::new("file:homeiq.db").await?;
//! storage.initialize_schema().await?;
//! # Ok(())
//! # }
//! ```

mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use homeiq_core::config::UserPreferences;
use homeiq_core::storage::{AskAiSession, PatternFilter, StorageBackend, SynergyFilter};
use homeiq_core::types::{
    AliasMap, AnalysisRun, DeviceCapability, DeviceId, EntityId, FeatureUsage, Pattern, PatternId,
    PatternSnapshot, QueryMemory, RunId, RunStatus, SessionId, Suggestion, SuggestionId,
    SuggestionStatus, Synergy,
};
use homeiq_core::{Error, Result};
use libsql::{params, Builder, Connection, Database};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A libSQL-backed [`StorageBackend`].
pub struct SqliteStorage {
    db: Arc<Database>,
}

impl SqliteStorage {
    /// Opens `url` (`file:path.db`, `:memory:`, or `libsql://...` with a
    /// separate `connect_remote` for the authenticated case) and returns an
    /// un-migrated handle; call [`Self::initialize_schema`] before use.
    pub async fn new(url: &str) -> Result<Self> {
        let db = if let Some(path) = url.strip_prefix("file:") {
            Builder::new_local(path)
                .build()
                .await
                .map_err(|err| Error::Storage(format!("failed to open {url}: {err}")))?
        } else if url == ":memory:" {
            Builder::new_local(":memory:")
                .build()
                .await
                .map_err(|err| Error::Storage(format!("failed to open in-memory db: {err}")))?
        } else {
            return Err(Error::InvalidInput(format!(
                "unsupported storage url {url}: expected file:<path> or :memory:"
            )));
        };
        Ok(Self { db: Arc::new(db) })
    }

    /// For connecting to an already-open remote/embedded-replica `Database`
    /// (e.g. a Turso-hosted libSQL instance configured by the caller).
    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Creates every table and index if missing. Safe to call on every
    /// process start.
    pub async fn initialize_schema(&self) -> Result<()> {
        info!("initializing sqlite schema");
        let conn = self.connect()?;
        for statement in [
            schema::CREATE_PATTERNS_TABLE,
            schema::CREATE_PATTERN_SNAPSHOTS_TABLE,
            schema::CREATE_PATTERN_SNAPSHOTS_PATTERN_INDEX,
            schema::CREATE_SYNERGIES_TABLE,
            schema::CREATE_SUGGESTIONS_TABLE,
            schema::CREATE_SUGGESTIONS_STATUS_INDEX,
            schema::CREATE_DEVICE_CAPABILITIES_TABLE,
            schema::CREATE_FEATURE_USAGE_TABLE,
            schema::CREATE_FEATURE_USAGE_DEVICE_INDEX,
            schema::CREATE_ALIASES_TABLE,
            schema::CREATE_QUERY_MEMORIES_TABLE,
            schema::CREATE_QUERY_MEMORIES_USER_INDEX,
            schema::CREATE_PREFERENCES_TABLE,
            schema::CREATE_ANALYSIS_RUNS_TABLE,
            schema::CREATE_ANALYSIS_RUNS_STATUS_INDEX,
            schema::CREATE_ASK_AI_SESSIONS_TABLE,
        ] {
            conn.execute(statement, ())
                .await
                .map_err(|err| Error::Storage(format!("schema init failed: {err}")))?;
        }
        Ok(())
    }

    fn connect(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|err| Error::Storage(format!("failed to open connection: {err}")))
    }

    async fn fetch_blob(&self, sql: &str, key: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(sql, params![key.to_string()])
            .await
            .map_err(|err| Error::Storage(err.to_string()))?;
        match rows.next().await.map_err(|err| Error::Storage(err.to_string()))? {
            Some(row) => Ok(Some(row.get::<String>(0).map_err(|err| Error::Storage(err.to_string()))?)),
            None => Ok(None),
        }
    }

    async fn fetch_all_blobs(&self, sql: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(sql, ())
            .await
            .map_err(|err| Error::Storage(err.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|err| Error::Storage(err.to_string()))? {
            out.push(row.get::<String>(0).map_err(|err| Error::Storage(err.to_string()))?);
        }
        Ok(out)
    }

    async fn fetch_all_blobs_by(&self, sql: &str, key: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(sql, params![key.to_string()])
            .await
            .map_err(|err| Error::Storage(err.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|err| Error::Storage(err.to_string()))? {
            out.push(row.get::<String>(0).map_err(|err| Error::Storage(err.to_string()))?);
        }
        Ok(out)
    }

    async fn list_all<T: DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>> {
        self.fetch_all_blobs(sql)
            .await?
            .into_iter()
            .map(|blob| serde_json::from_str(&blob).map_err(Error::Serialization))
            .collect()
    }

    async fn list_all_by<T: DeserializeOwned>(&self, sql: &str, key: &str) -> Result<Vec<T>> {
        self.fetch_all_blobs_by(sql, key)
            .await?
            .into_iter()
            .map(|blob| serde_json::from_str(&blob).map_err(Error::Serialization))
            .collect()
    }

    async fn get_one<T: DeserializeOwned>(&self, sql: &str, key: &str) -> Result<Option<T>> {
        match self.fetch_blob(sql, key).await? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }
}

fn to_blob<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Error::Serialization)
}

/// The serde `rename_all = "snake_case"` tag a unit-like enum serializes to,
/// used for the narrow indexed status columns (`suggestions.status`,
/// `analysis_runs.status`).
fn tag_str<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value).map_err(Error::Serialization)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(Error::Storage(format!("expected a string tag, got {other}"))),
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    // --- Patterns ---------------------------------------------------------

    async fn find_pattern_by_identity(&self, identity_key: &str) -> Result<Option<Pattern>> {
        self.get_one("SELECT data FROM patterns WHERE identity_key = ?1", identity_key)
            .await
    }

    async fn insert_pattern(&self, pattern: &Pattern) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO patterns (id, identity_key, data) VALUES (?1, ?2, ?3)",
            params![pattern.id.to_string(), pattern.identity_key(), to_blob(pattern)?],
        )
        .await
        .map_err(|err| Error::PersistenceConflict(err.to_string()))?;
        Ok(())
    }

    async fn replace_pattern(&self, pattern: &Pattern) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE patterns SET identity_key = ?2, data = ?3 WHERE id = ?1",
            params![pattern.id.to_string(), pattern.identity_key(), to_blob(pattern)?],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn append_pattern_snapshot(&self, snapshot: &PatternSnapshot) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO pattern_snapshots (pattern_id, taken_at, data) VALUES (?1, ?2, ?3)",
            params![
                snapshot.pattern_id.to_string(),
                snapshot.taken_at.to_rfc3339(),
                to_blob(snapshot)?
            ],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn list_pattern_snapshots(&self, pattern_id: PatternId, limit: usize) -> Result<Vec<PatternSnapshot>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT data FROM pattern_snapshots WHERE pattern_id = ?1 ORDER BY taken_at DESC LIMIT ?2",
                params![pattern_id.to_string(), limit as i64],
            )
            .await
            .map_err(|err| Error::Storage(err.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|err| Error::Storage(err.to_string()))? {
            let blob: String = row.get(0).map_err(|err| Error::Storage(err.to_string()))?;
            out.push(serde_json::from_str(&blob)?);
        }
        Ok(out)
    }

    async fn list_patterns(&self, filter: &PatternFilter) -> Result<Vec<Pattern>> {
        let all: Vec<Pattern> = self.list_all("SELECT data FROM patterns").await?;
        Ok(all.into_iter().filter(|pattern| filter.matches(pattern)).collect())
    }

    async fn get_pattern(&self, id: PatternId) -> Result<Option<Pattern>> {
        self.get_one("SELECT data FROM patterns WHERE id = ?1", &id.to_string()).await
    }

    async fn prune_patterns_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let all: Vec<Pattern> = self.list_all("SELECT data FROM patterns").await?;
        let stale: Vec<_> = all.into_iter().filter(|pattern| pattern.last_seen < cutoff).collect();
        let conn = self.connect()?;
        for pattern in &stale {
            conn.execute("DELETE FROM patterns WHERE id = ?1", params![pattern.id.to_string()])
                .await
                .map_err(|err| Error::Storage(err.to_string()))?;
        }
        Ok(stale.len())
    }

    // --- Synergies ----------------------------------------------------------

    async fn find_synergy_by_identity(&self, identity_key: &str) -> Result<Option<Synergy>> {
        self.get_one("SELECT data FROM synergies WHERE identity_key = ?1", identity_key)
            .await
    }

    async fn insert_synergy(&self, synergy: &Synergy) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO synergies (id, identity_key, data) VALUES (?1, ?2, ?3)",
            params![synergy.id.to_string(), synergy.identity_key(), to_blob(synergy)?],
        )
        .await
        .map_err(|err| Error::PersistenceConflict(err.to_string()))?;
        Ok(())
    }

    async fn replace_synergy(&self, synergy: &Synergy) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE synergies SET identity_key = ?2, data = ?3 WHERE id = ?1",
            params![synergy.id.to_string(), synergy.identity_key(), to_blob(synergy)?],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn list_synergies(&self, filter: &SynergyFilter) -> Result<Vec<Synergy>> {
        let all: Vec<Synergy> = self.list_all("SELECT data FROM synergies").await?;
        Ok(all.into_iter().filter(|synergy| filter.matches(synergy)).collect())
    }

    // --- Suggestions --------------------------------------------------------

    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO suggestions (id, status, data) VALUES (?1, ?2, ?3)",
            params![
                suggestion.id.to_string(),
                tag_str(&suggestion.status)?,
                to_blob(suggestion)?
            ],
        )
        .await
        .map_err(|err| Error::PersistenceConflict(err.to_string()))?;
        Ok(())
    }

    async fn save_suggestion(&self, suggestion: &Suggestion) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE suggestions SET status = ?2, data = ?3 WHERE id = ?1",
            params![
                suggestion.id.to_string(),
                tag_str(&suggestion.status)?,
                to_blob(suggestion)?
            ],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>> {
        self.get_one("SELECT data FROM suggestions WHERE id = ?1", &id.to_string()).await
    }

    async fn list_suggestions(&self, status: Option<SuggestionStatus>) -> Result<Vec<Suggestion>> {
        match status {
            Some(status) => self.list_all_by("SELECT data FROM suggestions WHERE status = ?1", &tag_str(&status)?).await,
            None => self.list_all("SELECT data FROM suggestions").await,
        }
    }

    // --- Capabilities / feature usage ---------------------------------------

    async fn upsert_device_capability(&self, capability: &DeviceCapability) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO device_capabilities (device_id, data) VALUES (?1, ?2)
             ON CONFLICT(device_id) DO UPDATE SET data = excluded.data",
            params![capability.device_id.to_string(), to_blob(capability)?],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn list_device_capabilities(&self) -> Result<Vec<DeviceCapability>> {
        self.list_all("SELECT data FROM device_capabilities").await
    }

    async fn record_feature_usage(&self, usage: &FeatureUsage) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO feature_usage (device_id, capability_name, data) VALUES (?1, ?2, ?3)",
            params![usage.device_id.to_string(), usage.capability_name.clone(), to_blob(usage)?],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn list_feature_usage(&self, device_id: &DeviceId) -> Result<Vec<FeatureUsage>> {
        self.list_all_by("SELECT data FROM feature_usage WHERE device_id = ?1", device_id.as_str())
            .await
    }

    // --- Aliases --------------------------------------------------------------

    async fn create_alias(&self, alias: &AliasMap) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO aliases (user_id, alias, data) VALUES (?1, ?2, ?3)",
            params![alias.user_id.clone(), alias.alias.clone(), to_blob(alias)?],
        )
        .await
        .map_err(|err| Error::PersistenceConflict(err.to_string()))?;
        Ok(())
    }

    async fn delete_alias(&self, user_id: &str, alias: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM aliases WHERE user_id = ?1 AND alias = ?2",
            params![user_id.to_string(), alias.to_string()],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn list_aliases(&self, user_id: &str) -> Result<Vec<AliasMap>> {
        self.list_all_by("SELECT data FROM aliases WHERE user_id = ?1", user_id).await
    }

    async fn resolve_alias(&self, user_id: &str, alias: &str) -> Result<Option<EntityId>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT data FROM aliases WHERE user_id = ?1 AND alias = ?2",
                params![user_id.to_string(), alias.to_string()],
            )
            .await
            .map_err(|err| Error::Storage(err.to_string()))?;
        match rows.next().await.map_err(|err| Error::Storage(err.to_string()))? {
            Some(row) => {
                let blob: String = row.get(0).map_err(|err| Error::Storage(err.to_string()))?;
                let entry: AliasMap = serde_json::from_str(&blob)?;
                Ok(Some(entry.target_entity_id))
            }
            None => Ok(None),
        }
    }

    // --- Retrieval cache persistence (C9) -------------------------------------

    async fn insert_query_memory(&self, memory: &QueryMemory) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO query_memories (id, user_id, data) VALUES (?1, ?2, ?3)",
            params![memory.id.to_string(), memory.user_id.clone(), to_blob(memory)?],
        )
        .await
        .map_err(|err| Error::PersistenceConflict(err.to_string()))?;
        Ok(())
    }

    async fn list_query_memories(&self, user_id: Option<&str>) -> Result<Vec<QueryMemory>> {
        match user_id {
            Some(user_id) => {
                self.list_all_by("SELECT data FROM query_memories WHERE user_id = ?1", user_id).await
            }
            None => self.list_all("SELECT data FROM query_memories").await,
        }
    }

    // --- Preferences -----------------------------------------------------------

    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        Ok(self
            .get_one("SELECT data FROM preferences WHERE user_id = ?1", user_id)
            .await?
            .unwrap_or_default())
    }

    async fn set_preferences(&self, user_id: &str, preferences: &UserPreferences) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO preferences (user_id, data) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data",
            params![user_id.to_string(), to_blob(preferences)?],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    // --- Analysis runs -----------------------------------------------------------

    async fn start_run(&self, run: &AnalysisRun) -> Result<()> {
        if self.current_running_run().await?.is_some() {
            return Err(Error::InvalidState(
                "another analysis run is already running".to_string(),
            ));
        }
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO analysis_runs (id, status, data) VALUES (?1, ?2, ?3)",
            params![run.id.to_string(), tag_str(&run.status)?, to_blob(run)?],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn save_run(&self, run: &AnalysisRun) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE analysis_runs SET status = ?2, data = ?3 WHERE id = ?1",
            params![run.id.to_string(), tag_str(&run.status)?, to_blob(run)?],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn current_running_run(&self) -> Result<Option<AnalysisRun>> {
        let running = tag_str(&RunStatus::Running)?;
        self.list_all_by::<AnalysisRun>("SELECT data FROM analysis_runs WHERE status = ?1", &running)
            .await
            .map(|mut runs| {
                debug!(count = runs.len(), "running analysis runs found");
                runs.pop()
            })
    }

    async fn get_run(&self, id: RunId) -> Result<Option<AnalysisRun>> {
        self.get_one("SELECT data FROM analysis_runs WHERE id = ?1", &id.to_string()).await
    }

    // --- Ask-AI session persistence (C8: survive restarts) -----------------------

    async fn save_ask_ai_session(&self, session: &AskAiSession) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO ask_ai_sessions (id, data) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
            params![session.id.to_string(), to_blob(session)?],
        )
        .await
        .map_err(|err| Error::Storage(err.to_string()))?;
        Ok(())
    }

    async fn get_ask_ai_session(&self, id: SessionId) -> Result<Option<AskAiSession>> {
        self.get_one("SELECT data FROM ask_ai_sessions WHERE id = ?1", &id.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homeiq_core::types::{EntityId, PatternKind, PatternMetadata, WeekdayMask};

    async fn open() -> SqliteStorage {
        let storage = SqliteStorage::new(":memory:").await.unwrap();
        storage.initialize_schema().await.unwrap();
        storage
    }

    fn sample_pattern() -> Pattern {
        Pattern::new(
            EntityId::new("light.office").unwrap(),
            PatternMetadata::TimeOfDay {
                hour: 7,
                weekday_mask: WeekdayMask(WeekdayMask::WEEKDAYS),
            },
            0.8,
            6,
            5,
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_and_find_pattern_by_identity() {
        let storage = open().await;
        let pattern = sample_pattern();
        storage.insert_pattern(&pattern).await.unwrap();

        let found = storage
            .find_pattern_by_identity(&pattern.identity_key())
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, pattern.id);
    }

    #[tokio::test]
    async fn list_patterns_applies_the_filter_in_rust() {
        let storage = open().await;
        storage.insert_pattern(&sample_pattern()).await.unwrap();

        let matches = storage.list_patterns(&PatternFilter::all()).await.unwrap();
        assert_eq!(matches.len(), 1);

        let by_kind = storage
            .list_patterns(&PatternFilter::all().with_kind(PatternKind::CoOccurrence))
            .await
            .unwrap();
        assert!(by_kind.is_empty());
    }

    #[tokio::test]
    async fn second_concurrent_run_is_refused() {
        let storage = open().await;
        let now = Utc::now();
        let first = AnalysisRun::start(now);
        storage.start_run(&first).await.unwrap();

        let second = AnalysisRun::start(now);
        assert!(storage.start_run(&second).await.is_err());
    }

    #[tokio::test]
    async fn preferences_round_trip_and_default_when_absent() {
        let storage = open().await;
        let defaulted = storage.get_preferences("default").await.unwrap();
        assert_eq!(defaulted, UserPreferences::default());

        let mut custom = UserPreferences::default();
        custom.max_suggestions = 7;
        storage.set_preferences("default", &custom).await.unwrap();
        let fetched = storage.get_preferences("default").await.unwrap();
        assert_eq!(fetched.max_suggestions, 7);
    }
}

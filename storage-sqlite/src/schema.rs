//! Table definitions for the libSQL-backed [`crate::SqliteStorage`].
//!
//! Every row carries its natural key plus a `data` JSON column holding the
//! full `serde`-encoded value; query/filter predicates that spec §3 doesn't
//! name as an index run in Rust against the deserialized rows (mirroring
//! [`homeiq_core::storage::filters`]), matching the scale of a single
//! household's event history rather than a multi-tenant fleet.

pub const CREATE_PATTERNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS patterns (
    id TEXT PRIMARY KEY NOT NULL,
    identity_key TEXT NOT NULL UNIQUE,
    data TEXT NOT NULL
)
"#;

pub const CREATE_PATTERN_SNAPSHOTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pattern_snapshots (
    pattern_id TEXT NOT NULL,
    taken_at TEXT NOT NULL,
    data TEXT NOT NULL
)
"#;

pub const CREATE_PATTERN_SNAPSHOTS_PATTERN_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_pattern_snapshots_pattern ON pattern_snapshots(pattern_id, taken_at DESC)";

pub const CREATE_SYNERGIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS synergies (
    id TEXT PRIMARY KEY NOT NULL,
    identity_key TEXT NOT NULL UNIQUE,
    data TEXT NOT NULL
)
"#;

pub const CREATE_SUGGESTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS suggestions (
    id TEXT PRIMARY KEY NOT NULL,
    status TEXT NOT NULL,
    data TEXT NOT NULL
)
"#;

pub const CREATE_SUGGESTIONS_STATUS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_suggestions_status ON suggestions(status)";

pub const CREATE_DEVICE_CAPABILITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS device_capabilities (
    device_id TEXT PRIMARY KEY NOT NULL,
    data TEXT NOT NULL
)
"#;

pub const CREATE_FEATURE_USAGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS feature_usage (
    device_id TEXT NOT NULL,
    capability_name TEXT NOT NULL,
    data TEXT NOT NULL
)
"#;

pub const CREATE_FEATURE_USAGE_DEVICE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_feature_usage_device ON feature_usage(device_id)";

pub const CREATE_ALIASES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS aliases (
    user_id TEXT NOT NULL,
    alias TEXT NOT NULL,
    data TEXT NOT NULL,
    PRIMARY KEY (user_id, alias)
)
"#;

pub const CREATE_QUERY_MEMORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS query_memories (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    data TEXT NOT NULL
)
"#;

pub const CREATE_QUERY_MEMORIES_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_query_memories_user ON query_memories(user_id)";

pub const CREATE_PREFERENCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    user_id TEXT PRIMARY KEY NOT NULL,
    data TEXT NOT NULL
)
"#;

pub const CREATE_ANALYSIS_RUNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS analysis_runs (
    id TEXT PRIMARY KEY NOT NULL,
    status TEXT NOT NULL,
    data TEXT NOT NULL
)
"#;

pub const CREATE_ANALYSIS_RUNS_STATUS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_analysis_runs_status ON analysis_runs(status)";

pub const CREATE_ASK_AI_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ask_ai_sessions (
    id TEXT PRIMARY KEY NOT NULL,
    data TEXT NOT NULL
)
"#;

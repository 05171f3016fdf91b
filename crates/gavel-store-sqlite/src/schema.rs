//! SQL schema for the gavel SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per strike unit. Rows are never updated; the only DELETE is the
-- explicit administrative removal of a single record.
CREATE TABLE IF NOT EXISTS strikes (
    record_id       TEXT PRIMARY KEY,
    group_id        TEXT NOT NULL,   -- decimal u64
    subject_id      TEXT NOT NULL,   -- decimal u64
    issued_at       TEXT NOT NULL,   -- fixed-width RFC 3339 UTC, microseconds
    moderator_id    TEXT NOT NULL,   -- decimal u64
    reference_link  TEXT,
    reason          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS strikes_subject_time_idx
    ON strikes(group_id, subject_id, issued_at);

PRAGMA user_version = 1;
";

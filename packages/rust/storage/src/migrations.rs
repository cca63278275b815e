//! SQL migration definitions for the builder directory database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: builders, runs",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Directory records, one per normalized business name
CREATE TABLE IF NOT EXISTS builders (
    id              TEXT PRIMARY KEY,
    normalized_name TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL,
    website         TEXT NOT NULL,
    address         TEXT,
    city            TEXT,
    state           TEXT NOT NULL,
    zip             TEXT,
    phone           TEXT,
    email           TEXT,
    lat             REAL,
    lng             REAL,
    description     TEXT,
    van_types       TEXT,
    amenities       TEXT NOT NULL DEFAULT '[]',
    services        TEXT NOT NULL DEFAULT '[]',
    social_media    TEXT NOT NULL DEFAULT '{}',
    photos          TEXT NOT NULL DEFAULT '[]',
    content_hash    TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_builders_state ON builders(state);

-- Batch run history
CREATE TABLE IF NOT EXISTS runs (
    id          TEXT PRIMARY KEY,
    input       TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    report_json TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
    ]
}

//! SQL schema for the Leadbook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Ownership and actor columns carry no foreign keys: a principal resolved
/// from a trusted token id need not have a local user row, and user removal
/// rewrites those columns explicitly.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,  -- lower-cased
    name          TEXT,
    role          TEXT NOT NULL DEFAULT 'user',  -- 'user' | 'admin'
    password_hash TEXT,                  -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS buyers (
    buyer_id      TEXT PRIMARY KEY,
    full_name     TEXT NOT NULL,
    email         TEXT,
    phone         TEXT NOT NULL,
    city          TEXT NOT NULL,
    property_type TEXT NOT NULL,
    bhk           TEXT,
    purpose       TEXT NOT NULL,
    budget_min    INTEGER,
    budget_max    INTEGER,
    timeline      TEXT NOT NULL,
    source        TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'New',
    notes         TEXT,
    tags          TEXT NOT NULL DEFAULT '[]',  -- JSON array
    owner_id      TEXT,                        -- NULL once orphaned
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    CHECK (budget_min IS NULL OR budget_max IS NULL OR budget_max >= budget_min)
);

-- History is append-only. The only UPDATE ever issued nulls changed_by
-- when the acting user is removed. Entries outlive their buyer.
CREATE TABLE IF NOT EXISTS buyer_history (
    entry_id   TEXT PRIMARY KEY,
    buyer_id   TEXT NOT NULL,
    changed_by TEXT,
    changed_at TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    diff       TEXT NOT NULL    -- JSON-encoded Change
);

CREATE INDEX IF NOT EXISTS buyers_owner_idx    ON buyers(owner_id);
CREATE INDEX IF NOT EXISTS buyers_updated_idx  ON buyers(updated_at);
CREATE INDEX IF NOT EXISTS history_buyer_idx   ON buyer_history(buyer_id, changed_at);

PRAGMA user_version = 1;
";

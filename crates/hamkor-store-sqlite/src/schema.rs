//! SQL schema for the Hamkor SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id     TEXT PRIMARY KEY,
    phone           TEXT NOT NULL UNIQUE,   -- canonical, '+' prefixed
    chat_binding_id INTEGER UNIQUE,         -- telegram user id, NULL until bound
    role            TEXT NOT NULL DEFAULT 'customer',
    otp_code        TEXT,
    otp_issued_at   TEXT,                   -- RFC 3339 UTC, micros
    rating          REAL NOT NULL DEFAULT 0.0,
    created_at      TEXT NOT NULL,
    CHECK ((otp_code IS NULL) = (otp_issued_at IS NULL))
);

-- Only is_read is ever updated, and only 0 -> 1.
CREATE TABLE IF NOT EXISTS messages (
    message_id  TEXT PRIMARY KEY,
    sender_id   TEXT NOT NULL REFERENCES identities(identity_id),
    receiver_id TEXT NOT NULL REFERENCES identities(identity_id),
    content     TEXT,
    image_url   TEXT,
    is_read     INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    CHECK (content IS NOT NULL OR image_url IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS reviews (
    review_id  TEXT PRIMARY KEY,
    from_id    TEXT NOT NULL REFERENCES identities(identity_id),
    to_id      TEXT NOT NULL REFERENCES identities(identity_id),
    stars      INTEGER NOT NULL CHECK (stars BETWEEN 1 AND 5),
    text       TEXT,
    created_at TEXT NOT NULL,
    CHECK (from_id != to_id)
);

CREATE INDEX IF NOT EXISTS messages_sender_idx   ON messages(sender_id, created_at);
CREATE INDEX IF NOT EXISTS messages_receiver_idx ON messages(receiver_id, is_read);
CREATE INDEX IF NOT EXISTS reviews_to_idx        ON reviews(to_id, created_at);

PRAGMA user_version = 1;
";

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                display_name    TEXT NOT NULL,
                password_hash   TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1,
                is_admin        INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE invites (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL,
                token               TEXT NOT NULL UNIQUE,
                expires_at          TEXT NOT NULL,
                used_at             TEXT,
                created_by_user_id  TEXT NOT NULL REFERENCES users(id),
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_invites_email ON invites(email);

            CREATE TABLE sources (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                type            TEXT NOT NULL DEFAULT 'other',
                name            TEXT NOT NULL,
                url             TEXT,
                notes           TEXT,
                is_canonical    INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_sources_user ON sources(user_id, created_at);

            -- One canonical source per (user, type); manual sources are unconstrained.
            CREATE UNIQUE INDEX uq_sources_canonical
                ON sources(user_id, type) WHERE is_canonical = 1;

            CREATE TABLE intake_items (
                id                  TEXT PRIMARY KEY,
                user_id             TEXT NOT NULL REFERENCES users(id),
                raw_text            TEXT NOT NULL,
                source_id           TEXT REFERENCES sources(id),
                source_post_url     TEXT,
                captured_at         TEXT NOT NULL,
                status              TEXT NOT NULL DEFAULT 'new',
                matched_book_id     TEXT,
                match_confidence    REAL,
                parse_json          TEXT NOT NULL DEFAULT '{}',
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_intake_user ON intake_items(user_id, captured_at);
            CREATE INDEX idx_intake_status ON intake_items(user_id, status);

            CREATE TABLE owned_items (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                author          TEXT,
                format          TEXT NOT NULL DEFAULT 'hardcover',
                is_favorite     INTEGER NOT NULL DEFAULT 0,
                acquired_at     TEXT,
                notes           TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_owned_user ON owned_items(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

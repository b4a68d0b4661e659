use crate::models::{NewSource, SourceRow};
use crate::queries::OptionalExt;
use crate::{Database, new_id, now_utc};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};

const SOURCE_COLUMNS: &str = "id, user_id, type, name, url, notes, is_canonical, created_at";

impl Database {
    pub fn list_sources(&self, user_id: &str) -> Result<Vec<SourceRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SOURCE_COLUMNS} FROM sources
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], source_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Explicit, user-initiated creation. No uniqueness is enforced here.
    pub fn create_source(&self, source: &NewSource<'_>) -> Result<SourceRow> {
        self.with_conn(|conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO sources (id, user_id, type, name, url, notes, is_canonical, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                rusqlite::params![
                    id,
                    source.user_id,
                    source.source_type,
                    source.name,
                    source.url,
                    source.notes,
                    now_utc()
                ],
            )?;
            query_source(conn, &id)?.ok_or_else(|| anyhow!("Source vanished after insert: {}", id))
        })
    }

    /// Return the id of the user's source for `source_type`, creating the
    /// canonical one if the user has none.
    pub fn find_or_create_canonical_source(
        &self,
        user_id: &str,
        source_type: &str,
        default_name: &str,
    ) -> Result<String> {
        self.with_conn(|conn| canonical_source_id(conn, user_id, source_type, default_name))
    }

    /// Insert-or-fetch of the canonical row, skipping the initial lookup.
    /// Losing a race to another writer returns the winner's id.
    #[doc(hidden)]
    pub fn insert_canonical_source(
        &self,
        user_id: &str,
        source_type: &str,
        default_name: &str,
    ) -> Result<String> {
        self.with_conn(|conn| insert_canonical(conn, user_id, source_type, default_name))
    }
}

/// Works on a plain connection or inside a caller's transaction.
pub(crate) fn canonical_source_id(
    conn: &Connection,
    user_id: &str,
    source_type: &str,
    default_name: &str,
) -> Result<String> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM sources
             WHERE user_id = ?1 AND type = ?2
             ORDER BY is_canonical DESC, created_at ASC, rowid ASC
             LIMIT 1",
            [user_id, source_type],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => Ok(id),
        None => insert_canonical(conn, user_id, source_type, default_name),
    }
}

fn insert_canonical(
    conn: &Connection,
    user_id: &str,
    source_type: &str,
    default_name: &str,
) -> Result<String> {
    let id = new_id();
    let inserted = conn.execute(
        "INSERT INTO sources (id, user_id, type, name, is_canonical, created_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)
         ON CONFLICT DO NOTHING",
        rusqlite::params![id, user_id, source_type, default_name, now_utc()],
    )?;
    if inserted == 1 {
        return Ok(id);
    }

    conn.query_row(
        "SELECT id FROM sources WHERE user_id = ?1 AND type = ?2 AND is_canonical = 1",
        [user_id, source_type],
        |row| row.get(0),
    )
    .map_err(|e| anyhow!("Canonical source missing after conflict: {}", e))
}

fn query_source(conn: &Connection, id: &str) -> Result<Option<SourceRow>> {
    let sql = format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE id = ?1");
    conn.query_row(&sql, [id], source_from_row).optional()
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<SourceRow> {
    Ok(SourceRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        source_type: row.get(2)?,
        name: row.get(3)?,
        url: row.get(4)?,
        notes: row.get(5)?,
        is_canonical: row.get(6)?,
        created_at: row.get(7)?,
    })
}

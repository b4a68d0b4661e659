use crate::models::{CanonicalSource, IntakeRow, NewIntakeItem};
use crate::queries::OptionalExt;
use crate::sources::canonical_source_id;
use crate::{Database, new_id, now_utc};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};

/// Source name/type are LEFT JOINed so listing is a single query (no N+1).
const INTAKE_SELECT: &str = "SELECT i.id, i.user_id, i.raw_text, i.source_id, i.source_post_url,
        i.captured_at, i.status, i.matched_book_id, i.match_confidence, i.parse_json,
        i.created_at, s.name, s.type
     FROM intake_items i
     LEFT JOIN sources s ON i.source_id = s.id";

impl Database {
    /// Persist a captured item with status `new`.
    ///
    /// `auto_source` is resolved to the user's canonical source when the item
    /// carries no explicit `source_id`; resolution and insert share one
    /// transaction. Returns `None` if an explicit `source_id` does not belong
    /// to the user.
    pub fn create_intake_item(
        &self,
        item: &NewIntakeItem<'_>,
        auto_source: Option<CanonicalSource<'_>>,
    ) -> Result<Option<IntakeRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let source_id = match (item.source_id, auto_source) {
                (Some(explicit), _) => {
                    let owned: Option<i64> = tx
                        .query_row(
                            "SELECT 1 FROM sources WHERE id = ?1 AND user_id = ?2",
                            [explicit, item.user_id],
                            |row| row.get(0),
                        )
                        .optional()?;
                    if owned.is_none() {
                        return Ok(None);
                    }
                    Some(explicit.to_string())
                }
                (None, Some(auto)) => Some(canonical_source_id(
                    &tx,
                    item.user_id,
                    auto.source_type,
                    auto.default_name,
                )?),
                (None, None) => None,
            };

            let id = new_id();
            let now = now_utc();
            tx.execute(
                "INSERT INTO intake_items
                    (id, user_id, raw_text, source_id, source_post_url, captured_at, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'new', ?6)",
                rusqlite::params![id, item.user_id, item.raw_text, source_id, item.source_post_url, now],
            )?;

            let row = query_intake(&tx, item.user_id, &id)?
                .ok_or_else(|| anyhow!("Intake item vanished after insert: {}", id))?;
            tx.commit()?;
            Ok(Some(row))
        })
    }

    /// Newest capture first. `status` is an exact match when given.
    pub fn list_intake_items(&self, user_id: &str, status: Option<&str>) -> Result<Vec<IntakeRow>> {
        self.with_conn(|conn| {
            let mut sql = format!("{INTAKE_SELECT} WHERE i.user_id = ?1");
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
            if let Some(status) = &status {
                sql.push_str(" AND i.status = ?2");
                params.push(status);
            }
            sql.push_str(" ORDER BY i.captured_at DESC, i.rowid DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), intake_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    #[doc(hidden)]
    pub fn get_intake_item(&self, user_id: &str, id: &str) -> Result<Option<IntakeRow>> {
        self.with_conn(|conn| query_intake(conn, user_id, id))
    }
}

/// Owner-scoped lookup; another user's item reads as absent.
pub(crate) fn query_intake(conn: &Connection, user_id: &str, id: &str) -> Result<Option<IntakeRow>> {
    let sql = format!("{INTAKE_SELECT} WHERE i.id = ?1 AND i.user_id = ?2");
    conn.query_row(&sql, [id, user_id], intake_from_row).optional()
}

fn intake_from_row(row: &Row<'_>) -> rusqlite::Result<IntakeRow> {
    Ok(IntakeRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        raw_text: row.get(2)?,
        source_id: row.get(3)?,
        source_post_url: row.get(4)?,
        captured_at: row.get(5)?,
        status: row.get(6)?,
        matched_book_id: row.get(7)?,
        match_confidence: row.get(8)?,
        parse_json: row.get(9)?,
        created_at: row.get(10)?,
        source_name: row.get(11)?,
        source_type: row.get(12)?,
    })
}

use crate::intake::query_intake;
use crate::models::{Conversion, IntakeRow, NewOwnedItem, OwnedRow};
use crate::queries::OptionalExt;
use crate::{Database, new_id, now_utc};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};

const OWNED_COLUMNS: &str =
    "id, user_id, title, author, format, is_favorite, acquired_at, notes, created_at";

impl Database {
    pub fn create_owned_item(&self, user_id: &str, item: &NewOwnedItem) -> Result<OwnedRow> {
        self.with_conn(|conn| insert_owned(conn, user_id, item))
    }

    /// Newest first, optionally narrowed by exact format and favorite flag.
    pub fn list_owned_items(
        &self,
        user_id: &str,
        format: Option<&str>,
        favorite: Option<bool>,
    ) -> Result<Vec<OwnedRow>> {
        self.with_conn(|conn| {
            let mut sql = format!("SELECT {OWNED_COLUMNS} FROM owned_items WHERE user_id = ?1");
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
            if let Some(format) = &format {
                params.push(format);
                sql.push_str(&format!(" AND format = ?{}", params.len()));
            }
            if let Some(favorite) = &favorite {
                params.push(favorite);
                sql.push_str(&format!(" AND is_favorite = ?{}", params.len()));
            }
            sql.push_str(" ORDER BY created_at DESC, rowid DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), owned_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when nothing owned by `user_id` had that id.
    pub fn delete_owned_item(&self, user_id: &str, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM owned_items WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(n == 1)
        })
    }

    /// Turn an intake item into an owned item.
    ///
    /// `build` sees the intake row and decides what to write. The owned
    /// insert and the intake update (status `owned` plus parse metadata)
    /// commit together or not at all. `None` means no such item for this user.
    pub fn convert_intake_to_owned<F>(
        &self,
        user_id: &str,
        intake_id: &str,
        build: F,
    ) -> Result<Option<OwnedRow>>
    where
        F: FnOnce(&IntakeRow) -> Conversion,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(intake) = query_intake(&tx, user_id, intake_id)? else {
                return Ok(None);
            };
            let conversion = build(&intake);

            let owned = insert_owned(&tx, user_id, &conversion.owned)?;
            tx.execute(
                "UPDATE intake_items SET status = 'owned', parse_json = ?1
                 WHERE id = ?2 AND user_id = ?3",
                rusqlite::params![conversion.parse_json, intake_id, user_id],
            )?;

            tx.commit()?;
            Ok(Some(owned))
        })
    }

    #[doc(hidden)]
    pub fn get_owned_item(&self, user_id: &str, id: &str) -> Result<Option<OwnedRow>> {
        self.with_conn(|conn| query_owned(conn, user_id, id))
    }
}

fn insert_owned(conn: &Connection, user_id: &str, item: &NewOwnedItem) -> Result<OwnedRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO owned_items
            (id, user_id, title, author, format, is_favorite, acquired_at, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            id,
            user_id,
            item.title,
            item.author,
            item.format,
            item.is_favorite,
            item.acquired_at,
            item.notes,
            now_utc()
        ],
    )?;
    query_owned(conn, user_id, &id)?.ok_or_else(|| anyhow!("Owned item vanished after insert: {}", id))
}

fn query_owned(conn: &Connection, user_id: &str, id: &str) -> Result<Option<OwnedRow>> {
    let sql = format!("SELECT {OWNED_COLUMNS} FROM owned_items WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, [id, user_id], owned_from_row).optional()
}

fn owned_from_row(row: &Row<'_>) -> rusqlite::Result<OwnedRow> {
    Ok(OwnedRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        author: row.get(3)?,
        format: row.get(4)?,
        is_favorite: row.get(5)?,
        acquired_at: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

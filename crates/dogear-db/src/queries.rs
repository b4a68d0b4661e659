use crate::models::{InviteRow, NewUser, RegistrationOutcome, UserRow};
use crate::{Database, is_unique_violation, new_id, now_utc};
use anyhow::Result;
use chrono::{DateTime, Utc};
use dogear_types::time::{format_utc, parse_utc};
use rusqlite::{Connection, Row};
use tracing::warn;

const USER_COLUMNS: &str =
    "id, email, display_name, password_hash, is_active, is_admin, created_at";

const INVITE_COLUMNS: &str =
    "id, email, token, expires_at, used_at, created_by_user_id, created_at";

impl Database {
    // -- Users --

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Insert a user unless one with the same email already exists.
    /// Returns whether this call created the row; a concurrent winner is not
    /// an error.
    pub fn insert_user_if_absent(&self, user: &NewUser<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, display_name, password_hash, is_active, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)
                 ON CONFLICT(email) DO NOTHING",
                rusqlite::params![
                    new_id(),
                    user.email,
                    user.display_name,
                    user.password_hash,
                    user.is_admin,
                    now_utc()
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    #[doc(hidden)]
    pub fn set_user_active(&self, id: &str, active: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET is_active = ?1 WHERE id = ?2",
                rusqlite::params![active, id],
            )?;
            Ok(n == 1)
        })
    }

    // -- Invites --

    pub fn insert_invite(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
        created_by_user_id: &str,
    ) -> Result<InviteRow> {
        self.with_conn(|conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO invites (id, email, token, expires_at, created_by_user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id,
                    email,
                    token,
                    format_utc(expires_at),
                    created_by_user_id,
                    now_utc()
                ],
            )?;
            let sql = format!("SELECT {INVITE_COLUMNS} FROM invites WHERE id = ?1");
            Ok(conn.query_row(&sql, [&id], invite_from_row)?)
        })
    }

    #[doc(hidden)]
    pub fn get_invite_by_token(&self, token: &str) -> Result<Option<InviteRow>> {
        self.with_conn(|conn| query_invite_by_token(conn, token))
    }

    // -- Registration --

    /// Create a user and consume the invite in one transaction.
    ///
    /// With `invite_token = None` the invite checks are skipped (open
    /// registration). Nothing is written unless the outcome is `Created`.
    pub fn register_user(
        &self,
        user: &NewUser<'_>,
        invite_token: Option<&str>,
    ) -> Result<RegistrationOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();

            if let Some(token) = invite_token {
                let invite = match query_invite_by_token(&tx, token)? {
                    Some(inv) if inv.used_at.is_none() => inv,
                    _ => return Ok(RegistrationOutcome::InviteInvalid),
                };
                match parse_utc(&invite.expires_at) {
                    Some(expires_at) if expires_at >= now => {}
                    Some(_) => return Ok(RegistrationOutcome::InviteExpired),
                    None => {
                        warn!("Corrupt expires_at '{}' on invite '{}'", invite.expires_at, invite.id);
                        return Ok(RegistrationOutcome::InviteInvalid);
                    }
                }
            }

            if query_user(&tx, "email", user.email)?.is_some() {
                return Ok(RegistrationOutcome::EmailTaken);
            }

            let user_id = new_id();
            let inserted = tx.execute(
                "INSERT INTO users (id, email, display_name, password_hash, is_active, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
                rusqlite::params![
                    user_id,
                    user.email,
                    user.display_name,
                    user.password_hash,
                    user.is_admin,
                    format_utc(now)
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(RegistrationOutcome::EmailTaken),
                Err(e) => return Err(e.into()),
            }

            if let Some(token) = invite_token {
                // Guarded on used_at so a racing registration cannot reuse it.
                let consumed = tx.execute(
                    "UPDATE invites SET used_at = ?1 WHERE token = ?2 AND used_at IS NULL",
                    rusqlite::params![format_utc(now), token],
                )?;
                if consumed != 1 {
                    return Ok(RegistrationOutcome::InviteInvalid);
                }
            }

            tx.commit()?;
            Ok(RegistrationOutcome::Created { user_id })
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                display_name: row.get(2)?,
                password_hash: row.get(3)?,
                is_active: row.get(4)?,
                is_admin: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_invite_by_token(conn: &Connection, token: &str) -> Result<Option<InviteRow>> {
    let sql = format!("SELECT {INVITE_COLUMNS} FROM invites WHERE token = ?1");
    let row = conn.query_row(&sql, [token], invite_from_row).optional()?;
    Ok(row)
}

fn invite_from_row(row: &Row<'_>) -> rusqlite::Result<InviteRow> {
    Ok(InviteRow {
        id: row.get(0)?,
        email: row.get(1)?,
        token: row.get(2)?,
        expires_at: row.get(3)?,
        used_at: row.get(4)?,
        created_by_user_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

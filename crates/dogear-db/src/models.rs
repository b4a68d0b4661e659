//! Database row types. These map directly to SQLite rows.
//! Distinct from dogear-types API models to keep the DB layer independent.
//! Timestamps stay as stored text; callers normalize them with
//! `dogear_types::time::parse_utc`.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: String,
}

pub struct InviteRow {
    pub id: String,
    pub email: String,
    pub token: String,
    pub expires_at: String,
    pub used_at: Option<String>,
    pub created_by_user_id: String,
    pub created_at: String,
}

pub struct SourceRow {
    pub id: String,
    pub user_id: String,
    pub source_type: String,
    pub name: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub is_canonical: bool,
    pub created_at: String,
}

/// Intake item with its attached source's name and type joined in.
pub struct IntakeRow {
    pub id: String,
    pub user_id: String,
    pub raw_text: String,
    pub source_id: Option<String>,
    pub source_post_url: Option<String>,
    pub captured_at: String,
    pub status: String,
    pub matched_book_id: Option<String>,
    pub match_confidence: Option<f64>,
    pub parse_json: String,
    pub created_at: String,
    pub source_name: Option<String>,
    pub source_type: Option<String>,
}

pub struct OwnedRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub author: Option<String>,
    pub format: String,
    pub is_favorite: bool,
    pub acquired_at: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

// -- Inserts --

pub struct NewUser<'a> {
    pub email: &'a str,
    pub display_name: &'a str,
    pub password_hash: &'a str,
    pub is_admin: bool,
}

pub struct NewSource<'a> {
    pub user_id: &'a str,
    pub source_type: &'a str,
    pub name: &'a str,
    pub url: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// A source that capture may resolve or create on the user's behalf.
pub struct CanonicalSource<'a> {
    pub source_type: &'a str,
    pub default_name: &'a str,
}

pub struct NewIntakeItem<'a> {
    pub user_id: &'a str,
    pub raw_text: &'a str,
    pub source_id: Option<&'a str>,
    pub source_post_url: Option<&'a str>,
}

pub struct NewOwnedItem {
    pub title: String,
    pub author: Option<String>,
    pub format: String,
    pub is_favorite: bool,
    pub acquired_at: Option<String>,
    pub notes: Option<String>,
}

/// What a conversion writes besides the owned item itself.
pub struct Conversion {
    pub owned: NewOwnedItem,
    pub parse_json: String,
}

/// Result of an invite-gated registration attempt. Only `Created` commits.
#[derive(Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created { user_id: String },
    InviteInvalid,
    InviteExpired,
    EmailTaken,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{IntakeStatus, OwnedFormat};

// -- JWT Claims --

/// Session token payload. `sub` is the user id as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    /// Optional only when open registration is enabled.
    #[serde(default)]
    pub invite_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteCreateRequest {
    pub email: String,
    #[serde(default = "default_invite_hours")]
    pub expires_hours: i64,
}

fn default_invite_hours() -> i64 {
    72
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteResponse {
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

// -- Sources --

#[derive(Debug, Deserialize)]
pub struct SourceCreateRequest {
    /// Classification tag, e.g. `tiktok`, `family`, `friend`, `booktube`.
    #[serde(rename = "type", default = "default_source_type")]
    pub source_type: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_source_type() -> String {
    "other".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub name: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Intake --

#[derive(Debug, Deserialize)]
pub struct IntakeCreateRequest {
    pub raw_text: String,
    #[serde(default)]
    pub source_id: Option<Uuid>,
    #[serde(default)]
    pub source_post_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IntakeQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntakeResponse {
    pub id: String,
    pub raw_text: String,
    pub status: IntakeStatus,
    pub captured_at: DateTime<Utc>,
    pub source_id: Option<String>,
    pub source_post_url: Option<String>,
    pub source_name: Option<String>,
    pub source_type: Option<String>,
    pub parse: serde_json::Value,
}

// -- Owned --

#[derive(Debug, Deserialize)]
pub struct OwnedCreateRequest {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Free text; normalized against [`OwnedFormat`] by the server.
    #[serde(default = "default_owned_format")]
    pub format: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, deserialize_with = "crate::time::deserialize_optional_utc")]
    pub acquired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_owned_format() -> String {
    OwnedFormat::default().as_str().to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct OwnedQuery {
    pub format: Option<String>,
    pub favorite: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnedResponse {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub format: OwnedFormat,
    pub is_favorite: bool,
    pub acquired_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

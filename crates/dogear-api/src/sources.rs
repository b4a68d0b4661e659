use axum::{Extension, Json, extract::State, response::IntoResponse};

use dogear_db::models::{CanonicalSource, NewSource, SourceRow};
use dogear_types::api::{SourceCreateRequest, SourceResponse};

use crate::auth::{AppState, AppStateInner};
use crate::error::{AppError, AppResult, run_blocking};
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::stored_timestamp;

/// A platform whose sources can be recognized from a post URL.
#[derive(Debug, PartialEq, Eq)]
pub struct Platform {
    pub source_type: &'static str,
    pub display_name: &'static str,
    pub domain_marker: &'static str,
}

pub const TIKTOK: Platform = Platform {
    source_type: "tiktok",
    display_name: "TikTok",
    domain_marker: "tiktok.com",
};

pub const AUTO_DETECTED: &[Platform] = &[TIKTOK];

/// Case-insensitive substring match of the URL against each platform marker.
pub fn detect_platform(url: Option<&str>) -> Option<&'static Platform> {
    let url = url?.to_lowercase();
    AUTO_DETECTED.iter().find(|p| url.contains(p.domain_marker))
}

impl Platform {
    pub fn canonical(&self) -> CanonicalSource<'static> {
        CanonicalSource {
            source_type: self.source_type,
            default_name: self.display_name,
        }
    }
}

impl AppStateInner {
    pub fn list_sources(&self, user_id: &str) -> AppResult<Vec<SourceResponse>> {
        let rows = self.db.list_sources(user_id)?;
        Ok(rows.into_iter().map(to_response).collect())
    }

    pub fn create_source(&self, user_id: &str, req: &SourceCreateRequest) -> AppResult<SourceResponse> {
        let mut source_type = req.source_type.trim().to_lowercase();
        if source_type.is_empty() {
            source_type = "other".to_string();
        }

        let row = self.db.create_source(&NewSource {
            user_id,
            source_type: &source_type,
            name: req.name.trim(),
            url: trimmed(req.url.as_deref()),
            notes: trimmed(req.notes.as_deref()),
        })?;
        Ok(to_response(row))
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn to_response(row: SourceRow) -> SourceResponse {
    SourceResponse {
        created_at: stored_timestamp(&row.created_at, "created_at", &row.id),
        id: row.id,
        source_type: row.source_type,
        name: row.name,
        url: row.url,
        notes: row.notes,
    }
}

// -- Handlers --

pub async fn list_sources(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let sources = run_blocking(move || state.list_sources(&user.id)).await?;
    Ok(Json(sources))
}

pub async fn create_source(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<SourceCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let source = run_blocking(move || state.create_source(&user.id, &req)).await?;
    Ok(Json(source))
}

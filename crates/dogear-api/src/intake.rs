use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::warn;

use dogear_db::models::{IntakeRow, NewIntakeItem};
use dogear_types::api::{IntakeCreateRequest, IntakeQuery, IntakeResponse};
use dogear_types::models::IntakeStatus;

use crate::auth::{AppState, AppStateInner};
use crate::error::{AppError, AppResult, run_blocking};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::CurrentUser;
use crate::sources::detect_platform;
use crate::stored_timestamp;

impl AppStateInner {
    /// Capture a raw note. A recognized platform URL without an explicit
    /// source attaches the user's canonical source for that platform.
    pub fn capture(&self, user_id: &str, req: &IntakeCreateRequest) -> AppResult<IntakeResponse> {
        let raw_text = req.raw_text.trim();
        if raw_text.is_empty() {
            return Err(AppError::Validation("raw_text must not be empty".into()));
        }

        let source_post_url = req
            .source_post_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let explicit_source = req.source_id.map(|id| id.to_string());
        let auto_source = match explicit_source {
            Some(_) => None,
            None => detect_platform(source_post_url).map(|p| p.canonical()),
        };

        let row = self
            .db
            .create_intake_item(
                &NewIntakeItem {
                    user_id,
                    raw_text,
                    source_id: explicit_source.as_deref(),
                    source_post_url,
                },
                auto_source,
            )?
            .ok_or(AppError::NotFound("Source"))?;

        Ok(to_response(row))
    }

    /// Newest capture first; a blank status filter means no filter.
    pub fn list_intake(&self, user_id: &str, status: Option<&str>) -> AppResult<Vec<IntakeResponse>> {
        let status = status.filter(|s| !s.trim().is_empty());
        let rows = self.db.list_intake_items(user_id, status)?;
        Ok(rows.into_iter().map(to_response).collect())
    }
}

fn to_response(row: IntakeRow) -> IntakeResponse {
    let parse = serde_json::from_str(&row.parse_json).unwrap_or_else(|e| {
        warn!("Corrupt parse_json on intake item '{}': {}", row.id, e);
        serde_json::Value::Object(Default::default())
    });

    IntakeResponse {
        captured_at: stored_timestamp(&row.captured_at, "captured_at", &row.id),
        status: IntakeStatus::from(row.status),
        id: row.id,
        raw_text: row.raw_text,
        source_id: row.source_id,
        source_post_url: row.source_post_url,
        source_name: row.source_name,
        source_type: row.source_type,
        parse,
    }
}

// -- Handlers --

pub async fn list_intake(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IntakeQuery>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let items = run_blocking(move || state.list_intake(&user.id, query.status.as_deref())).await?;
    Ok(Json(items))
}

pub async fn create_intake(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<IntakeCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = run_blocking(move || state.capture(&user.id, &req)).await?;
    Ok(Json(item))
}

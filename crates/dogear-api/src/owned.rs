use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use dogear_db::models::{Conversion, NewOwnedItem, OwnedRow};
use dogear_types::api::{OkResponse, OwnedCreateRequest, OwnedQuery, OwnedResponse};
use dogear_types::models::OwnedFormat;
use dogear_types::time::format_utc;

use crate::auth::{AppState, AppStateInner};
use crate::error::{AppError, AppResult, run_blocking};
use crate::extract::{ApiJson, ApiQuery, record_id};
use crate::middleware::CurrentUser;
use crate::stored_timestamp;

const TITLE_AUTHOR_SEPARATOR: &str = " by ";

/// Best-effort "Title by Author" split.
///
/// Splits on the first separator only. Each side replaces its default (whole
/// text as title, no author) only when it is non-empty after trimming.
pub fn split_title_author(raw: &str) -> (String, Option<String>) {
    let raw = raw.trim();
    let mut title = raw;
    let mut author = None;

    if let Some((left, right)) = raw.split_once(TITLE_AUTHOR_SEPARATOR) {
        let (left, right) = (left.trim(), right.trim());
        if !left.is_empty() {
            title = left;
        }
        if !right.is_empty() {
            author = Some(right.to_string());
        }
    }

    (title.to_string(), author)
}

impl AppStateInner {
    /// Promote an intake item to an owned item and mark it `owned`, atomically.
    pub fn convert_to_owned(&self, user_id: &str, intake_id: &str) -> AppResult<OwnedResponse> {
        let row = self
            .db
            .convert_intake_to_owned(user_id, intake_id, |intake| {
                let (title, author) = split_title_author(&intake.raw_text);
                Conversion {
                    parse_json: json!({ "title": title, "author": author }).to_string(),
                    owned: NewOwnedItem {
                        title,
                        author,
                        format: OwnedFormat::default().as_str().to_string(),
                        is_favorite: false,
                        acquired_at: None,
                        notes: Some(format!("Imported from Inbox: {}", intake.id)),
                    },
                }
            })?
            .ok_or(AppError::NotFound("Intake item"))?;

        info!("Converted intake item {} into owned item {}", intake_id, row.id);
        Ok(to_response(row))
    }

    pub fn create_owned(&self, user_id: &str, req: &OwnedCreateRequest) -> AppResult<OwnedResponse> {
        let title = req.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".into()));
        }

        let row = self.db.create_owned_item(
            user_id,
            &NewOwnedItem {
                title: title.to_string(),
                author: trimmed(req.author.as_deref()),
                format: OwnedFormat::normalize(&req.format).as_str().to_string(),
                is_favorite: req.is_favorite,
                acquired_at: req.acquired_at.map(format_utc),
                notes: trimmed(req.notes.as_deref()),
            },
        )?;
        Ok(to_response(row))
    }

    pub fn list_owned(&self, user_id: &str, query: &OwnedQuery) -> AppResult<Vec<OwnedResponse>> {
        let format = query
            .format
            .as_deref()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());
        let rows = self
            .db
            .list_owned_items(user_id, format.as_deref(), query.favorite)?;
        Ok(rows.into_iter().map(to_response).collect())
    }

    pub fn delete_owned(&self, user_id: &str, owned_id: &str) -> AppResult<()> {
        if self.db.delete_owned_item(user_id, owned_id)? {
            Ok(())
        } else {
            Err(AppError::NotFound("Owned item"))
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn to_response(row: OwnedRow) -> OwnedResponse {
    OwnedResponse {
        created_at: stored_timestamp(&row.created_at, "created_at", &row.id),
        acquired_at: row
            .acquired_at
            .as_deref()
            .map(|raw| stored_timestamp(raw, "acquired_at", &row.id)),
        format: OwnedFormat::normalize(&row.format),
        id: row.id,
        title: row.title,
        author: row.author,
        is_favorite: row.is_favorite,
        notes: row.notes,
    }
}

// -- Handlers --

pub async fn list_owned(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OwnedQuery>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let items = run_blocking(move || state.list_owned(&user.id, &query)).await?;
    Ok(Json(items))
}

pub async fn create_owned(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<OwnedCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = run_blocking(move || state.create_owned(&user.id, &req)).await?;
    Ok(Json(item))
}

pub async fn convert_intake(
    State(state): State<AppState>,
    intake_id: Result<Path<Uuid>, PathRejection>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let intake_id = record_id(intake_id, "Intake item")?;
    let item =
        run_blocking(move || state.convert_to_owned(&user.id, &intake_id.to_string())).await?;
    Ok(Json(item))
}

pub async fn delete_owned(
    State(state): State<AppState>,
    owned_id: Result<Path<Uuid>, PathRejection>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let owned_id = record_id(owned_id, "Owned item")?;
    run_blocking(move || state.delete_owned(&user.id, &owned_id.to_string())).await?;
    Ok(Json(OkResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(raw: &str) -> (String, Option<String>) {
        split_title_author(raw)
    }

    #[test]
    fn title_and_author() {
        assert_eq!(split("Dune by Frank Herbert"), ("Dune".into(), Some("Frank Herbert".into())));
        assert_eq!(split("  Dune   by   Frank Herbert  "), ("Dune".into(), Some("Frank Herbert".into())));
    }

    #[test]
    fn no_separator_is_all_title() {
        assert_eq!(split("Dune"), ("Dune".into(), None));
        assert_eq!(split("Standby Mode"), ("Standby Mode".into(), None));
    }

    #[test]
    fn empty_left_side_keeps_full_text() {
        assert_eq!(split("by Frank Herbert"), ("by Frank Herbert".into(), None));
    }

    #[test]
    fn empty_right_side_has_no_author() {
        assert_eq!(split("Dune by  "), ("Dune by".into(), None));
        assert_eq!(split("Dune by   x"), ("Dune".into(), Some("x".into())));
    }

    #[test]
    fn only_first_separator_splits() {
        assert_eq!(
            split("Stand by Me by Stephen King"),
            ("Stand".into(), Some("Me by Stephen King".into()))
        );
    }
}

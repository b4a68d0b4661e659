use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use rand::RngCore;
use tracing::{info, warn};

use dogear_db::Database;
use dogear_db::models::{InviteRow, NewUser, RegistrationOutcome};
use dogear_types::api::{
    InviteCreateRequest, InviteResponse, LoginRequest, MeResponse, OkResponse, RegisterRequest,
    TokenResponse,
};

use crate::config::Settings;
use crate::credentials::{Credentials, hash_password, verify_password};
use crate::error::{AppError, AppResult, run_blocking};
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::stored_timestamp;

/// Random bytes behind each invite token (256 bits).
const INVITE_TOKEN_BYTES: usize = 32;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub settings: Settings,
    pub credentials: Credentials,
}

impl AppStateInner {
    pub fn new(db: Database, settings: Settings) -> Self {
        let credentials = Credentials::from_settings(&settings);
        Self {
            db,
            settings,
            credentials,
        }
    }

    /// Create the configured administrator if missing. Safe to call on every
    /// request: the email UNIQUE constraint absorbs concurrent first calls.
    pub fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let email = normalize_email(&self.settings.admin_email);
        if self.db.get_user_by_email(&email)?.is_some() {
            return Ok(());
        }

        let password_hash = hash_password(&self.settings.admin_password)?;
        let created = self.db.insert_user_if_absent(&NewUser {
            email: &email,
            display_name: &self.settings.admin_display_name,
            password_hash: &password_hash,
            is_admin: true,
        })?;
        if created {
            info!("Bootstrapped administrator {}", email);
        }
        Ok(())
    }

    pub fn login(&self, email: &str, password: &str) -> AppResult<String> {
        self.ensure_bootstrap_admin()?;

        let email = normalize_email(email);
        let invalid = || AppError::Authentication("Invalid credentials".into());

        let user = self.db.get_user_by_email(&email)?.ok_or_else(invalid)?;
        if !user.is_active || !verify_password(password, &user.password_hash) {
            warn!("Rejected login for {}", email);
            return Err(invalid());
        }

        self.credentials.issue_token(&user.id, None)
    }

    pub fn create_invite(&self, email: &str, ttl_hours: i64, issuer_id: &str) -> AppResult<InviteRow> {
        let email = normalize_email(email);
        if !looks_like_email(&email) {
            return Err(AppError::Validation("A valid email is required".into()));
        }

        let token = generate_invite_token();
        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| AppError::Validation("expires_hours out of range".into()))?;
        let invite = self.db.insert_invite(&email, &token, expires_at, issuer_id)?;
        info!("Issued invite for {} (expires {})", email, invite.expires_at);
        Ok(invite)
    }

    /// Register a user, consuming the invite in the same transaction unless
    /// open registration is enabled. Returns the new user id.
    pub fn register(&self, req: &RegisterRequest) -> AppResult<String> {
        self.ensure_bootstrap_admin()?;

        let email = normalize_email(&req.email);
        if !looks_like_email(&email) {
            return Err(AppError::Validation("A valid email is required".into()));
        }
        let display_name = req.display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::Validation("Display name is required".into()));
        }

        let invite_token = if self.settings.allow_open_registration {
            None
        } else {
            Some(req.invite_token.as_deref().map(str::trim).unwrap_or_default())
        };

        let password_hash = hash_password(&req.password)?;
        let outcome = self.db.register_user(
            &NewUser {
                email: &email,
                display_name,
                password_hash: &password_hash,
                is_admin: false,
            },
            invite_token,
        )?;

        match outcome {
            RegistrationOutcome::Created { user_id } => {
                info!("Registered {} ({})", email, user_id);
                Ok(user_id)
            }
            RegistrationOutcome::InviteInvalid => {
                Err(AppError::InvalidInvite("Invalid invite token".into()))
            }
            RegistrationOutcome::InviteExpired => {
                Err(AppError::InvalidInvite("Invite token expired".into()))
            }
            RegistrationOutcome::EmailTaken => {
                Err(AppError::Conflict("Email already registered".into()))
            }
        }
    }
}

/// Opaque, unguessable invite token: hex of 32 bytes from the OS-seeded RNG.
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; INVITE_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    matches!(email.split_once('@'), Some((local, domain)) if !local.is_empty() && !domain.is_empty())
}

// -- Handlers --

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = run_blocking(move || state.login(&req.email, &req.password)).await?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// No caller auth yet: the bootstrap administrator is recorded as issuer.
pub async fn create_invite(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InviteCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invite = run_blocking(move || {
        state.ensure_bootstrap_admin()?;
        let admin_email = normalize_email(&state.settings.admin_email);
        let admin = state
            .db
            .get_user_by_email(&admin_email)?
            .ok_or_else(|| AppError::Internal("bootstrap administrator missing".into()))?;
        state.create_invite(&req.email, req.expires_hours, &admin.id)
    })
    .await?;

    Ok(Json(InviteResponse {
        expires_at: stored_timestamp(&invite.expires_at, "expires_at", &invite.id),
        email: invite.email,
        token: invite.token,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    run_blocking(move || state.register(&req)).await?;
    Ok(Json(OkResponse::ok()))
}

pub async fn me(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(MeResponse {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        is_admin: user.is_admin,
    })
}

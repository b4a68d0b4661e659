//! Password hashing and session tokens.
//!
//! Passwords are hashed with Argon2id and a random salt. Session tokens are
//! HS256 JWTs whose `sub` is the user id; validating one needs no storage
//! access, only the final user lookup in [`Credentials::resolve_current_user`]
//! touches the database.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;

use dogear_db::Database;
use dogear_db::models::UserRow;
use dogear_types::api::Claims;

use crate::config::Settings;
use crate::error::{AppError, AppResult};

/// Longest accepted password, in bytes. Kept from the bcrypt era so existing
/// clients see the same validation rule.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub fn hash_password(password: &str) -> AppResult<String> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation(format!(
            "Password too long (max {MAX_PASSWORD_BYTES} bytes)"
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Unparseable password hash: {}", e);
            false
        }
    }
}

/// Signs and validates session tokens.
#[derive(Clone)]
pub struct Credentials {
    secret: String,
    default_ttl: Duration,
}

impl Credentials {
    pub fn new(secret: impl Into<String>, default_ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            default_ttl: Duration::minutes(default_ttl_minutes),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.jwt_secret.clone(), settings.access_token_ttl_minutes)
    }

    pub fn issue_token(&self, subject: &str, ttl_minutes: Option<i64>) -> AppResult<String> {
        let ttl = ttl_minutes.map(Duration::minutes).unwrap_or(self.default_ttl);
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        let claims = Claims {
            sub: subject.to_string(),
            exp,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    pub fn decode_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }

    /// The single gate in front of every user-scoped operation.
    pub fn resolve_current_user(&self, db: &Database, token: Option<&str>) -> AppResult<UserRow> {
        let token = token.ok_or_else(|| AppError::Authentication("Not authenticated".into()))?;
        let claims = self.decode_token(token)?;

        match db.get_user_by_id(&claims.sub)? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Authentication("Invalid token".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("test-secret-that-is-long-enough-for-hmac", 60)
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn password_byte_limit() {
        assert!(hash_password(&"a".repeat(MAX_PASSWORD_BYTES)).is_ok());
        let err = hash_password(&"a".repeat(MAX_PASSWORD_BYTES + 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        // Multi-byte characters count by bytes, not chars.
        assert!(hash_password(&"é".repeat(37)).is_err());
    }

    #[test]
    fn token_round_trip() {
        let c = creds();
        let token = c.issue_token("user-123", None).unwrap();
        let claims = c.decode_token(&token).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert!(claims.exp as i64 > Utc::now().timestamp());
    }

    #[test]
    fn expired_token_fails() {
        let c = creds();
        let token = c.issue_token("user-123", Some(-5)).unwrap();
        assert!(matches!(c.decode_token(&token), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn foreign_signature_fails() {
        let token = Credentials::new("another-secret", 60).issue_token("u", None).unwrap();
        assert!(matches!(creds().decode_token(&token), Err(AppError::InvalidToken(_))));
        assert!(matches!(creds().decode_token("garbage"), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn resolve_requires_live_active_user() {
        let db = Database::open_in_memory().unwrap();
        let c = creds();

        assert!(matches!(
            c.resolve_current_user(&db, None),
            Err(AppError::Authentication(_))
        ));

        let ghost = c.issue_token("no-such-user", None).unwrap();
        assert!(matches!(
            c.resolve_current_user(&db, Some(&ghost)),
            Err(AppError::Authentication(_))
        ));

        db.insert_user_if_absent(&dogear_db::models::NewUser {
            email: "r@example.com",
            display_name: "R",
            password_hash: "x",
            is_admin: false,
        })
        .unwrap();
        let user = db.get_user_by_email("r@example.com").unwrap().unwrap();
        let token = c.issue_token(&user.id, None).unwrap();
        assert_eq!(c.resolve_current_user(&db, Some(&token)).unwrap().id, user.id);

        db.set_user_active(&user.id, false).unwrap();
        assert!(matches!(
            c.resolve_current_user(&db, Some(&token)),
            Err(AppError::Authentication(_))
        ));
    }
}

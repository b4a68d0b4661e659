use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

/// JWT secrets that ship as defaults and must not reach production.
pub const PLACEHOLDER_SECRETS: &[&str] = &["change-me-in-prod", "dev-secret-change-me"];

/// Process configuration. Built once at startup and handed to the
/// application state; nothing reads the environment after that.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_display_name: String,
    pub allow_open_registration: bool,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Exact CORS origin. Unset means permissive.
    pub frontend_origin: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Dog-Eared".into(),
            jwt_secret: "dev-secret-change-me".into(),
            access_token_ttl_minutes: 60 * 24 * 7,
            admin_email: "you@example.com".into(),
            admin_password: "change-me".into(),
            admin_display_name: "Admin".into(),
            allow_open_registration: false,
            db_path: PathBuf::from("dogear.db"),
            host: "0.0.0.0".into(),
            port: 8000,
            frontend_origin: None,
        }
    }
}

impl Settings {
    /// Read `DOGEAR_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            app_name: get("DOGEAR_APP_NAME").unwrap_or(defaults.app_name),
            jwt_secret: get("DOGEAR_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            access_token_ttl_minutes: parse_or(
                get("DOGEAR_ACCESS_TOKEN_EXPIRE_MINUTES"),
                "DOGEAR_ACCESS_TOKEN_EXPIRE_MINUTES",
                defaults.access_token_ttl_minutes,
            )?,
            admin_email: get("DOGEAR_ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: get("DOGEAR_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            admin_display_name: get("DOGEAR_ADMIN_DISPLAY_NAME")
                .unwrap_or(defaults.admin_display_name),
            allow_open_registration: match get("DOGEAR_ALLOW_OPEN_REGISTRATION") {
                Some(raw) => parse_flag(&raw)
                    .ok_or_else(|| anyhow!("DOGEAR_ALLOW_OPEN_REGISTRATION: not a boolean: {raw}"))?,
                None => defaults.allow_open_registration,
            },
            db_path: get("DOGEAR_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            host: get("DOGEAR_HOST").unwrap_or(defaults.host),
            port: parse_or(get("DOGEAR_PORT"), "DOGEAR_PORT", defaults.port)?,
            frontend_origin: get("DOGEAR_FRONTEND_ORIGIN"),
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display + Send + Sync + std::error::Error + 'static,
{
    match raw {
        Some(raw) => raw.trim().parse().with_context(|| format!("{key}: invalid value {raw:?}")),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

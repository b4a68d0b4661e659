pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod intake;
pub mod middleware;
pub mod owned;
pub mod routes;
pub mod sources;

pub use auth::{AppState, AppStateInner};
pub use routes::router;

use chrono::{DateTime, Utc};
use tracing::warn;

/// Stored timestamp to UTC instant. Naive values are read as UTC; corrupt
/// ones are logged and reported as the epoch rather than failing the request.
pub(crate) fn stored_timestamp(raw: &str, column: &str, id: &str) -> DateTime<Utc> {
    dogear_types::time::parse_utc(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}' on '{}'", column, raw, id);
        DateTime::default()
    })
}

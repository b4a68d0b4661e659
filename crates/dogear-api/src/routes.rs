use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{self, AppState};
use crate::config::Settings;
use crate::middleware::require_auth;
use crate::{intake, owned, sources};

/// Full HTTP surface. Everything except login, invite, register and the
/// health probes sits behind [`require_auth`].
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        .route("/auth/invite", post(auth::create_invite))
        .route("/auth/register", post(auth::register))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/sources", get(sources::list_sources).post(sources::create_source))
        .route("/intake", get(intake::list_intake).post(intake::create_intake))
        .route("/owned", get(owned::list_owned).post(owned::create_owned))
        .route("/owned/from-intake/{intake_id}", post(owned::convert_intake))
        .route("/owned/{owned_id}", delete(owned::delete_owned))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.settings))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let permissive = CorsLayer::permissive();
    let Some(origin) = settings.frontend_origin.as_deref() else {
        return permissive;
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!("Ignoring unusable frontend origin {:?}: {}", origin, e);
            permissive
        }
    }
}

async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "name": state.settings.app_name, "status": "ok" }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

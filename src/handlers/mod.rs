//! HTTP request handlers (route handlers).
//!
//! Each handler extracts request data, calls a service and maps the result
//! to a JSON response. `router` wires them together.

use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::{middleware::auth, state::AppState};

/// Admin key and user endpoints
pub mod admin;
/// Health check and robots.txt
pub mod health;
/// Signed-in user's key endpoints
pub mod keys;
/// Public API key check
pub mod verify;

/// Build the application router.
///
/// Identity runs on every `/keys` and `/admin` route; the admin gate runs
/// inside it on `/admin` only.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/admin/keys/{api_key}",
            get(admin::get_key).post(admin::key_action),
        )
        .route(
            "/admin/users/{user_id}",
            get(admin::get_user).post(admin::user_action),
        )
        .route_layer(axum_middleware::from_fn(auth::admin_middleware));

    let authenticated_routes = Router::new()
        .route("/keys", get(keys::list_keys).post(keys::create_key))
        .route("/keys/{api_key}", get(keys::get_key).post(keys::key_action))
        .merge(admin_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/robots.txt", get(health::robots_txt))
        .route("/verify", get(verify::verify_key))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Identity middleware.
//!
//! OAuth runs in an authenticating proxy in front of this service. The proxy
//! forwards the signed-in identity in a header, and this middleware:
//! 1. Reads the social id (e.g. `github$12345`) from that header
//! 2. Finds or creates the matching user
//! 3. Injects an `AuthContext` into the request
//! 4. Rejects requests without an identity with HTTP 401

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::{actor::Actor, user::User},
    services::{key_service, user_service},
    state::AppState,
};

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The signed-in user as loaded at the start of the request
    pub user: User,

    pub actor: Actor,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Identity middleware function.
///
/// # Returns
///
/// - `Ok(Response)` from the next handler once the user is resolved
/// - `Err(AppError::Unauthenticated)` if the identity header is missing
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let social_id =
        header_value(request.headers(), &state.identity_header).ok_or(AppError::Unauthenticated)?;
    let email = header_value(request.headers(), &state.email_header);

    let user = user_service::login(state.store.as_ref(), &social_id, email).await?;
    let actor = Actor::for_user(&user, &state.policy);

    request.extensions_mut().insert(AuthContext { user, actor });

    Ok(next.run(request).await)
}

/// Admin gate, layered inside `auth_middleware`.
///
/// Rejects non-admins with HTTP 403.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let auth = request
        .extensions()
        .get::<AuthContext>()
        .ok_or(AppError::Unauthenticated)?;

    key_service::require_admin(&auth.actor)?;

    Ok(next.run(request).await)
}

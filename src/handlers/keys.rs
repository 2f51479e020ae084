//! Key management endpoints for signed-in users.
//!
//! - GET /keys - List the caller's keys
//! - POST /keys - Create a key
//! - GET /keys/{api_key} - Get one of the caller's keys
//! - POST /keys/{api_key} - Apply an action to one of the caller's keys

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        action::{KeyAction, KeyListResponse},
        actor::Actor,
        api_key::ApiKey,
    },
    services::key_service,
    state::AppState,
    store::RecordStore,
};

/// List the caller's keys.
///
/// Keys come from the user record loaded by the identity middleware.
pub async fn list_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Json<KeyListResponse> {
    let key_creation_disabled = auth.user.admin_locked
        || (state.policy.disable_user_api_key_creation && !auth.actor.is_admin);

    Json(KeyListResponse {
        keys: auth.user.api_keys.into_values().collect(),
        key_creation_disabled,
    })
}

/// Create a new key for the caller.
///
/// # Response
///
/// - **201 Created**: the new key
/// - **403**: the caller is locked, or key creation is disabled
pub async fn create_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<(StatusCode, Json<ApiKey>), AppError> {
    let key = key_service::create_key(state.store.as_ref(), &state.policy, &auth.actor).await?;

    Ok((StatusCode::CREATED, Json(key)))
}

/// Get one key.
///
/// Returns 404 for unknown keys and 403 for keys owned by someone else.
pub async fn get_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(api_key): Path<String>,
) -> Result<Json<ApiKey>, AppError> {
    let (key, _) = key_service::load_managed_key(state.store.as_ref(), &auth.actor, &api_key).await?;

    Ok(Json(key))
}

/// Apply an action to one key.
///
/// # Response
///
/// - **200 OK**: the key after the action
/// - **204 No Content**: the key was deleted
/// - **400**: invalid allow-list
/// - **409**: enabling a locked key, or deleting an enabled one
pub async fn key_action(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(api_key): Path<String>,
    Json(action): Json<KeyAction>,
) -> Result<Response, AppError> {
    apply_key_action(state.store.as_ref(), &auth.actor, &api_key, action).await
}

/// Blank names are stored as no name.
fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

pub(crate) async fn apply_key_action(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
    action: KeyAction,
) -> Result<Response, AppError> {
    let key = match action {
        KeyAction::Save {
            name,
            allowed_origins: Some(origins),
        } => key_service::update_details(store, actor, api_key, clean_name(name), &origins).await?,
        KeyAction::Save {
            name,
            allowed_origins: None,
        } => key_service::rename_key(store, actor, api_key, clean_name(name)).await?,
        KeyAction::Disable => key_service::disable_key(store, actor, api_key).await?,
        KeyAction::Enable => key_service::enable_key(store, actor, api_key).await?,
        KeyAction::Delete => {
            key_service::delete_key(store, actor, api_key).await?;
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
        KeyAction::AdminLock { reason } => {
            key_service::lock_key(store, actor, api_key, reason).await?
        }
        KeyAction::AdminUnlock => key_service::unlock_key(store, actor, api_key).await?,
    };

    Ok(Json(key).into_response())
}

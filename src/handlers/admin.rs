//! Admin endpoints. Every route here sits behind `admin_middleware`.
//!
//! - GET /admin/keys/{api_key} - Any key with its owner
//! - POST /admin/keys/{api_key} - Key actions, including locks
//! - GET /admin/users/{user_id} - Any user with their keys
//! - POST /admin/users/{user_id} - User locks and bulk key actions

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::Response,
};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        action::{AdminKeyResponse, KeyAction, UserAction},
        user::User,
    },
    services::{key_service, user_service},
    state::AppState,
};

use super::keys::apply_key_action;

pub async fn get_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(api_key): Path<String>,
) -> Result<Json<AdminKeyResponse>, AppError> {
    let (key, owner) =
        key_service::load_managed_key(state.store.as_ref(), &auth.actor, &api_key).await?;

    Ok(Json(AdminKeyResponse { key, owner }))
}

pub async fn key_action(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(api_key): Path<String>,
    Json(action): Json<KeyAction>,
) -> Result<Response, AppError> {
    apply_key_action(state.store.as_ref(), &auth.actor, &api_key, action).await
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = user_service::load_user(state.store.as_ref(), &auth.actor, &user_id).await?;

    Ok(Json(user))
}

/// Apply a user action and return the user as saved.
pub async fn user_action(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<String>,
    Json(action): Json<UserAction>,
) -> Result<Json<User>, AppError> {
    let store = state.store.as_ref();
    let actor = &auth.actor;

    let user = match action {
        UserAction::AdminLock { reason } => {
            user_service::lock_user(store, actor, &user_id, reason).await?
        }
        UserAction::AdminUnlock => user_service::unlock_user(store, actor, &user_id).await?,
        UserAction::DisableKeys => user_service::disable_keys(store, actor, &user_id).await?,
        UserAction::EnableKeys => user_service::enable_keys(store, actor, &user_id).await?,
        UserAction::LockKeys { reason } => {
            user_service::lock_keys(store, actor, &user_id, reason).await?
        }
        UserAction::UnlockKeys => user_service::unlock_keys(store, actor, &user_id).await?,
    };

    Ok(Json(user))
}

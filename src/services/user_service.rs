//! User accounts: login, admin locks and bulk key actions.

use tracing::{info, warn};

use crate::{
    error::AppError,
    models::{actor::Actor, api_key::ApiKey, now, user::User},
    store::RecordStore,
};

use super::key_service::require_admin;

/// Find the user for an authenticated identity, creating it on first login.
///
/// A changed email address is written back to the existing record.
pub async fn login(
    store: &dyn RecordStore,
    social_id: &str,
    email: Option<String>,
) -> Result<User, AppError> {
    if let Some(mut user) = store.get_user_by_social_id(social_id).await? {
        if email.is_some() && user.email != email {
            user.email = email;
            store.save_user(&user).await?;
        }
        return Ok(user);
    }

    let user = User::new(social_id, email, now());
    store.save_user(&user).await?;

    info!(user_id = %user.id, social_id, github_id = ?user.github_id(), "User created");
    Ok(user)
}

/// Load any user by id. Admin only.
pub async fn load_user(
    store: &dyn RecordStore,
    actor: &Actor,
    user_id: &str,
) -> Result<User, AppError> {
    require_admin(actor)?;

    store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("That user doesn't exist."))
}

/// Lock a user so they cannot create new keys. Existing keys are untouched.
pub async fn lock_user(
    store: &dyn RecordStore,
    actor: &Actor,
    user_id: &str,
    reason: Option<String>,
) -> Result<User, AppError> {
    let mut user = load_user(store, actor, user_id).await?;

    user.lock(&actor.user_id, reason, now());
    store.save_user(&user).await?;

    info!(user_id, by = %actor.user_id, "User locked");
    Ok(user)
}

pub async fn unlock_user(
    store: &dyn RecordStore,
    actor: &Actor,
    user_id: &str,
) -> Result<User, AppError> {
    let mut user = load_user(store, actor, user_id).await?;

    user.unlock();
    store.save_user(&user).await?;

    info!(user_id, by = %actor.user_id, "User unlocked");
    Ok(user)
}

/// Disable every key the user owns.
pub async fn disable_keys(
    store: &dyn RecordStore,
    actor: &Actor,
    user_id: &str,
) -> Result<User, AppError> {
    apply_to_keys(store, actor, user_id, "disabled", |key| key.enabled = false).await
}

/// Enable every key the user owns, locked or not.
pub async fn enable_keys(
    store: &dyn RecordStore,
    actor: &Actor,
    user_id: &str,
) -> Result<User, AppError> {
    apply_to_keys(store, actor, user_id, "enabled", |key| key.enabled = true).await
}

/// Lock every key the user owns with one timestamp and reason.
pub async fn lock_keys(
    store: &dyn RecordStore,
    actor: &Actor,
    user_id: &str,
    reason: Option<String>,
) -> Result<User, AppError> {
    let at = now();

    apply_to_keys(store, actor, user_id, "locked", |key| {
        key.lock(&actor.user_id, reason.clone(), at)
    })
    .await
}

pub async fn unlock_keys(
    store: &dyn RecordStore,
    actor: &Actor,
    user_id: &str,
) -> Result<User, AppError> {
    apply_to_keys(store, actor, user_id, "unlocked", ApiKey::unlock).await
}

/// Apply `change` to each of the user's keys.
///
/// The canonical key record is changed, not the snapshot. Snapshots whose key
/// no longer exists are dropped. Each key is saved as it is changed and the
/// user is saved once at the end, so a failure part way leaves earlier keys
/// changed and the snapshot map stale.
async fn apply_to_keys<F>(
    store: &dyn RecordStore,
    actor: &Actor,
    user_id: &str,
    action: &str,
    mut change: F,
) -> Result<User, AppError>
where
    F: FnMut(&mut ApiKey),
{
    let mut user = load_user(store, actor, user_id).await?;
    let ids: Vec<String> = user.api_keys.keys().cloned().collect();

    for api_key in &ids {
        let Some(mut key) = store.get_key(api_key).await? else {
            warn!(api_key, user_id, "Dropping snapshot of a deleted key");
            user.forget_key(api_key);
            continue;
        };

        change(&mut key);
        store.save_key(&key).await?;
        user.record_key(&key);
    }

    store.save_user(&user).await?;

    info!(user_id, by = %actor.user_id, keys = ids.len(), "All keys {}", action);
    Ok(user)
}

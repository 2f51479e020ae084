//! API key lifecycle operations for owners and admins.
//!
//! Every mutation follows the same write order: save the key, then copy its
//! new state into the owner's snapshot map and save the owner. Nothing is
//! written when a check fails.
//!
//! # Permissions
//!
//! | Operation                | Owner | Admin |
//! |--------------------------|-------|-------|
//! | create                   | unless user locked or creation disabled | unless user locked |
//! | rename / update details  | yes   | yes   |
//! | disable                  | yes   | yes   |
//! | enable                   | unless key locked | yes |
//! | delete (disabled only)   | yes   | yes   |
//! | admin lock / unlock      | no    | yes   |

use tracing::info;

use crate::{
    config::AccessPolicy,
    error::AppError,
    models::{actor::Actor, api_key::ApiKey, now, user::User},
    store::RecordStore,
};

use super::{key_generator, origin_validator};

/// Reject actors outside the admin whitelist.
pub fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(AppError::forbidden("This action requires admin rights."))
    }
}

/// Save a key and mirror it into its owner's snapshot map.
pub(crate) async fn persist(
    store: &dyn RecordStore,
    key: &ApiKey,
    owner: &mut User,
) -> Result<(), AppError> {
    store.save_key(key).await?;
    owner.record_key(key);
    store.save_user(owner).await
}

/// Load a key the actor may manage, together with its owner.
///
/// # Errors
///
/// - `NotFound` if the key or its owner does not exist
/// - `Forbidden` if the actor neither owns the key nor is an admin
pub async fn load_managed_key(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
) -> Result<(ApiKey, User), AppError> {
    let key = store
        .get_key(api_key)
        .await?
        .ok_or_else(|| AppError::not_found("That API key doesn't exist."))?;

    if !actor.is_admin && !actor.owns(&key) {
        return Err(AppError::forbidden("That key doesn't belong to you."));
    }

    let owner = store
        .get_user(&key.person_id)
        .await?
        .ok_or_else(|| AppError::not_found("The owner of that API key doesn't exist."))?;

    Ok((key, owner))
}

/// Load a managed key, apply `change`, and persist it if the change succeeds.
async fn mutate_key<F>(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
    change: F,
) -> Result<ApiKey, AppError>
where
    F: FnOnce(&mut ApiKey) -> Result<(), AppError>,
{
    let (mut key, mut owner) = load_managed_key(store, actor, api_key).await?;

    change(&mut key)?;
    persist(store, &key, &mut owner).await?;

    Ok(key)
}

/// Create a new key owned by the actor.
///
/// # Errors
///
/// - `Forbidden` if the actor's account is admin-locked
/// - `Forbidden` if key creation is disabled and the actor is not an admin
pub async fn create_key(
    store: &dyn RecordStore,
    policy: &AccessPolicy,
    actor: &Actor,
) -> Result<ApiKey, AppError> {
    let mut owner = store
        .get_user(&actor.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("That user doesn't exist."))?;

    if owner.admin_locked {
        return Err(AppError::forbidden(
            "You cannot create a new API key because your account was locked by an admin.",
        ));
    }

    if policy.disable_user_api_key_creation && !actor.is_admin {
        return Err(AppError::forbidden(
            "You cannot create a new API key because the feature is disabled.",
        ));
    }

    let key = ApiKey::new(key_generator::new_id(), owner.id.clone(), now());
    persist(store, &key, &mut owner).await?;

    info!(api_key = %key.api_key, user_id = %owner.id, "API key created");
    Ok(key)
}

/// Replace a key's name and allow-list.
///
/// The allow-list text is validated before anything changes; a blank text
/// clears the list.
pub async fn update_details(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
    name: Option<String>,
    allowed_origins: &str,
) -> Result<ApiKey, AppError> {
    let origins = origin_validator::parse_allowed_origins(allowed_origins)?;

    let key = mutate_key(store, actor, api_key, |key| {
        key.name = name;
        key.allowed_origins = origins;
        Ok(())
    })
    .await?;

    info!(api_key, by = %actor.user_id, "API key details saved");
    Ok(key)
}

pub async fn rename_key(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
    name: Option<String>,
) -> Result<ApiKey, AppError> {
    let key = mutate_key(store, actor, api_key, |key| {
        key.name = name;
        Ok(())
    })
    .await?;

    info!(api_key, by = %actor.user_id, "API key renamed");
    Ok(key)
}

/// Disable a key. Disabling a disabled key is a no-op write.
pub async fn disable_key(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
) -> Result<ApiKey, AppError> {
    let key = mutate_key(store, actor, api_key, |key| {
        key.enabled = false;
        Ok(())
    })
    .await?;

    info!(api_key, by = %actor.user_id, "API key disabled");
    Ok(key)
}

/// Enable a key.
///
/// # Errors
///
/// `PreconditionFailed` if the key is admin-locked and the actor is not an admin.
pub async fn enable_key(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
) -> Result<ApiKey, AppError> {
    let key = mutate_key(store, actor, api_key, |key| {
        if key.admin_locked && !actor.is_admin {
            return Err(AppError::precondition(
                "This API key was locked by an admin and cannot be enabled.",
            ));
        }
        key.enabled = true;
        Ok(())
    })
    .await?;

    info!(api_key, by = %actor.user_id, "API key enabled");
    Ok(key)
}

/// Permanently delete a disabled key and drop it from its owner's map.
///
/// # Errors
///
/// `PreconditionFailed` if the key is still enabled.
pub async fn delete_key(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
) -> Result<(), AppError> {
    let (key, mut owner) = load_managed_key(store, actor, api_key).await?;

    if key.enabled {
        return Err(AppError::precondition(
            "Please disable the key before attempting to delete it.",
        ));
    }

    store.delete_key(&key.api_key).await?;
    owner.forget_key(&key.api_key);
    store.save_user(&owner).await?;

    info!(api_key, by = %actor.user_id, "API key deleted");
    Ok(())
}

/// Admin-lock a key so its owner cannot enable it.
pub async fn lock_key(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
    reason: Option<String>,
) -> Result<ApiKey, AppError> {
    require_admin(actor)?;

    let key = mutate_key(store, actor, api_key, |key| {
        key.lock(&actor.user_id, reason, now());
        Ok(())
    })
    .await?;

    info!(api_key, by = %actor.user_id, "API key locked");
    Ok(key)
}

pub async fn unlock_key(
    store: &dyn RecordStore,
    actor: &Actor,
    api_key: &str,
) -> Result<ApiKey, AppError> {
    require_admin(actor)?;

    let key = mutate_key(store, actor, api_key, |key| {
        key.unlock();
        Ok(())
    })
    .await?;

    info!(api_key, by = %actor.user_id, "API key unlocked");
    Ok(key)
}

//! Request and response bodies of the key management endpoints.

use serde::{Deserialize, Serialize};

use super::{api_key::ApiKey, user::User};

/// Body of `POST /keys/{api_key}` and `POST /admin/keys/{api_key}`.
///
/// ```json
/// { "action": "save", "name": "Maps", "allowed_origins": "https://a.example\nhttps://*.b.example" }
/// { "action": "admin_lock", "reason": "abuse" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum KeyAction {
    /// Omitting `allowed_origins` keeps the current list; a blank string clears it.
    Save {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        allowed_origins: Option<String>,
    },
    Disable,
    Enable,
    Delete,
    AdminLock {
        #[serde(default)]
        reason: Option<String>,
    },
    AdminUnlock,
}

/// Body of `POST /admin/users/{user_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UserAction {
    AdminLock {
        #[serde(default)]
        reason: Option<String>,
    },
    AdminUnlock,
    DisableKeys,
    EnableKeys,
    LockKeys {
        #[serde(default)]
        reason: Option<String>,
    },
    UnlockKeys,
}

/// Response of `GET /keys`.
#[derive(Debug, Serialize)]
pub struct KeyListResponse {
    pub keys: Vec<ApiKey>,

    /// True when the caller may not create keys right now
    pub key_creation_disabled: bool,
}

/// Response of `GET /admin/keys/{api_key}`.
#[derive(Debug, Serialize)]
pub struct AdminKeyResponse {
    pub key: ApiKey,
    pub owner: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_actions_are_tagged_by_name() {
        let save: KeyAction =
            serde_json::from_str(r#"{"action":"save","name":"maps","allowed_origins":""}"#)
                .unwrap();
        assert_eq!(
            save,
            KeyAction::Save {
                name: Some("maps".into()),
                allowed_origins: Some(String::new()),
            }
        );

        let lock: KeyAction = serde_json::from_str(r#"{"action":"admin_lock"}"#).unwrap();
        assert_eq!(lock, KeyAction::AdminLock { reason: None });

        assert!(serde_json::from_str::<KeyAction>(r#"{"action":"explode"}"#).is_err());
    }

    #[test]
    fn user_actions_are_tagged_by_name() {
        let action: UserAction =
            serde_json::from_str(r#"{"action":"lock_keys","reason":"spam"}"#).unwrap();

        assert_eq!(
            action,
            UserAction::LockKeys {
                reason: Some("spam".into())
            }
        );
    }
}

//! API Key model.
//!
//! API keys are opaque bearer tokens identifying a calling application. The
//! key string itself is the primary lookup key, so verification never needs
//! the owning user's id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Represents an API key record.
///
/// # Storage
///
/// - Blob store: JSON under `keys/<api_key>`, plus a snapshot embedded in the
///   owner's `users/<person_id>` record.
/// - Relational: a row of the `api_keys` table, `person_id` referencing `people.id`.
///
/// # States
///
/// `{enabled, disabled} x {unlocked, admin_locked}`. A locked key can still
/// be disabled, but its owner cannot enable it again until an admin unlocks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    /// The key string handed to callers
    pub api_key: String,

    /// Id of the owning user
    pub person_id: String,

    /// User-editable label
    #[serde(default)]
    pub name: Option<String>,

    /// Disabled keys fail verification
    pub enabled: bool,

    /// Glob patterns a request origin must match. `None` allows any origin.
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub admin_locked: bool,

    /// Id of the admin who applied the lock
    #[serde(default)]
    pub admin_lock_user: Option<String>,

    #[serde(default)]
    pub admin_lock_reason: Option<String>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub admin_lock_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// A fresh key for `person_id`: enabled, unlocked, unnamed and unrestricted.
    pub fn new(api_key: String, person_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            api_key,
            person_id: person_id.into(),
            name: None,
            enabled: true,
            allowed_origins: None,
            created_at,
            admin_locked: false,
            admin_lock_user: None,
            admin_lock_reason: None,
            admin_lock_at: None,
        }
    }

    /// Apply an admin lock, recording who locked it, why and when.
    pub fn lock(&mut self, admin_id: &str, reason: Option<String>, at: DateTime<Utc>) {
        self.admin_locked = true;
        self.admin_lock_user = Some(admin_id.to_string());
        self.admin_lock_reason = reason;
        self.admin_lock_at = Some(at);
    }

    /// Remove the admin lock together with all of its metadata.
    pub fn unlock(&mut self) {
        self.admin_locked = false;
        self.admin_lock_user = None;
        self.admin_lock_reason = None;
        self.admin_lock_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now;

    fn sample() -> ApiKey {
        ApiKey::new("k3y".into(), "owner", now())
    }

    #[test]
    fn new_keys_start_enabled_and_unlocked() {
        let key = sample();

        assert!(key.enabled);
        assert!(!key.admin_locked);
        assert!(key.allowed_origins.is_none());
        assert!(key.name.is_none());
    }

    #[test]
    fn json_round_trip_without_lock_metadata() {
        let key = sample();

        let json = serde_json::to_string(&key).unwrap();
        let decoded: ApiKey = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, key);
    }

    #[test]
    fn json_round_trip_with_lock_metadata_and_origins() {
        let mut key = sample();
        key.name = Some("maps".into());
        key.enabled = false;
        key.allowed_origins = Some(vec!["https://*.example.com".into()]);
        key.lock("admin-id", Some("abuse".into()), now());

        let json = serde_json::to_string(&key).unwrap();
        let decoded: ApiKey = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, key);
    }

    #[test]
    fn timestamps_are_stored_as_epoch_millis() {
        let json = serde_json::to_value(sample()).unwrap();

        assert!(json["created_at"].is_i64());
        assert!(json["admin_lock_at"].is_null());
    }

    #[test]
    fn legacy_records_without_lock_fields_decode_as_unlocked() {
        let decoded: ApiKey = serde_json::from_str(
            r#"{
                "person_id": "owner",
                "api_key": "abc",
                "enabled": true,
                "name": null,
                "allowed_origins": null,
                "created_at": 1500000000000,
                "admin_locked": null
            }"#,
        )
        .unwrap();

        assert!(!decoded.admin_locked);
        assert!(decoded.admin_lock_at.is_none());
        assert_eq!(decoded.created_at.timestamp_millis(), 1_500_000_000_000);
    }

    #[test]
    fn unlock_clears_all_lock_metadata() {
        let mut key = sample();
        key.lock("admin-id", Some("reason".into()), now());

        key.unlock();

        assert!(!key.admin_locked);
        assert!(key.admin_lock_user.is_none());
        assert!(key.admin_lock_reason.is_none());
        assert!(key.admin_lock_at.is_none());
    }
}

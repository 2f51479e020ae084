//! User model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{api_key::ApiKey, null_as_default};
use crate::services::key_generator;

/// An account, identified by a digest of its OAuth subject id.
///
/// `api_keys` mirrors the most recently saved state of every key the user
/// owns. In the blob store it is a denormalized copy that the caller keeps
/// in sync by saving the key first and the user second; the relational
/// backend fills it from the `api_keys` table instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// `key_generator::user_id_for(social_id)`. Older records omit it.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    /// OAuth identity, e.g. `github$12345`
    pub social_id: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(default, deserialize_with = "null_as_default")]
    #[sqlx(skip)]
    pub api_keys: BTreeMap<String, ApiKey>,

    /// Locked users cannot create new keys
    #[serde(default, deserialize_with = "null_as_default")]
    pub admin_locked: bool,

    #[serde(default)]
    pub admin_lock_user: Option<String>,

    #[serde(default)]
    pub admin_lock_reason: Option<String>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub admin_lock_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(social_id: impl Into<String>, email: Option<String>, created_at: DateTime<Utc>) -> Self {
        let social_id = social_id.into();

        Self {
            id: key_generator::user_id_for(&social_id),
            email,
            social_id,
            created_at,
            api_keys: BTreeMap::new(),
            admin_locked: false,
            admin_lock_user: None,
            admin_lock_reason: None,
            admin_lock_at: None,
        }
    }

    /// Fill in the derived id on records that were stored without one.
    pub fn with_derived_id(mut self) -> Self {
        if self.id.is_empty() {
            self.id = key_generator::user_id_for(&self.social_id);
        }
        self
    }

    /// The numeric GitHub account id for `github$<id>` identities.
    pub fn github_id(&self) -> Option<u64> {
        self.social_id.strip_prefix("github$")?.parse().ok()
    }

    /// Copy the current state of `key` into the embedded snapshot map.
    pub fn record_key(&mut self, key: &ApiKey) {
        self.api_keys.insert(key.api_key.clone(), key.clone());
    }

    pub fn forget_key(&mut self, api_key: &str) {
        self.api_keys.remove(api_key);
    }

    pub fn lock(&mut self, admin_id: &str, reason: Option<String>, at: DateTime<Utc>) {
        self.admin_locked = true;
        self.admin_lock_user = Some(admin_id.to_string());
        self.admin_lock_reason = reason;
        self.admin_lock_at = Some(at);
    }

    pub fn unlock(&mut self) {
        self.admin_locked = false;
        self.admin_lock_user = None;
        self.admin_lock_reason = None;
        self.admin_lock_at = None;
    }
}

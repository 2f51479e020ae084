//! The identity on whose behalf a mutation runs.

use crate::config::AccessPolicy;

use super::{api_key::ApiKey, user::User};

/// Who is acting, and whether the admin whitelist covers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub social_id: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn for_user(user: &User, policy: &AccessPolicy) -> Self {
        Self {
            user_id: user.id.clone(),
            social_id: user.social_id.clone(),
            is_admin: policy.is_admin(&user.social_id),
        }
    }

    pub fn owns(&self, key: &ApiKey) -> bool {
        key.person_id == self.user_id
    }
}

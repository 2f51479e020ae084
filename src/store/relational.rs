//! Normalized Postgres backend.
//!
//! # Tables
//!
//! - `people`: one row per user, keyed by the derived user id
//! - `api_keys`: one row per key, `person_id` referencing `people(id)`
//!
//! No application cache sits in front of these queries.

use async_trait::async_trait;

use crate::{
    db::DbPool,
    error::AppError,
    models::{api_key::ApiKey, user::User},
};

use super::RecordStore;

const USER_COLUMNS: &str = "id, email, social_id, created_at, admin_locked, admin_lock_user, admin_lock_reason, admin_lock_at";

const KEY_COLUMNS: &str = "api_key, person_id, name, enabled, allowed_origins, created_at, admin_locked, admin_lock_user, admin_lock_reason, admin_lock_at";

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM people WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut user) = user else {
            return Ok(None);
        };

        let keys = sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {} FROM api_keys WHERE person_id = $1 ORDER BY created_at",
            KEY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        for key in &keys {
            user.record_key(key);
        }

        Ok(Some(user))
    }

    async fn get_key(&self, api_key: &str) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {} FROM api_keys WHERE api_key = $1",
            KEY_COLUMNS
        ))
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    /// Upsert the user row. The key map is owned by `api_keys` and ignored here.
    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO people (
                id, email, social_id, created_at,
                admin_locked, admin_lock_user, admin_lock_reason, admin_lock_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                admin_locked = EXCLUDED.admin_locked,
                admin_lock_user = EXCLUDED.admin_lock_user,
                admin_lock_reason = EXCLUDED.admin_lock_reason,
                admin_lock_at = EXCLUDED.admin_lock_at
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.social_id)
        .bind(user.created_at)
        .bind(user.admin_locked)
        .bind(&user.admin_lock_user)
        .bind(&user.admin_lock_reason)
        .bind(user.admin_lock_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_key(&self, key: &ApiKey) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (
                api_key, person_id, name, enabled, allowed_origins, created_at,
                admin_locked, admin_lock_user, admin_lock_reason, admin_lock_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (api_key) DO UPDATE
            SET name = EXCLUDED.name,
                enabled = EXCLUDED.enabled,
                allowed_origins = EXCLUDED.allowed_origins,
                admin_locked = EXCLUDED.admin_locked,
                admin_lock_user = EXCLUDED.admin_lock_user,
                admin_lock_reason = EXCLUDED.admin_lock_reason,
                admin_lock_at = EXCLUDED.admin_lock_at
            "#,
        )
        .bind(&key.api_key)
        .bind(&key.person_id)
        .bind(&key.name)
        .bind(key.enabled)
        .bind(&key.allowed_origins)
        .bind(key.created_at)
        .bind(key.admin_locked)
        .bind(&key.admin_lock_user)
        .bind(&key.admin_lock_reason)
        .bind(key.admin_lock_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_key(&self, api_key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM api_keys WHERE api_key = $1")
            .bind(api_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// These need a Postgres server: run with `DATABASE_URL` set and `--ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now;

    fn user_with_key(social_id: &str, api_key: &str) -> (User, ApiKey) {
        let user = User::new(social_id, Some("dev@example.com".into()), now());
        let key = ApiKey::new(api_key.into(), user.id.clone(), now());
        (user, key)
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn records_round_trip(pool: sqlx::PgPool) {
        let store = PgRecordStore::new(pool);
        let (mut user, mut key) = user_with_key("github$1", "k1");
        user.lock("admin", Some("spam".into()), now());
        key.name = Some("maps".into());
        key.allowed_origins = Some(vec!["https://*.example.com".into()]);
        key.lock("admin", None, now());

        store.save_user(&user).await.unwrap();
        store.save_key(&key).await.unwrap();

        user.record_key(&key);
        assert_eq!(store.get_key("k1").await.unwrap(), Some(key));
        assert_eq!(store.get_user(&user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(
            store.get_user_by_social_id("github$1").await.unwrap(),
            Some(user)
        );
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn key_map_follows_the_api_keys_table(pool: sqlx::PgPool) {
        let store = PgRecordStore::new(pool);
        let (user, mut first) = user_with_key("github$2", "k1");
        let second = ApiKey::new("k2".into(), user.id.clone(), now());
        store.save_user(&user).await.unwrap();
        store.save_key(&first).await.unwrap();
        store.save_key(&second).await.unwrap();

        first.enabled = false;
        store.save_key(&first).await.unwrap();

        let loaded = store.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.api_keys.len(), 2);
        assert!(!loaded.api_keys["k1"].enabled);

        store.delete_key("k1").await.unwrap();

        let loaded = store.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(
            loaded.api_keys.keys().cloned().collect::<Vec<_>>(),
            vec!["k2".to_string()]
        );
        assert_eq!(store.get_key("k1").await.unwrap(), None);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn missing_records_and_ping(pool: sqlx::PgPool) {
        let store = PgRecordStore::new(pool);

        store.ping().await.unwrap();
        assert_eq!(store.get_user("nobody").await.unwrap(), None);
        assert_eq!(store.get_key("nope").await.unwrap(), None);
        store.delete_key("nope").await.unwrap();
    }
}

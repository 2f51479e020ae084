//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

/// Which record store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON records in an in-process blob store. Nothing survives a restart.
    Memory,
    /// JSON records in the Postgres `blobs` table behind the read-through cache.
    Kv,
    /// Normalized `people` / `api_keys` tables.
    Relational,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string, required unless `STORAGE_BACKEND=memory`
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `STORAGE_BACKEND` (optional): `memory`, `kv` or `relational`, defaults to `kv`
/// - `STORAGE_PREFIX` (optional): namespace for blob keys, e.g. `dev` or `prod`
/// - `CACHE_CAPACITY` (optional): maximum cached records, defaults to 1000
/// - `CACHE_TTL_SECS` (optional): seconds a cached record may be served, defaults to 300
/// - `ADMIN_WHITELIST` (optional): comma separated social ids with admin rights
/// - `DISABLE_USER_API_KEY_CREATION` (optional): stop non-admins from creating keys
/// - `IDENTITY_HEADER` / `EMAIL_HEADER` (optional): headers set by the authenticating proxy
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_backend")]
    pub storage_backend: StorageBackend,

    #[serde(default)]
    pub storage_prefix: String,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub admin_whitelist: Vec<String>,

    #[serde(default)]
    pub disable_user_api_key_creation: bool,

    #[serde(default = "default_identity_header")]
    pub identity_header: String,

    #[serde(default = "default_email_header")]
    pub email_header: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_backend() -> StorageBackend {
    StorageBackend::Kv
}

fn default_cache_capacity() -> u64 {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_identity_header() -> String {
    "x-forwarded-user".to_string()
}

fn default_email_header() -> String {
    "x-forwarded-email".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variable values cannot be parsed into expected types.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The admin and key-creation rules derived from this configuration.
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy {
            admin_whitelist: self
                .admin_whitelist
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            disable_user_api_key_creation: self.disable_user_api_key_creation,
        }
    }
}

/// Deployment rules consulted by the authorization checks.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Social ids (e.g. `github$1234`) granted admin rights.
    pub admin_whitelist: HashSet<String>,

    /// When set, only admins may create keys.
    pub disable_user_api_key_creation: bool,
}

impl AccessPolicy {
    pub fn is_admin(&self, social_id: &str) -> bool {
        self.admin_whitelist.contains(social_id)
    }
}

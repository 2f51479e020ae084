//! Data models representing stored records.
//!
//! Both records serialize to the JSON layout kept in the blob store and map
//! onto the rows of the relational backend.

use chrono::{DateTime, SubsecRound, Utc};

/// Request and response bodies
pub mod action;
/// Identity performing a mutation
pub mod actor;
/// API key record
pub mod api_key;
/// Account record with its embedded key snapshots
pub mod user;

/// Current time truncated to the millisecond precision of the stored format.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Decode `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de> + Default,
{
    let value: Option<T> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

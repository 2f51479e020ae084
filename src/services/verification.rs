//! API key verification.
//!
//! This is the check external services call to decide whether a request
//! carrying an API key may proceed. It only reads from the store.

use crate::{error::AppError, models::api_key::ApiKey, store::RecordStore};

use super::origin_validator::origin_matches;

/// Why a verification was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingKey,
    UnknownKey,
    DisabledKey,
    /// The key has an allow-list but the request carried no origin.
    OriginRequired,
    OriginNotAllowed,
}

impl DenyReason {
    /// The message existing callers receive on the wire.
    ///
    /// Both origin denials share one message.
    pub fn message(self) -> &'static str {
        match self {
            DenyReason::MissingKey => "Specify a api_key query arg to check.",
            DenyReason::UnknownKey => "Unknown API key.",
            DenyReason::DisabledKey => "Disabled API key.",
            DenyReason::OriginRequired | DenyReason::OriginNotAllowed => {
                "Origin is not allowed by API key."
            }
        }
    }
}

/// Outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(DenyReason),
}

/// Check an origin against a key's allow-list.
///
/// An empty or absent allow-list allows everything, including requests
/// without an origin. Otherwise the first matching pattern allows.
pub fn check_origin(key: &ApiKey, origin: Option<&str>) -> Verdict {
    let patterns = match key.allowed_origins.as_deref() {
        None | Some([]) => return Verdict::Allowed,
        Some(patterns) => patterns,
    };

    let Some(origin) = origin.filter(|o| !o.is_empty()) else {
        return Verdict::Denied(DenyReason::OriginRequired);
    };

    if patterns.iter().any(|pattern| origin_matches(pattern, origin)) {
        Verdict::Allowed
    } else {
        Verdict::Denied(DenyReason::OriginNotAllowed)
    }
}

/// Verify an API key for a requesting origin.
///
/// # Process
///
/// 1. Missing or empty key: denied
/// 2. Key not in the store: denied
/// 3. Key disabled: denied, whatever its allow-list says
/// 4. Origin checked against the allow-list
///
/// # Errors
///
/// Only store failures. Every denial is a `Verdict`, never an error.
pub async fn verify(
    store: &dyn RecordStore,
    api_key: Option<&str>,
    origin: Option<&str>,
) -> Result<Verdict, AppError> {
    let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
        return Ok(Verdict::Denied(DenyReason::MissingKey));
    };

    let Some(key) = store.get_key(api_key).await? else {
        return Ok(Verdict::Denied(DenyReason::UnknownKey));
    };

    if !key.enabled {
        return Ok(Verdict::Denied(DenyReason::DisabledKey));
    }

    Ok(check_origin(&key, origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now;
    use crate::store::testing::memory_store;

    fn key_with_origins(origins: Option<Vec<&str>>) -> ApiKey {
        let mut key = ApiKey::new("abc".into(), "owner", now());
        key.allowed_origins = origins.map(|o| o.into_iter().map(String::from).collect());
        key
    }

    #[test]
    fn no_allow_list_allows_any_origin() {
        let key = key_with_origins(None);

        assert_eq!(check_origin(&key, None), Verdict::Allowed);
        assert_eq!(check_origin(&key, Some("https://x.com")), Verdict::Allowed);
        assert_eq!(
            check_origin(&key_with_origins(Some(vec![])), None),
            Verdict::Allowed
        );
    }

    #[test]
    fn allow_list_requires_an_origin() {
        let key = key_with_origins(Some(vec!["https://*.example.com"]));

        assert_eq!(
            check_origin(&key, None),
            Verdict::Denied(DenyReason::OriginRequired)
        );
        assert_eq!(
            check_origin(&key, Some("")),
            Verdict::Denied(DenyReason::OriginRequired)
        );
    }

    #[test]
    fn glob_allow_list() {
        let wildcard = key_with_origins(Some(vec!["https://*.example.com"]));
        let other = key_with_origins(Some(vec!["https://other.com"]));

        assert_eq!(
            check_origin(&wildcard, Some("https://sub.example.com")),
            Verdict::Allowed
        );
        assert_eq!(
            check_origin(&other, Some("https://sub.example.com")),
            Verdict::Denied(DenyReason::OriginNotAllowed)
        );
    }

    #[test]
    fn any_matching_entry_allows() {
        let key = key_with_origins(Some(vec!["https://a.com", "https://b.com"]));

        assert_eq!(check_origin(&key, Some("https://b.com")), Verdict::Allowed);
    }

    #[tokio::test]
    async fn missing_key_is_denied() {
        let (store, _) = memory_store();

        assert_eq!(
            verify(&store, None, None).await.unwrap(),
            Verdict::Denied(DenyReason::MissingKey)
        );
        assert_eq!(
            verify(&store, Some(""), None).await.unwrap(),
            Verdict::Denied(DenyReason::MissingKey)
        );
    }

    #[tokio::test]
    async fn unknown_key_is_denied_for_any_origin() {
        let (store, _) = memory_store();

        for origin in [None, Some("https://example.com")] {
            assert_eq!(
                verify(&store, Some("nope"), origin).await.unwrap(),
                Verdict::Denied(DenyReason::UnknownKey)
            );
        }
    }

    #[tokio::test]
    async fn disabled_key_is_denied_regardless_of_allow_list() {
        let (store, _) = memory_store();
        let mut key = key_with_origins(Some(vec!["https://*"]));
        key.enabled = false;
        store.save_key(&key).await.unwrap();

        assert_eq!(
            verify(&store, Some("abc"), Some("https://example.com"))
                .await
                .unwrap(),
            Verdict::Denied(DenyReason::DisabledKey)
        );
    }

    #[tokio::test]
    async fn enabled_key_checks_origin() {
        let (store, _) = memory_store();
        store
            .save_key(&key_with_origins(Some(vec!["https://*.example.com"])))
            .await
            .unwrap();

        assert_eq!(
            verify(&store, Some("abc"), Some("https://sub.example.com"))
                .await
                .unwrap(),
            Verdict::Allowed
        );
        assert_eq!(
            verify(&store, Some("abc"), Some("https://other.com"))
                .await
                .unwrap(),
            Verdict::Denied(DenyReason::OriginNotAllowed)
        );
    }

    #[test]
    fn wire_messages() {
        assert_eq!(DenyReason::UnknownKey.message(), "Unknown API key.");
        assert_eq!(
            DenyReason::OriginRequired.message(),
            DenyReason::OriginNotAllowed.message()
        );
    }
}

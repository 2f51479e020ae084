//! Public API key check used by the services that accept keys.
//!
//! - GET /verify?api_key=..&origin=..

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    error::AppError,
    services::verification::{self, Verdict},
    state::AppState,
};

/// Query parameters of `/verify`.
///
/// A repeated parameter keeps its first value, and an empty `origin` counts
/// as absent so `referer` can stand in for it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyQuery {
    pub api_key: Option<String>,
    pub origin: Option<String>,
}

impl VerifyQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut api_key = None;
        let mut origin = None;
        let mut referer = None;

        for (name, value) in pairs {
            let slot = match name.as_str() {
                "api_key" => &mut api_key,
                "origin" => &mut origin,
                "referer" => &mut referer,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        Self {
            api_key,
            origin: origin.filter(|o| !o.is_empty()).or(referer),
        }
    }
}

/// Verification result in the format existing callers parse.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// `success` or `error`
    pub result: &'static str,
    pub message: &'static str,
}

/// Verify an API key.
///
/// # Response
///
/// - **200 OK**: `{"result": "success", "message": "Valid API key."}`
/// - **400 Bad Request**: `{"result": "error", "message": "..."}` for a
///   missing, unknown or disabled key, or an origin the key does not allow
/// - **500**: the store could not be read
pub async fn verify_key(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<VerifyResponse>), AppError> {
    let query = VerifyQuery::from_pairs(pairs);

    let verdict = verification::verify(
        state.store.as_ref(),
        query.api_key.as_deref(),
        query.origin.as_deref(),
    )
    .await?;

    let response = match verdict {
        Verdict::Allowed => (
            StatusCode::OK,
            Json(VerifyResponse {
                result: "success",
                message: "Valid API key.",
            }),
        ),
        Verdict::Denied(reason) => {
            debug!(api_key = ?query.api_key, origin = ?query.origin, ?reason, "Verification denied");
            (
                StatusCode::BAD_REQUEST,
                Json(VerifyResponse {
                    result: "error",
                    message: reason.message(),
                }),
            )
        }
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn first_value_of_a_repeated_parameter_wins() {
        let query = VerifyQuery::from_pairs(pairs(&[
            ("api_key", "a"),
            ("api_key", "b"),
            ("origin", "https://one.example"),
            ("origin", "https://two.example"),
        ]));

        assert_eq!(query.api_key.as_deref(), Some("a"));
        assert_eq!(query.origin.as_deref(), Some("https://one.example"));
    }

    #[test]
    fn empty_origin_falls_back_to_referer() {
        let query = VerifyQuery::from_pairs(pairs(&[
            ("api_key", "a"),
            ("origin", ""),
            ("referer", "https://b.example"),
        ]));

        assert_eq!(query.origin.as_deref(), Some("https://b.example"));
    }

    #[test]
    fn origin_takes_precedence_over_referer() {
        let query = VerifyQuery::from_pairs(pairs(&[
            ("referer", "https://b.example"),
            ("origin", "https://a.example"),
        ]));

        assert_eq!(query.origin.as_deref(), Some("https://a.example"));
    }

    #[test]
    fn unrelated_parameters_are_ignored() {
        let query = VerifyQuery::from_pairs(pairs(&[("callback", "x")]));

        assert_eq!(query, VerifyQuery::default());
    }
}

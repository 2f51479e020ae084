//! Shared application state.

use std::sync::Arc;

use crate::{config::AccessPolicy, store::RecordStore};

/// Handed to every handler and middleware through `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub policy: Arc<AccessPolicy>,

    /// Header carrying the authenticated social id
    pub identity_header: String,
    pub email_header: String,
}

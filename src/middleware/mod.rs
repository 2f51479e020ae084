//! HTTP middleware components.
//!
//! Middleware run before route handlers. They resolve who is calling and
//! short-circuit requests that may not proceed.

/// Proxy-header identity and admin gate
pub mod auth;

//! Business logic services.
//!
//! Services contain the core rules separated from HTTP handlers. They talk
//! to storage only through `RecordStore`.

pub mod key_generator;
pub mod key_service;
pub mod origin_validator;
pub mod user_service;
pub mod verification;

//! Core data models for the pet adoption service.
//!
//! Entities map to database tables via `sqlx::FromRow` and serialize as JSON
//! via `serde`. Form types carry their own validation.

pub mod contact;
pub mod pet;
pub mod user;

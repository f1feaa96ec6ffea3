//! Business logic, independent of HTTP.

pub mod accounts;
pub mod catalog;
pub mod media;
pub mod pet_admin;
pub mod pet_store;
pub mod seed;
pub mod statistics;

//! Domain core for the sweet shop backend.
//!
//! Everything in this crate is pure: no database, no HTTP. The repository
//! and protocol layers in `sweetshop-db` call into these modules to decide
//! *what* to write before they write it.

pub mod catalog;
pub mod error;
pub mod pricing;
pub mod reservation;
pub mod roles;
pub mod types;

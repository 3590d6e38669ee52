//! Request extractors that gate the shop's routes.
//!
//! Catalog reads and every cart operation take [`rbac::RequireAuth`];
//! catalog writes and restocking take [`rbac::RequireAdmin`].

pub mod auth;
pub mod rbac;

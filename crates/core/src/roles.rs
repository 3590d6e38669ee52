//! Well-known role name constants.
//!
//! These must match the `ck_users_role` check constraint in the initial
//! migration.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Returns `true` if `role` is one of the roles a user row may carry.
pub fn is_known_role(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_USER
}

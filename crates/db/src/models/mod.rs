//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - `Deserialize` create / update DTOs where the entity is writable
//! - `Serialize` response shapes built from rows

pub mod cart;
pub mod sweet;
pub mod user;

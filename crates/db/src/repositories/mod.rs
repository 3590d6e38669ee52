//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Catalog
//! and user reads accept any executor (`&PgPool` or an open transaction);
//! ledger and cart writes take `&mut PgConnection` because they are only
//! meaningful inside the reservation protocol's transactions.

pub mod cart_repo;
pub mod ledger_repo;
pub mod sweet_repo;
pub mod user_repo;

pub use cart_repo::CartRepo;
pub use ledger_repo::LedgerRepo;
pub use sweet_repo::SweetRepo;
pub use user_repo::UserRepo;

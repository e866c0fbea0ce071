//! Repository functions over sqlx. Stock mutations are conditional updates
//! so concurrent callers serialize at row level without explicit locks.

pub mod product_repo;
pub mod reservation_repo;
pub mod stock_repo;

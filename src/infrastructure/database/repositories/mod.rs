//! SeaORM implementations of the domain store traits

pub mod user_repository;

pub use user_repository::SeaOrmUserStore;

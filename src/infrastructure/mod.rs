//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod peers;
pub mod registry;

pub use database::{init_database, run_migrations, DatabaseConfig};
pub use peers::{HttpActivityAggregator, PeerKeys};
pub use registry::{ConsulRegistry, StaticRegistry};

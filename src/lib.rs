//! # Users Service
//!
//! User-account microservice: identity CRUD, bcrypt-backed login issuing
//! HS256 bearer tokens, and single-user reads enriched with ratings,
//! comments and reservations fetched from peer services.
//!
//! ## Architecture
//!
//! - **domain**: entities, error taxonomy and the `UserStore` trait
//! - **application**: outbound ports, `CredentialManager` and the `UserService` orchestrator
//! - **infrastructure**: SeaORM persistence, Consul/static registry, peer HTTP client, crypto
//! - **interfaces**: axum REST API with Swagger documentation
//! - **server** / **config** / **shared**: bootstrap, configuration, graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig};
pub use interfaces::http::create_api_router;

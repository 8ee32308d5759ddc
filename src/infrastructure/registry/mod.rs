//! Key/value registry clients

pub mod consul;
pub mod memory;

pub use consul::ConsulRegistry;
pub use memory::StaticRegistry;

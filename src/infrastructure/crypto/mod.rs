//! Cryptographic primitives: bcrypt password hashing and HS256 tokens

pub mod jwt;
pub mod password;

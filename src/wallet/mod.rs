//! Wallet module - signing identity for every write
//!
//! The secret key comes from the process environment (optionally via `.env`).
//! Nothing is persisted locally.

pub mod credentials;

pub use credentials::{load_signer_from_env, parse_signer};

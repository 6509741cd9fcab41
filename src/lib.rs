//! Vault Funder Library
//!
//! Resolves or creates a per-user custodial vault, funds it with configured
//! token deposits and reports its accounting state.

pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod vault;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::{RunReport, RunStage, VaultOrchestrator};

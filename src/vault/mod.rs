//! Vault provisioning and funding
//!
//! # Flow
//!
//! ```text
//! VaultResolver → (per asset) balance gate → FundingSequencer → report_vault_state
//! ```
//!
//! Resolution failures abort the run. Per-asset approval and deposit failures
//! are recorded and the next asset proceeds. Reporting failures only affect
//! the final report.

pub mod funding;
pub mod gate;
pub mod report;
pub mod resolver;
pub mod types;

pub use funding::FundingSequencer;
pub use gate::should_deposit;
pub use report::report_vault_state;
pub use resolver::{ResolvedVault, VaultResolver};
pub use types::{
    AssetOutcome, DepositIntent, FailureKind, FundingStatus, IdentityPair, Position, SkipReason,
    VaultSnapshot,
};

//! Vault domain types

use std::fmt;

use alloy::primitives::{utils::format_units, Address, TxHash, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// (leader, follower) pair a vault is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentityPair {
    pub leader: Address,
    pub follower: Address,
}

impl IdentityPair {
    pub fn new(leader: Address, follower: Address) -> Self {
        Self { leader, follower }
    }

    /// A user following themselves
    pub fn self_follow(account: Address) -> Self {
        Self::new(account, account)
    }

    pub fn is_self_follow(&self) -> bool {
        self.leader == self.follower
    }
}

impl fmt::Display for IdentityPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_self_follow() {
            write!(f, "{} (self-follow)", self.leader)
        } else {
            write!(f, "leader {} / follower {}", self.leader, self.follower)
        }
    }
}

/// One asset to move into the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositIntent {
    pub token: Address,
    /// Smallest denomination
    pub amount: U256,
    pub label: String,
    /// Display only
    pub decimals: u8,
}

impl DepositIntent {
    pub fn new(label: impl Into<String>, token: Address, amount: U256, decimals: u8) -> Self {
        Self {
            token,
            amount,
            label: label.into(),
            decimals,
        }
    }

    /// Format a raw amount of this asset for humans
    pub fn display_amount(&self, raw: U256) -> String {
        if self.decimals == 0 {
            return raw.to_string();
        }
        match format_units(raw, self.decimals) {
            Ok(s) if s.contains('.') => s.trim_end_matches('0').trim_end_matches('.').to_string(),
            Ok(s) => s,
            Err(_) => raw.to_string(),
        }
    }
}

/// Read-only projection of a position held by the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub protocol: Address,
    pub token0: Address,
    pub token1: Address,
    pub liquidity: U256,
    pub position_id: U256,
    pub is_active: bool,
}

/// Why an asset was not deposited without anything going wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    InsufficientBalance,
}

/// Which step of an asset's flow failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    BalanceUnavailable,
    ApprovalFailed,
    DepositFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::BalanceUnavailable => write!(f, "balance unavailable"),
            FailureKind::ApprovalFailed => write!(f, "approval failed"),
            FailureKind::DepositFailed => write!(f, "deposit failed"),
        }
    }
}

/// Result of one asset's approve-then-deposit flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FundingStatus {
    Deposited(U256),
    Skipped(SkipReason),
    Failed { kind: FailureKind, detail: String },
}

impl FundingStatus {
    pub fn is_deposited(&self) -> bool {
        matches!(self, FundingStatus::Deposited(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FundingStatus::Failed { .. })
    }
}

/// Outcome recorded for one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetOutcome {
    pub intent: DepositIntent,
    /// Depositor balance observed before gating, if the read succeeded
    pub balance: Option<U256>,
    pub status: FundingStatus,
    /// Hashes of every transaction this asset submitted, in order,
    /// including ones that later reverted
    pub transactions: Vec<TxHash>,
}

impl fmt::Display for AssetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = &self.intent.label;
        match &self.status {
            FundingStatus::Deposited(amount) => {
                write!(f, "{}: deposited {}", label, self.intent.display_amount(*amount))
            }
            FundingStatus::Skipped(SkipReason::InsufficientBalance) => write!(
                f,
                "{}: skipped, insufficient balance ({} < {})",
                label,
                self.balance
                    .map(|b| self.intent.display_amount(b))
                    .unwrap_or_else(|| "?".to_string()),
                self.intent.display_amount(self.intent.amount)
            ),
            FundingStatus::Failed { kind, detail } => {
                write!(f, "{}: {} ({})", label, kind, detail)
            }
        }
    }
}

/// Aggregate vault accounting read after funding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultSnapshot {
    pub vault: Address,
    pub deposited_capital: U256,
    pub high_water_mark: U256,
    pub active_position_count: U256,
    pub positions: Vec<Position>,
    pub read_at: DateTime<Utc>,
}

impl VaultSnapshot {
    pub fn active_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_active)
    }
}

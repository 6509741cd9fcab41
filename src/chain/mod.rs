//! Chain collaborators - read-only queries and signed writes
//!
//! The orchestrator only ever talks to the ledger through these two traits:
//!
//! ```text
//! ChainReader  : view calls (factory lookup, balances, vault accounting)
//! ChainWriter  : submit(call) -> PendingTx, await_finality(PendingTx) -> Receipt
//! ```
//!
//! `rpc::AlloyChain` is the production implementation. Tests use the
//! recording mock in `mock`.

pub mod abi;
pub mod rpc;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;
use crate::vault::types::{IdentityPair, Position};

pub use rpc::AlloyChain;

/// Read-only, side-effect-free view calls
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `getVault(leader, follower)` on the factory. Zero address means absent.
    async fn get_vault(&self, factory: Address, pair: &IdentityPair) -> Result<Address>;

    /// `balanceOf(account)` on a fungible token
    async fn balance_of(&self, token: Address, account: Address) -> Result<U256>;

    /// `depositedCapital()` on a vault
    async fn deposited_capital(&self, vault: Address) -> Result<U256>;

    /// `highWaterMark()` on a vault
    async fn high_water_mark(&self, vault: Address) -> Result<U256>;

    /// `getActivePositionCount()` on a vault
    async fn active_position_count(&self, vault: Address) -> Result<U256>;

    /// `getAllPositions()` on a vault
    async fn all_positions(&self, vault: Address) -> Result<Vec<Position>>;
}

/// Signs, submits and waits for state-changing transactions
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Signing identity that pays for and authorises every write
    fn signer(&self) -> Address;

    /// Sign and broadcast a call, returning as soon as the node accepts it
    async fn submit(&self, call: WriteCall) -> Result<PendingTx>;

    /// Block until the transaction is final. Fails if it reverted or was dropped.
    async fn await_finality(&self, pending: PendingTx) -> Result<Receipt>;
}

/// State-changing calls the orchestrator is allowed to make
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    /// `createVault(leader)` on the factory
    CreateVault { factory: Address, leader: Address },
    /// `approve(spender, amount)` on a token
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    /// `deposit(token, amount)` on a vault
    Deposit {
        vault: Address,
        token: Address,
        amount: U256,
    },
}

impl WriteCall {
    /// Contract the call is sent to
    pub fn contract(&self) -> Address {
        match self {
            WriteCall::CreateVault { factory, .. } => *factory,
            WriteCall::Approve { token, .. } => *token,
            WriteCall::Deposit { vault, .. } => *vault,
        }
    }

    /// Solidity signature of the called function
    pub fn signature(&self) -> &'static str {
        match self {
            WriteCall::CreateVault { .. } => abi::factory::CREATE_VAULT,
            WriteCall::Approve { .. } => abi::token::APPROVE,
            WriteCall::Deposit { .. } => abi::vault::DEPOSIT,
        }
    }
}

impl fmt::Display for WriteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteCall::CreateVault { factory, leader } => {
                write!(f, "createVault({}) on {}", leader, factory)
            }
            WriteCall::Approve {
                token,
                spender,
                amount,
            } => write!(f, "approve({}, {}) on {}", spender, amount, token),
            WriteCall::Deposit {
                vault,
                token,
                amount,
            } => write!(f, "deposit({}, {}) on {}", token, amount, vault),
        }
    }
}

/// Handle to a submitted, not yet final transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
    pub call: WriteCall,
}

/// Confirmation that a transaction reached finality
///
/// Only used as a synchronization barrier and for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Submit a call and wait for its receipt
pub async fn submit_and_wait(writer: &dyn ChainWriter, call: WriteCall) -> Result<Receipt> {
    submit_and_track(writer, call, &mut Vec::new()).await
}

/// Like `submit_and_wait`, but records the hash in `sent` as soon as the
/// transaction is broadcast, whether or not it later reaches finality
pub async fn submit_and_track(
    writer: &dyn ChainWriter,
    call: WriteCall,
    sent: &mut Vec<TxHash>,
) -> Result<Receipt> {
    info!("Submitting {} ({})", call.signature(), call);
    let pending = writer.submit(call).await?;
    debug!("Pending tx {}", pending.hash);
    sent.push(pending.hash);

    let receipt = writer.await_finality(pending).await?;
    info!(
        "Tx {} final in block {:?} (gas used: {})",
        receipt.hash,
        receipt.block_number,
        receipt.gas_used
    );
    Ok(receipt)
}

//! JSON-RPC implementation of the chain collaborators
//!
//! Reads are retried with exponential backoff when the error is transient.
//! Writes are sent exactly once; a reverted or dropped transaction is
//! reported to the caller, never resubmitted.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{
    DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
    WatchTxError,
};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use tracing::{debug, info, warn};

use super::abi::{ITribeVault, ITribeVaultFactory, IERC20, INTERFACE_VERSION};
use super::{ChainReader, ChainWriter, PendingTx, Receipt, WriteCall};
use crate::config::RpcConfig;
use crate::error::{Error, Result};
use crate::vault::types::{IdentityPair, Position};

/// Chain client over an HTTP provider with a local signing wallet
pub struct AlloyChain {
    provider: DynProvider,
    signer: Address,
    config: RpcConfig,
}

impl AlloyChain {
    /// Connect to the configured endpoint and verify the chain id
    pub async fn connect(config: &RpcConfig, signer: PrivateKeySigner) -> Result<Self> {
        let address = signer.address();
        let url: Url = config
            .endpoint
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC endpoint: {}", e)))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        let chain = Self {
            provider,
            signer: address,
            config: config.clone(),
        };

        let provider = &chain.provider;
        let chain_id = chain
            .read("eth_chainId", || async move {
                provider.get_chain_id().await.map_err(Error::from)
            })
            .await?;
        if chain_id != config.chain_id {
            return Err(Error::ChainMismatch {
                expected: config.chain_id,
                actual: chain_id,
            });
        }

        info!(
            "Connected to chain {} (interface v{}), signer {}",
            chain_id, INTERFACE_VERSION, address
        );
        Ok(chain)
    }

    /// Run a read call with per-attempt timeout and bounded retries
    async fn read<T, F, Fut>(&self, what: &'static str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout_ms = self.config.timeout_ms;
        let max_retries = self.config.max_retries;
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(self.config.retry_base_delay_ms),
            max_interval: Duration::from_millis(self.config.retry_base_delay_ms * 8),
            max_elapsed_time: None,
            ..Default::default()
        };
        let attempts = AtomicU32::new(0);

        retry(backoff, || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let call = op();
            async move {
                let result = match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::RpcTimeout(timeout_ms)),
                };
                match result {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_retryable() && attempt <= max_retries => {
                        warn!("Retryable RPC error on {} (attempt {}): {}", what, attempt, e);
                        Err(backoff::Error::transient(e))
                    }
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl ChainReader for AlloyChain {
    async fn get_vault(&self, factory: Address, pair: &IdentityPair) -> Result<Address> {
        self.read("getVault", || async move {
            let instance = ITribeVaultFactory::new(factory, &self.provider);
            Ok(instance.getVault(pair.leader, pair.follower).call().await?)
        })
        .await
    }

    async fn balance_of(&self, token: Address, account: Address) -> Result<U256> {
        self.read("balanceOf", || async move {
            let instance = IERC20::new(token, &self.provider);
            Ok(instance.balanceOf(account).call().await?)
        })
        .await
    }

    async fn deposited_capital(&self, vault: Address) -> Result<U256> {
        self.read("depositedCapital", || async move {
            let instance = ITribeVault::new(vault, &self.provider);
            Ok(instance.depositedCapital().call().await?)
        })
        .await
    }

    async fn high_water_mark(&self, vault: Address) -> Result<U256> {
        self.read("highWaterMark", || async move {
            let instance = ITribeVault::new(vault, &self.provider);
            Ok(instance.highWaterMark().call().await?)
        })
        .await
    }

    async fn active_position_count(&self, vault: Address) -> Result<U256> {
        self.read("getActivePositionCount", || async move {
            let instance = ITribeVault::new(vault, &self.provider);
            Ok(instance.getActivePositionCount().call().await?)
        })
        .await
    }

    async fn all_positions(&self, vault: Address) -> Result<Vec<Position>> {
        let raw = self
            .read("getAllPositions", || async move {
                let instance = ITribeVault::new(vault, &self.provider);
                Ok(instance.getAllPositions().call().await?)
            })
            .await?;

        Ok(raw
            .into_iter()
            .map(|p| Position {
                protocol: p.protocol,
                token0: p.token0,
                token1: p.token1,
                liquidity: p.liquidity,
                position_id: p.tokenId,
                is_active: p.isActive,
            })
            .collect())
    }
}

#[async_trait]
impl ChainWriter for AlloyChain {
    fn signer(&self) -> Address {
        self.signer
    }

    async fn submit(&self, call: WriteCall) -> Result<PendingTx> {
        let sent = match &call {
            WriteCall::CreateVault { factory, leader } => {
                ITribeVaultFactory::new(*factory, &self.provider)
                    .createVault(*leader)
                    .send()
                    .await
            }
            WriteCall::Approve {
                token,
                spender,
                amount,
            } => {
                IERC20::new(*token, &self.provider)
                    .approve(*spender, *amount)
                    .send()
                    .await
            }
            WriteCall::Deposit {
                vault,
                token,
                amount,
            } => {
                ITribeVault::new(*vault, &self.provider)
                    .deposit(*token, *amount)
                    .send()
                    .await
            }
        };

        let pending = sent
            .map_err(|e| Error::TransactionSend(format!("{}: {}", call.signature(), e)))?;
        let hash = *pending.tx_hash();
        debug!("Broadcast {} as {}", call.signature(), hash);

        Ok(PendingTx { hash, call })
    }

    async fn await_finality(&self, pending: PendingTx) -> Result<Receipt> {
        let timeout = self.config.receipt_timeout_secs;
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), pending.hash)
            .with_required_confirmations(self.config.confirmations)
            .with_timeout(timeout.map(Duration::from_secs))
            .get_receipt()
            .await
            .map_err(|e| finality_error(e, pending.hash, timeout))?;

        ensure_succeeded(receipt.status(), receipt.transaction_hash, &pending.call)?;

        Ok(Receipt {
            hash: receipt.transaction_hash,
            block_number: receipt.block_number(),
            gas_used: receipt.gas_used(),
        })
    }
}

fn finality_error(e: PendingTransactionError, hash: TxHash, timeout: Option<u64>) -> Error {
    match e {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
            Error::FinalityTimeout(hash.to_string(), timeout.unwrap_or_default())
        }
        other => Error::Rpc(format!("Receipt for {} unavailable: {}", hash, other)),
    }
}

/// A mined transaction with a failed status is a revert, never retried
fn ensure_succeeded(status: bool, hash: TxHash, call: &WriteCall) -> Result<()> {
    if status {
        return Ok(());
    }
    Err(Error::TransactionReverted(format!(
        "{} ({})",
        hash,
        call.signature()
    )))
}

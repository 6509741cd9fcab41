//! Vault resolver - find the vault for an identity pair, creating it if absent
//!
//! The factory is re-queried once the creation receipt is final. The address
//! looked up before creation is always the zero sentinel and is never reused.

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::chain::{submit_and_wait, ChainReader, ChainWriter, Receipt, WriteCall};
use crate::error::{Error, Result};

use super::types::IdentityPair;

/// Outcome of resolving a vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVault {
    pub address: Address,
    /// True when this run submitted the creation transaction
    pub created: bool,
    pub creation_receipt: Option<Receipt>,
}

/// Resolves or creates the vault bound to an identity pair
pub struct VaultResolver<'a> {
    reader: &'a dyn ChainReader,
    writer: &'a dyn ChainWriter,
    factory: Address,
}

impl<'a> VaultResolver<'a> {
    pub fn new(reader: &'a dyn ChainReader, writer: &'a dyn ChainWriter, factory: Address) -> Self {
        Self {
            reader,
            writer,
            factory,
        }
    }

    /// Look up the vault without creating it
    pub async fn lookup(&self, pair: &IdentityPair) -> Result<Option<Address>> {
        let vault = self
            .reader
            .get_vault(self.factory, pair)
            .await
            .map_err(Error::into_resolution)?;
        Ok((vault != Address::ZERO).then_some(vault))
    }

    /// Return the existing vault or create one and return its address
    ///
    /// Any failure here is fatal for the run; nothing is retried.
    pub async fn resolve_or_create(&self, pair: &IdentityPair) -> Result<ResolvedVault> {
        if let Some(address) = self.lookup(pair).await? {
            info!("Existing vault found: {}", address);
            return Ok(ResolvedVault {
                address,
                created: false,
                creation_receipt: None,
            });
        }

        if !pair.is_self_follow() {
            warn!(
                "No vault for {}; createVault only takes the leader, the factory decides the follower binding",
                pair
            );
        }

        info!("Creating new vault for {}...", pair);
        let call = WriteCall::CreateVault {
            factory: self.factory,
            leader: pair.leader,
        };
        let receipt = submit_and_wait(self.writer, call)
            .await
            .map_err(Error::into_resolution)?;

        let address = self.lookup(pair).await?.ok_or_else(|| {
            Error::Resolution(format!(
                "createVault tx {} is final but the factory still reports no vault for {}",
                receipt.hash, pair
            ))
        })?;

        info!("New vault created: {}", address);
        Ok(ResolvedVault {
            address,
            created: true,
            creation_receipt: Some(receipt),
        })
    }
}

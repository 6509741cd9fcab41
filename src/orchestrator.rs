//! Run orchestration
//!
//! One run walks `Idle → VaultResolved → Funding → Reported → Done`. Funding
//! outcomes are never retried or rolled back, and the report step is always
//! reached once funding attempts complete.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{error, info};

use crate::chain::{ChainReader, ChainWriter};
use crate::error::{Error, Result};
use crate::vault::{
    report_vault_state, AssetOutcome, DepositIntent, FundingSequencer, IdentityPair,
    VaultResolver, VaultSnapshot,
};

/// Stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStage {
    Idle,
    VaultResolved,
    Funding,
    Reported,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::VaultResolved => "vault-resolved",
            RunStage::Funding => "funding",
            RunStage::Reported => "reported",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything a run observed
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub pair: IdentityPair,
    pub vault: Address,
    pub created: bool,
    pub outcomes: Vec<AssetOutcome>,
    #[serde(serialize_with = "serialize_snapshot")]
    pub snapshot: Result<VaultSnapshot>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn deposited(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_deposited()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.deposited() - self.failed()
    }

    /// Fails if the report step failed, so the process can exit non-zero
    pub fn check(&self) -> Result<()> {
        match &self.snapshot {
            Ok(_) => Ok(()),
            Err(e) => Err(Error::Reporting(e.to_string())),
        }
    }
}

fn serialize_snapshot<S: Serializer>(
    snapshot: &Result<VaultSnapshot>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    #[serde(rename_all = "snake_case")]
    enum Snapshot<'a> {
        Ok(&'a VaultSnapshot),
        Error(String),
    }

    match snapshot {
        Ok(s) => Snapshot::Ok(s).serialize(serializer),
        Err(e) => Snapshot::Error(e.to_string()).serialize(serializer),
    }
}

/// Drives one provisioning and funding run
pub struct VaultOrchestrator {
    reader: Arc<dyn ChainReader>,
    writer: Arc<dyn ChainWriter>,
    factory: Address,
    pair: IdentityPair,
    intents: Vec<DepositIntent>,
    stage: RunStage,
}

impl VaultOrchestrator {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        factory: Address,
        pair: IdentityPair,
        intents: Vec<DepositIntent>,
    ) -> Self {
        Self {
            reader,
            writer,
            factory,
            pair,
            intents,
            stage: RunStage::Idle,
        }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn advance(&mut self, next: RunStage) {
        info!("Run stage: {} -> {}", self.stage, next);
        self.stage = next;
    }

    /// Resolve the vault, fund it, then report its state
    ///
    /// Returns `Err` only when the vault cannot be resolved. A failed report
    /// is carried in `RunReport::snapshot` next to the funding outcomes.
    pub async fn run(&mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        info!("Using wallet address: {}", self.writer.signer());
        info!("Vault identity: {}", self.pair);

        let resolver = VaultResolver::new(self.reader.as_ref(), self.writer.as_ref(), self.factory);
        let resolved = resolver.resolve_or_create(&self.pair).await.map_err(|e| {
            error!("Vault resolution failed, aborting run: {}", e);
            e
        })?;
        self.advance(RunStage::VaultResolved);

        self.advance(RunStage::Funding);
        let sequencer = FundingSequencer::new(self.reader.as_ref(), self.writer.as_ref());
        let outcomes = sequencer.fund_vault(resolved.address, &self.intents).await;

        let snapshot = report_vault_state(self.reader.as_ref(), resolved.address).await;
        if let Err(e) = &snapshot {
            error!("Vault state report failed: {}", e);
        }
        self.advance(RunStage::Reported);

        let report = RunReport {
            pair: self.pair,
            vault: resolved.address,
            created: resolved.created,
            outcomes,
            snapshot,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Run finished: {} deposited, {} skipped, {} failed",
            report.deposited(),
            report.skipped(),
            report.failed()
        );
        self.advance(RunStage::Done);

        Ok(report)
    }

    /// Read-only: report the vault state if the vault exists
    pub async fn status(&self) -> Result<Option<VaultSnapshot>> {
        let resolver = VaultResolver::new(self.reader.as_ref(), self.writer.as_ref(), self.factory);
        match resolver.lookup(&self.pair).await? {
            Some(vault) => Ok(Some(report_vault_state(self.reader.as_ref(), vault).await?)),
            None => Ok(None),
        }
    }
}

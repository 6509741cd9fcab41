//! CLI command implementations

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::info;

use crate::chain::{AlloyChain, ChainWriter};
use crate::config::Config;
use crate::orchestrator::{RunReport, VaultOrchestrator};
use crate::vault::{DepositIntent, VaultSnapshot};
use crate::wallet::load_signer_from_env;

/// Build the orchestrator from configuration and the environment key
async fn build_orchestrator(config: &Config) -> Result<(VaultOrchestrator, Vec<DepositIntent>)> {
    let signer = load_signer_from_env(&config.signer.key_env)?;

    info!("Connecting to {}...", config.rpc.endpoint);
    let chain = Arc::new(
        AlloyChain::connect(&config.rpc, signer)
            .await
            .context("Failed to connect to chain")?,
    );

    let pair = config.identity_pair(chain.signer())?;
    let intents = config.deposit_intents()?;
    let factory = config.factory_address()?;

    let orchestrator =
        VaultOrchestrator::new(chain.clone(), chain, factory, pair, intents.clone());
    Ok((orchestrator, intents))
}

/// Resolve (or create) the vault, fund it and report its state
pub async fn run(config: &Config, json: bool) -> Result<()> {
    let (mut orchestrator, _) = build_orchestrator(config).await?;

    let report = orchestrator.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    report.check()?;
    Ok(())
}

/// Read-only vault state for the configured identity pair
pub async fn status(config: &Config, json: bool) -> Result<()> {
    let (orchestrator, intents) = build_orchestrator(config).await?;

    let snapshot = orchestrator.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    match snapshot {
        Some(snapshot) => print_snapshot(&snapshot, &intents),
        None => println!("No vault exists for this identity pair yet. Run `run` to create one."),
    }
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("\n=== VAULT ===\n");
    println!("Identity: {}", report.pair);
    if report.created {
        println!("New vault created: {}", report.vault);
    } else {
        println!("Existing vault found: {}", report.vault);
    }

    println!("\n=== DEPOSITS ===\n");
    if report.outcomes.is_empty() {
        println!("No deposits configured.");
    }
    for outcome in &report.outcomes {
        println!("{}", outcome);
        for hash in &outcome.transactions {
            println!("  tx: {}", hash);
        }
    }

    let intents: Vec<DepositIntent> = report.outcomes.iter().map(|o| o.intent.clone()).collect();
    match &report.snapshot {
        Ok(snapshot) => print_snapshot(snapshot, &intents),
        Err(e) => println!("\nVault state unavailable: {}", e),
    }

    println!(
        "\nFinished in {}ms: {} deposited, {} skipped, {} failed",
        (report.finished_at - report.started_at).num_milliseconds(),
        report.deposited(),
        report.skipped(),
        report.failed()
    );
}

fn print_snapshot(snapshot: &VaultSnapshot, intents: &[DepositIntent]) {
    println!("\n=== VAULT STATE ===\n");
    println!("Vault: {}", snapshot.vault);
    println!("Deposited Capital: {}", snapshot.deposited_capital);
    println!("High Water Mark: {}", snapshot.high_water_mark);
    println!("Active Positions: {}", snapshot.active_position_count);

    if snapshot.positions.is_empty() {
        return;
    }

    println!("\n=== ACTIVE POSITIONS ===\n");
    let label_for = |token: Address| {
        intents
            .iter()
            .find(|i| i.token == token)
            .map(|i| format!(" ({})", i.label))
            .unwrap_or_default()
    };
    for (index, pos) in snapshot.positions.iter().enumerate() {
        println!("Position {}:", index + 1);
        println!("  Protocol: {}", pos.protocol);
        println!("  Token0: {}{}", pos.token0, label_for(pos.token0));
        println!("  Token1: {}{}", pos.token1, label_for(pos.token1));
        println!("  Liquidity: {}", pos.liquidity);
        println!("  Token ID: {}", pos.position_id);
        println!("  Is Active: {}", pos.is_active);
    }
}

//! State reporter - read back vault accounting after funding

use alloy::primitives::{Address, U256};
use chrono::Utc;
use tracing::{debug, warn};

use crate::chain::ChainReader;
use crate::error::{Error, Result};

use super::types::VaultSnapshot;

/// Read capital, high-water mark and positions for a vault
///
/// The position list is only fetched when the active count is non-zero.
/// Any read failure is a `Reporting` error; nothing is retried here.
pub async fn report_vault_state(reader: &dyn ChainReader, vault: Address) -> Result<VaultSnapshot> {
    let reporting = |e: Error| Error::Reporting(e.to_string());

    let deposited_capital = reader.deposited_capital(vault).await.map_err(reporting)?;
    let high_water_mark = reader.high_water_mark(vault).await.map_err(reporting)?;
    let active_position_count = reader
        .active_position_count(vault)
        .await
        .map_err(reporting)?;

    debug!(
        "Vault {}: capital={}, hwm={}, active={}",
        vault, deposited_capital, high_water_mark, active_position_count
    );

    let positions = if active_position_count > U256::ZERO {
        let positions = reader.all_positions(vault).await.map_err(reporting)?;
        if U256::from(positions.len()) != active_position_count {
            warn!(
                "Vault {} reports {} active positions but returned {}",
                vault,
                active_position_count,
                positions.len()
            );
        }
        positions
    } else {
        Vec::new()
    };

    Ok(VaultSnapshot {
        vault,
        deposited_capital,
        high_water_mark,
        active_position_count,
        positions,
        read_at: Utc::now(),
    })
}

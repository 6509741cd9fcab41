//! Balance gate - decides whether a deposit is worth attempting

use alloy::primitives::U256;

/// True iff the holder can cover the intended amount
pub fn should_deposit(asset_balance: U256, intent_amount: U256) -> bool {
    asset_balance >= intent_amount
}

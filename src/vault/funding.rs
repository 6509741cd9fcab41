//! Funding sequencer - approve then deposit, one asset at a time
//!
//! Every intent runs its own read -> gate -> approve -> deposit flow. A
//! failure inside one flow is recorded on that asset's outcome and the next
//! intent proceeds. Flows never run concurrently: all writes come from one
//! signing identity and must land in nonce order, and a deposit is only
//! submitted after its approval receipt is final.

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::chain::{submit_and_track, ChainReader, ChainWriter, WriteCall};

use super::gate::should_deposit;
use super::types::{AssetOutcome, DepositIntent, FailureKind, FundingStatus, SkipReason};

/// Runs approve+deposit flows for a list of intents against one vault
pub struct FundingSequencer<'a> {
    reader: &'a dyn ChainReader,
    writer: &'a dyn ChainWriter,
}

impl<'a> FundingSequencer<'a> {
    pub fn new(reader: &'a dyn ChainReader, writer: &'a dyn ChainWriter) -> Self {
        Self { reader, writer }
    }

    /// Fund the vault with each intent in order, returning one outcome per intent
    pub async fn fund_vault(&self, vault: Address, intents: &[DepositIntent]) -> Vec<AssetOutcome> {
        let mut outcomes = Vec::with_capacity(intents.len());
        for intent in intents {
            let outcome = self.fund_asset(vault, intent).await;
            info!("{}", outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn fund_asset(&self, vault: Address, intent: &DepositIntent) -> AssetOutcome {
        let depositor = self.writer.signer();
        let mut outcome = AssetOutcome {
            intent: intent.clone(),
            balance: None,
            status: FundingStatus::Skipped(SkipReason::InsufficientBalance),
            transactions: Vec::new(),
        };

        let balance = match self.reader.balance_of(intent.token, depositor).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("{} balance read failed: {}", intent.label, e);
                outcome.status = failed(FailureKind::BalanceUnavailable, e);
                return outcome;
            }
        };
        outcome.balance = Some(balance);
        info!("{} balance: {}", intent.label, intent.display_amount(balance));

        if !should_deposit(balance, intent.amount) {
            info!("Insufficient {} balance", intent.label);
            return outcome;
        }

        info!("Approving {}...", intent.label);
        let approve = WriteCall::Approve {
            token: intent.token,
            spender: vault,
            amount: intent.amount,
        };
        if let Err(e) = submit_and_track(self.writer, approve, &mut outcome.transactions).await {
            warn!("{} approval failed, skipping deposit: {}", intent.label, e);
            outcome.status = failed(FailureKind::ApprovalFailed, e);
            return outcome;
        }

        info!("Depositing {}...", intent.label);
        let deposit = WriteCall::Deposit {
            vault,
            token: intent.token,
            amount: intent.amount,
        };
        match submit_and_track(self.writer, deposit, &mut outcome.transactions).await {
            Ok(_) => outcome.status = FundingStatus::Deposited(intent.amount),
            Err(e) => {
                warn!("{} deposit failed: {}", intent.label, e);
                outcome.status = failed(FailureKind::DepositFailed, e);
            }
        }

        outcome
    }
}

fn failed(kind: FailureKind, error: impl ToString) -> FundingStatus {
    FundingStatus::Failed {
        kind,
        detail: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockChain, MockEvent};
    use alloy::primitives::{address, U256};

    const USER: Address = address!("1111111111111111111111111111111111111111");
    const VAULT: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const USDC: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");
    const WETH: Address = address!("4200000000000000000000000000000000000006");
    const DAI: Address = address!("50c5725949A6F0c72E6C4a641F24049A917DB0Cb");

    fn intent(label: &str, token: Address, amount: u64) -> DepositIntent {
        DepositIntent::new(label, token, U256::from(amount), 0)
    }

    fn deposits_for(calls: &[WriteCall], token: Address) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, WriteCall::Deposit { token: t, .. } if *t == token))
            .count()
    }

    #[tokio::test]
    async fn test_deposit_round_trip() {
        let chain = MockChain::new(USER).with_balance(USDC, USER, 100);
        let sequencer = FundingSequencer::new(&chain, &chain);

        let outcomes = sequencer.fund_vault(VAULT, &[intent("USDC", USDC, 2)]).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, FundingStatus::Deposited(U256::from(2)));
        assert_eq!(outcomes[0].balance, Some(U256::from(100)));
        assert_eq!(outcomes[0].transactions.len(), 2);
        assert_eq!(
            chain.submitted(),
            vec![
                WriteCall::Approve {
                    token: USDC,
                    spender: VAULT,
                    amount: U256::from(2)
                },
                WriteCall::Deposit {
                    vault: VAULT,
                    token: USDC,
                    amount: U256::from(2)
                },
            ]
        );
        assert_eq!(chain.balance(USDC, USER), U256::from(98));
    }

    #[tokio::test]
    async fn test_approval_final_before_deposit_submitted() {
        let chain = MockChain::new(USER).with_balance(USDC, USER, 10);
        let sequencer = FundingSequencer::new(&chain, &chain);

        sequencer.fund_vault(VAULT, &[intent("USDC", USDC, 2)]).await;

        let events = chain.events();
        let approve_final = events
            .iter()
            .position(|e| matches!(e, MockEvent::Finalized(WriteCall::Approve { .. })))
            .unwrap();
        let deposit_submit = events
            .iter()
            .position(|e| matches!(e, MockEvent::Submitted(WriteCall::Deposit { .. })))
            .unwrap();
        assert!(approve_final < deposit_submit);
    }

    #[tokio::test]
    async fn test_insufficient_balance_submits_nothing() {
        let chain = MockChain::new(USER);
        let sequencer = FundingSequencer::new(&chain, &chain);

        let outcomes = sequencer
            .fund_vault(VAULT, &[intent("WETH", WETH, 50_000_000_000_000)])
            .await;

        assert_eq!(
            outcomes[0].status,
            FundingStatus::Skipped(SkipReason::InsufficientBalance)
        );
        assert_eq!(outcomes[0].balance, Some(U256::ZERO));
        assert!(outcomes[0].transactions.is_empty());
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_approval_failure_is_isolated() {
        let chain = MockChain::new(USER)
            .with_balance(USDC, USER, 100)
            .with_balance(WETH, USER, 100)
            .with_balance(DAI, USER, 100)
            .failing_approve(WETH);
        let sequencer = FundingSequencer::new(&chain, &chain);

        let outcomes = sequencer
            .fund_vault(
                VAULT,
                &[
                    intent("USDC", USDC, 2),
                    intent("WETH", WETH, 3),
                    intent("DAI", DAI, 4),
                ],
            )
            .await;

        assert_eq!(outcomes[0].status, FundingStatus::Deposited(U256::from(2)));
        assert!(matches!(
            outcomes[1].status,
            FundingStatus::Failed {
                kind: FailureKind::ApprovalFailed,
                ..
            }
        ));
        assert_eq!(outcomes[2].status, FundingStatus::Deposited(U256::from(4)));
        assert_eq!(outcomes[1].transactions.len(), 1);

        let calls = chain.submitted();
        assert_eq!(deposits_for(&calls, WETH), 0);
        assert_eq!(deposits_for(&calls, USDC), 1);
        assert_eq!(deposits_for(&calls, DAI), 1);
    }

    #[tokio::test]
    async fn test_deposit_failure_recorded() {
        let chain = MockChain::new(USER)
            .with_balance(USDC, USER, 100)
            .with_balance(WETH, USER, 100)
            .failing_deposit(USDC);
        let sequencer = FundingSequencer::new(&chain, &chain);

        let outcomes = sequencer
            .fund_vault(VAULT, &[intent("USDC", USDC, 2), intent("WETH", WETH, 5)])
            .await;

        assert!(matches!(
            outcomes[0].status,
            FundingStatus::Failed {
                kind: FailureKind::DepositFailed,
                ..
            }
        ));
        // Approval landed, the reverted deposit is still recorded
        assert_eq!(outcomes[0].transactions.len(), 2);
        assert_eq!(chain.submitted().len(), 4);
        assert_eq!(outcomes[1].status, FundingStatus::Deposited(U256::from(5)));
    }

    #[tokio::test]
    async fn test_balance_read_failure_is_isolated() {
        let chain = MockChain::new(USER)
            .with_balance(WETH, USER, 100)
            .failing_balance(USDC);
        let sequencer = FundingSequencer::new(&chain, &chain);

        let outcomes = sequencer
            .fund_vault(VAULT, &[intent("USDC", USDC, 2), intent("WETH", WETH, 5)])
            .await;

        assert!(matches!(
            outcomes[0].status,
            FundingStatus::Failed {
                kind: FailureKind::BalanceUnavailable,
                ..
            }
        ));
        assert_eq!(outcomes[0].balance, None);
        assert!(outcomes[1].status.is_deposited());
    }

    #[tokio::test]
    async fn test_outcomes_follow_intent_order() {
        let chain = MockChain::new(USER).with_balance(WETH, USER, 100);
        let sequencer = FundingSequencer::new(&chain, &chain);

        let outcomes = sequencer
            .fund_vault(VAULT, &[intent("USDC", USDC, 2), intent("WETH", WETH, 5)])
            .await;

        let labels: Vec<_> = outcomes.iter().map(|o| o.intent.label.as_str()).collect();
        assert_eq!(labels, vec!["USDC", "WETH"]);
        assert!(!outcomes[0].status.is_deposited());
        assert!(outcomes[1].status.is_deposited());
    }
}

//! In-memory ledger used by unit tests
//!
//! Records every read and write in order so tests can assert on the exact
//! call sequence. Approvals set allowances and deposits consume them, so a
//! deposit without a prior final approval reverts like it would on chain.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use super::{ChainReader, ChainWriter, PendingTx, Receipt, WriteCall};
use crate::error::{Error, Result};
use crate::vault::types::{IdentityPair, Position};

/// One interaction with the mock ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Read(&'static str),
    Submitted(WriteCall),
    Finalized(WriteCall),
}

#[derive(Default)]
struct Ledger {
    vaults: HashMap<(Address, Address), Address>,
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    capital: U256,
    high_water_mark: U256,
    positions: Vec<Position>,
    active_count: Option<U256>,
    events: Vec<MockEvent>,
    next_tx: u64,
}

/// Mock chain implementing both collaborator traits
pub struct MockChain {
    signer: Address,
    created_vault: Address,
    ledger: Mutex<Ledger>,
    fail_create: bool,
    create_leaves_absent: bool,
    fail_approve: HashSet<Address>,
    fail_deposit: HashSet<Address>,
    fail_balance: HashSet<Address>,
    fail_reads: bool,
}

impl MockChain {
    pub fn new(signer: Address) -> Self {
        Self {
            signer,
            created_vault: Address::repeat_byte(0xaa),
            ledger: Mutex::new(Ledger::default()),
            fail_create: false,
            create_leaves_absent: false,
            fail_approve: HashSet::new(),
            fail_deposit: HashSet::new(),
            fail_balance: HashSet::new(),
            fail_reads: false,
        }
    }

    pub fn with_vault(self, pair: IdentityPair, vault: Address) -> Self {
        self.ledger
            .lock()
            .unwrap()
            .vaults
            .insert((pair.leader, pair.follower), vault);
        self
    }

    pub fn with_created_vault(mut self, vault: Address) -> Self {
        self.created_vault = vault;
        self
    }

    pub fn with_balance(self, token: Address, account: Address, amount: u64) -> Self {
        self.ledger
            .lock()
            .unwrap()
            .balances
            .insert((token, account), U256::from(amount));
        self
    }

    pub fn with_accounting(self, capital: u64, high_water_mark: u64) -> Self {
        {
            let mut ledger = self.ledger.lock().unwrap();
            ledger.capital = U256::from(capital);
            ledger.high_water_mark = U256::from(high_water_mark);
        }
        self
    }

    pub fn with_positions(self, positions: Vec<Position>) -> Self {
        self.ledger.lock().unwrap().positions = positions;
        self
    }

    /// Override the count returned by `getActivePositionCount`
    pub fn with_active_count(self, count: u64) -> Self {
        self.ledger.lock().unwrap().active_count = Some(U256::from(count));
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Creation finalises but the factory keeps reporting the zero address
    pub fn create_leaves_vault_absent(mut self) -> Self {
        self.create_leaves_absent = true;
        self
    }

    pub fn failing_approve(mut self, token: Address) -> Self {
        self.fail_approve.insert(token);
        self
    }

    pub fn failing_deposit(mut self, token: Address) -> Self {
        self.fail_deposit.insert(token);
        self
    }

    pub fn failing_balance(mut self, token: Address) -> Self {
        self.fail_balance.insert(token);
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.ledger.lock().unwrap().events.clone()
    }

    pub fn reads(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, MockEvent::Read(n) if *n == name))
            .count()
    }

    pub fn submitted(&self) -> Vec<WriteCall> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::Submitted(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn balance(&self, token: Address, account: Address) -> U256 {
        self.ledger
            .lock()
            .unwrap()
            .balances
            .get(&(token, account))
            .copied()
            .unwrap_or_default()
    }

    fn read(&self, name: &'static str) -> Result<std::sync::MutexGuard<'_, Ledger>> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.events.push(MockEvent::Read(name));
        if self.fail_reads && name != "getVault" && name != "balanceOf" {
            return Err(Error::Rpc(format!("{} unavailable", name)));
        }
        Ok(ledger)
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_vault(&self, _factory: Address, pair: &IdentityPair) -> Result<Address> {
        let ledger = self.read("getVault")?;
        Ok(ledger
            .vaults
            .get(&(pair.leader, pair.follower))
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn balance_of(&self, token: Address, account: Address) -> Result<U256> {
        let ledger = self.read("balanceOf")?;
        if self.fail_balance.contains(&token) {
            return Err(Error::Rpc("balanceOf reverted".into()));
        }
        Ok(ledger
            .balances
            .get(&(token, account))
            .copied()
            .unwrap_or_default())
    }

    async fn deposited_capital(&self, _vault: Address) -> Result<U256> {
        Ok(self.read("depositedCapital")?.capital)
    }

    async fn high_water_mark(&self, _vault: Address) -> Result<U256> {
        Ok(self.read("highWaterMark")?.high_water_mark)
    }

    async fn active_position_count(&self, _vault: Address) -> Result<U256> {
        let ledger = self.read("getActivePositionCount")?;
        Ok(ledger.active_count.unwrap_or_else(|| {
            U256::from(ledger.positions.iter().filter(|p| p.is_active).count())
        }))
    }

    async fn all_positions(&self, _vault: Address) -> Result<Vec<Position>> {
        Ok(self.read("getAllPositions")?.positions.clone())
    }
}

#[async_trait]
impl ChainWriter for MockChain {
    fn signer(&self) -> Address {
        self.signer
    }

    async fn submit(&self, call: WriteCall) -> Result<PendingTx> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.events.push(MockEvent::Submitted(call.clone()));
        ledger.next_tx += 1;
        Ok(PendingTx {
            hash: TxHash::with_last_byte(ledger.next_tx as u8),
            call,
        })
    }

    async fn await_finality(&self, pending: PendingTx) -> Result<Receipt> {
        let mut ledger = self.ledger.lock().unwrap();
        let reverted = || Error::TransactionReverted(pending.hash.to_string());

        match &pending.call {
            WriteCall::CreateVault { leader, .. } => {
                if self.fail_create {
                    return Err(reverted());
                }
                if !self.create_leaves_absent {
                    ledger
                        .vaults
                        .insert((*leader, *leader), self.created_vault);
                }
            }
            WriteCall::Approve {
                token,
                spender,
                amount,
            } => {
                if self.fail_approve.contains(token) {
                    return Err(reverted());
                }
                ledger
                    .allowances
                    .insert((*token, self.signer, *spender), *amount);
            }
            WriteCall::Deposit {
                vault,
                token,
                amount,
            } => {
                if self.fail_deposit.contains(token) {
                    return Err(reverted());
                }
                let key = (*token, self.signer, *vault);
                let allowance = ledger.allowances.get(&key).copied().unwrap_or_default();
                let balance = ledger
                    .balances
                    .get(&(*token, self.signer))
                    .copied()
                    .unwrap_or_default();
                if allowance < *amount || balance < *amount {
                    return Err(reverted());
                }
                ledger.allowances.insert(key, allowance - *amount);
                ledger.balances.insert((*token, self.signer), balance - *amount);
                ledger.capital += *amount;
            }
        }

        ledger.events.push(MockEvent::Finalized(pending.call.clone()));
        Ok(Receipt {
            hash: pending.hash,
            block_number: Some(ledger.next_tx),
            gas_used: 21_000,
        })
    }
}

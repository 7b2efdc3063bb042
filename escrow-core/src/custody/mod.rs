use crate::error::{EscrowError, Result};
use crate::types::{AccountId, AssetRef};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Moves value in and out of escrow custody for a given asset.
///
/// Implementations must apply each call atomically: a `deposit` or `payout`
/// that returns an error must leave all balances untouched.
#[async_trait]
pub trait CustodyAdapter: Send + Sync {
    /// Pull `amount` of `asset` from `payer` into escrow custody.
    async fn deposit(&self, payer: &AccountId, amount: u64, asset: &AssetRef) -> Result<()>;

    /// Push `amount` of `asset` from escrow custody to `recipient`.
    async fn payout(&self, recipient: &AccountId, amount: u64, asset: &AssetRef) -> Result<()>;
}

#[derive(Debug, Default)]
struct Ledger {
    accounts: HashMap<(AccountId, AssetRef), u64>,
    escrow: HashMap<AssetRef, u64>,
}

/// In-process ledger custody: the default adapter for local deployments
/// and the test double for the engine suites.
#[derive(Debug, Default)]
pub struct MemoryCustody {
    ledger: RwLock<Ledger>,
}

/// Serializable balance dump, used to carry ledger state across processes.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: Vec<(AccountId, AssetRef, u64)>,
    pub escrow: Vec<(AssetRef, u64)>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account balance.
    pub fn credit(&self, account: &AccountId, amount: u64, asset: &AssetRef) {
        let mut ledger = self.ledger.write();
        let balance = ledger
            .accounts
            .entry((account.clone(), asset.clone()))
            .or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, account: &AccountId, asset: &AssetRef) -> u64 {
        self.ledger
            .read()
            .accounts
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Total value currently held in custody for `asset`.
    pub fn escrow_balance(&self, asset: &AssetRef) -> u64 {
        self.ledger.read().escrow.get(asset).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let ledger = self.ledger.read();
        LedgerSnapshot {
            accounts: ledger
                .accounts
                .iter()
                .map(|((account, asset), amount)| (account.clone(), asset.clone(), *amount))
                .collect(),
            escrow: ledger
                .escrow
                .iter()
                .map(|(asset, amount)| (asset.clone(), *amount))
                .collect(),
        }
    }

    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        let ledger = Ledger {
            accounts: snapshot
                .accounts
                .into_iter()
                .map(|(account, asset, amount)| ((account, asset), amount))
                .collect(),
            escrow: snapshot.escrow.into_iter().collect(),
        };
        Self {
            ledger: RwLock::new(ledger),
        }
    }
}

#[async_trait]
impl CustodyAdapter for MemoryCustody {
    async fn deposit(&self, payer: &AccountId, amount: u64, asset: &AssetRef) -> Result<()> {
        let mut ledger = self.ledger.write();
        let key = (payer.clone(), asset.clone());
        let balance = ledger.accounts.get(&key).copied().unwrap_or(0);
        if balance < amount {
            return Err(EscrowError::transfer_failed(format!(
                "{} holds {} {}, needs {}",
                payer, balance, asset, amount
            )));
        }
        ledger.accounts.insert(key, balance - amount);
        *ledger.escrow.entry(asset.clone()).or_insert(0) += amount;
        Ok(())
    }

    async fn payout(&self, recipient: &AccountId, amount: u64, asset: &AssetRef) -> Result<()> {
        let mut ledger = self.ledger.write();
        let held = ledger.escrow.get(asset).copied().unwrap_or(0);
        if held < amount {
            return Err(EscrowError::transfer_failed(format!(
                "escrow holds {} {}, cannot pay out {}",
                held, asset, amount
            )));
        }
        ledger.escrow.insert(asset.clone(), held - amount);
        *ledger
            .accounts
            .entry((recipient.clone(), asset.clone()))
            .or_insert(0) += amount;
        Ok(())
    }
}

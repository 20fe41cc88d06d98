// 9.2 custody.rs: the bridge between ledger balances and real token movements.
// the engine stages transfers while it updates its ledgers and hands them over
// in one settle() call at the end of the operation. settlement is all or
// nothing: a shortfall anywhere rejects the whole batch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{AccountId, AssetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transfer {
    // funds pulled from an account into the market vault
    In { asset: AssetId, from: AccountId, amount: u128 },
    // funds paid from the market vault to an account
    Out { asset: AssetId, to: AccountId, amount: u128 },
}

impl Transfer {
    pub fn asset(&self) -> AssetId {
        match self {
            Transfer::In { asset, .. } | Transfer::Out { asset, .. } => *asset,
        }
    }

    pub fn amount(&self) -> u128 {
        match self {
            Transfer::In { amount, .. } | Transfer::Out { amount, .. } => *amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("Account {account} holds {available} of asset {asset:?}, needs {requested}")]
    InsufficientFunds {
        account: AccountId,
        asset: AssetId,
        available: u128,
        requested: u128,
    },

    #[error("Vault holds {available} of asset {asset:?}, needs {requested}")]
    VaultShortfall {
        asset: AssetId,
        available: u128,
        requested: u128,
    },

    #[error("Balance overflow for asset {0:?}")]
    Overflow(AssetId),
}

pub trait Custody {
    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), CustodyError>;
}

// Wallet balances plus the market vault, all in memory. used by the simulator and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustody {
    wallets: HashMap<(AccountId, AssetId), u128>,
    vault: HashMap<AssetId, u128>,
    // running totals for reporting
    total_in: HashMap<AssetId, u128>,
    total_out: HashMap<AssetId, u128>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    // Credit an external wallet (e.g. a bridged deposit landing).
    pub fn mint(&mut self, account: AccountId, asset: AssetId, amount: u128) {
        let balance = self.wallets.entry((account, asset)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: AccountId, asset: AssetId) -> u128 {
        self.wallets.get(&(account, asset)).copied().unwrap_or(0)
    }

    pub fn vault_balance(&self, asset: AssetId) -> u128 {
        self.vault.get(&asset).copied().unwrap_or(0)
    }

    pub fn total_in(&self, asset: AssetId) -> u128 {
        self.total_in.get(&asset).copied().unwrap_or(0)
    }

    pub fn total_out(&self, asset: AssetId) -> u128 {
        self.total_out.get(&asset).copied().unwrap_or(0)
    }

    // Replays the batch against scratch copies of every touched balance so
    // nothing is written unless the whole batch clears.
    fn simulate(
        &self,
        transfers: &[Transfer],
    ) -> Result<(HashMap<(AccountId, AssetId), u128>, HashMap<AssetId, u128>), CustodyError> {
        let mut wallets: HashMap<(AccountId, AssetId), u128> = HashMap::new();
        let mut vault: HashMap<AssetId, u128> = HashMap::new();

        for transfer in transfers {
            match *transfer {
                Transfer::In { asset, from, amount } => {
                    let wallet = wallets
                        .entry((from, asset))
                        .or_insert_with(|| self.balance_of(from, asset));
                    if *wallet < amount {
                        return Err(CustodyError::InsufficientFunds {
                            account: from,
                            asset,
                            available: *wallet,
                            requested: amount,
                        });
                    }
                    *wallet -= amount;

                    let held = vault.entry(asset).or_insert_with(|| self.vault_balance(asset));
                    *held = held.checked_add(amount).ok_or(CustodyError::Overflow(asset))?;
                }
                Transfer::Out { asset, to, amount } => {
                    let held = vault.entry(asset).or_insert_with(|| self.vault_balance(asset));
                    if *held < amount {
                        return Err(CustodyError::VaultShortfall {
                            asset,
                            available: *held,
                            requested: amount,
                        });
                    }
                    *held -= amount;

                    let wallet = wallets
                        .entry((to, asset))
                        .or_insert_with(|| self.balance_of(to, asset));
                    *wallet = wallet.checked_add(amount).ok_or(CustodyError::Overflow(asset))?;
                }
            }
        }

        Ok((wallets, vault))
    }
}

impl Custody for InMemoryCustody {
    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), CustodyError> {
        let (wallets, vault) = self.simulate(transfers)?;

        self.wallets.extend(wallets);
        self.vault.extend(vault);

        for transfer in transfers {
            let totals = match transfer {
                Transfer::In { .. } => &mut self.total_in,
                Transfer::Out { .. } => &mut self.total_out,
            };
            let total = totals.entry(transfer.asset()).or_insert(0);
            *total = total.saturating_add(transfer.amount());
        }

        Ok(())
    }
}

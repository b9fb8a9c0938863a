use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use simpledex_core::{Address, Amount};
use tracing::debug;

use crate::account::Account;
use crate::error::LedgerError;

/// A single token movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

impl Transfer {
    pub fn new(token: Address, from: Address, to: Address, amount: Amount) -> Self {
        Transfer {
            token,
            from,
            to,
            amount,
        }
    }
}

/// Balance and allowance enforcement for fungible tokens
///
/// The engine only ever talks to token balances through this trait.
pub trait Ledger: Send + Sync {
    /// Balance of `token` held by `account`
    fn balance_of(&self, token: &Address, account: &Address) -> Amount;

    /// Amount of `token` that `spender` may move out of `owner`'s balance
    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount;

    /// Apply a batch of transfers on behalf of `spender`, all or nothing
    ///
    /// A transfer whose `from` is not `spender` consumes allowance granted
    /// by `from` to `spender`. Allowance is checked before balance.
    fn execute(&self, spender: &Address, transfers: &[Transfer]) -> Result<(), LedgerError>;

    /// Owner-initiated transfer, no allowance involved
    fn transfer(
        &self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.execute(from, &[Transfer::new(*token, *from, *to, amount)])
    }
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn balance_of(&self, token: &Address, account: &Address) -> Amount {
        (**self).balance_of(token, account)
    }

    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount {
        (**self).allowance(token, owner, spender)
    }

    fn execute(&self, spender: &Address, transfers: &[Transfer]) -> Result<(), LedgerError> {
        (**self).execute(spender, transfers)
    }
}

/// In-memory ledger with ERC-20 style allowances
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: Mutex<BTreeMap<Address, Account>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger::default()
    }

    /// Rebuild a ledger from persisted accounts
    pub fn from_accounts(accounts: BTreeMap<Address, Account>) -> Self {
        MemoryLedger {
            accounts: Mutex::new(accounts),
        }
    }

    // Every mutation leaves the map consistent before returning, so a
    // poisoned guard still holds valid data.
    fn accounts(&self) -> MutexGuard<'_, BTreeMap<Address, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create new tokens in `to`'s balance
    pub fn mint(&self, token: &Address, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        let mut accounts = self.accounts();
        let account = accounts.entry(*to).or_default();
        if !account.credit(token, amount) {
            return Err(LedgerError::Overflow { token: *token });
        }
        debug!("Minted {} of {} to {}", amount, token, to);
        Ok(())
    }

    /// Set the allowance `owner` grants to `spender`, replacing any previous value
    pub fn approve(&self, token: &Address, owner: &Address, spender: &Address, amount: Amount) {
        let mut accounts = self.accounts();
        accounts
            .entry(*owner)
            .or_default()
            .set_allowance(token, spender, amount);
        debug!("{} approved {} of {} for {}", owner, amount, token, spender);
    }

    /// Sum of all balances of `token`
    pub fn total_supply(&self, token: &Address) -> Amount {
        self.accounts()
            .values()
            .fold(Amount::ZERO, |acc, account| {
                acc.saturating_add(account.balance(token))
            })
    }

    /// Copy of every non-empty account
    pub fn snapshot(&self) -> BTreeMap<Address, Account> {
        self.accounts()
            .iter()
            .filter(|(_, account)| !account.is_empty())
            .map(|(address, account)| (*address, account.clone()))
            .collect()
    }
}

impl Ledger for MemoryLedger {
    fn balance_of(&self, token: &Address, account: &Address) -> Amount {
        self.accounts()
            .get(account)
            .map_or(Amount::ZERO, |a| a.balance(token))
    }

    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount {
        self.accounts()
            .get(owner)
            .map_or(Amount::ZERO, |a| a.allowance(token, spender))
    }

    fn execute(&self, spender: &Address, transfers: &[Transfer]) -> Result<(), LedgerError> {
        let mut accounts = self.accounts();

        // Back up every account the batch can touch so a failure part way
        // through restores them exactly.
        let mut backup: BTreeMap<Address, Option<Account>> = BTreeMap::new();
        for transfer in transfers {
            for address in [transfer.from, transfer.to] {
                backup
                    .entry(address)
                    .or_insert_with(|| accounts.get(&address).cloned());
            }
        }

        let result = transfers
            .iter()
            .try_for_each(|transfer| apply_transfer(&mut accounts, spender, transfer));

        if let Err(e) = result {
            for (address, account) in backup {
                match account {
                    Some(account) => {
                        accounts.insert(address, account);
                    }
                    None => {
                        accounts.remove(&address);
                    }
                }
            }
            debug!("Ledger batch of {} transfers rejected: {}", transfers.len(), e);
            return Err(e);
        }

        Ok(())
    }
}

fn apply_transfer(
    accounts: &mut BTreeMap<Address, Account>,
    spender: &Address,
    transfer: &Transfer,
) -> Result<(), LedgerError> {
    let Transfer {
        token,
        from,
        to,
        amount,
    } = *transfer;
    if amount.is_zero() {
        return Ok(());
    }

    let source = accounts.entry(from).or_default();

    if from != *spender {
        let allowance = source.allowance(&token, spender);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                token,
                owner: from,
                spender: *spender,
                allowance,
                need: amount,
            });
        }
        // Max allowance is treated as unlimited and never consumed
        if allowance != Amount::MAX {
            source.set_allowance(&token, spender, allowance - amount);
        }
    }

    let balance = source.balance(&token);
    if balance < amount {
        return Err(LedgerError::InsufficientBalance {
            token,
            account: from,
            have: balance,
            need: amount,
        });
    }
    source.debit(&token, amount);

    if !accounts.entry(to).or_default().credit(&token, amount) {
        return Err(LedgerError::Overflow { token });
    }
    Ok(())
}

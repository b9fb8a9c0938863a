use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use simpledex_core::{Address, Amount};

/// Token holdings and granted allowances of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Account {
    /// Balances per token
    pub balances: BTreeMap<Address, Amount>,
    /// Allowances keyed by (token, spender)
    pub allowances: BTreeMap<(Address, Address), Amount>,
}

impl Account {
    pub fn balance(&self, token: &Address) -> Amount {
        self.balances.get(token).copied().unwrap_or(Amount::ZERO)
    }

    pub fn allowance(&self, token: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*token, *spender))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Credit a balance, returning false on overflow
    pub fn credit(&mut self, token: &Address, amount: Amount) -> bool {
        if amount.is_zero() {
            return true;
        }
        match self.balance(token).checked_add(amount) {
            Some(total) => {
                self.balances.insert(*token, total);
                true
            }
            None => false,
        }
    }

    /// Debit a balance (assumes caller has checked availability)
    pub fn debit(&mut self, token: &Address, amount: Amount) {
        if amount.is_zero() {
            return;
        }
        if let Some(balance) = self.balances.get_mut(token) {
            *balance -= amount;
            if balance.is_zero() {
                self.balances.remove(token);
            }
        }
    }

    pub fn set_allowance(&mut self, token: &Address, spender: &Address, amount: Amount) {
        if amount.is_zero() {
            self.allowances.remove(&(*token, *spender));
        } else {
            self.allowances.insert((*token, *spender), amount);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty() && self.allowances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_debit() {
        let token = Address::derive("TKA");
        let mut account = Account::default();

        assert!(account.credit(&token, Amount::from(1000u64)));
        account.debit(&token, Amount::from(300u64));
        assert_eq!(account.balance(&token), Amount::from(700u64));

        account.debit(&token, Amount::from(700u64));
        assert!(account.balances.is_empty());
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let token = Address::derive("TKA");
        let mut account = Account::default();
        assert!(account.credit(&token, Amount::MAX));
        assert!(!account.credit(&token, Amount::from(1u64)));
        assert_eq!(account.balance(&token), Amount::MAX);
    }

    #[test]
    fn test_allowance_cleared_at_zero() {
        let token = Address::derive("TKA");
        let spender = Address::derive("dex");
        let mut account = Account::default();

        account.set_allowance(&token, &spender, Amount::from(50u64));
        assert_eq!(account.allowance(&token, &spender), Amount::from(50u64));

        account.set_allowance(&token, &spender, Amount::ZERO);
        assert!(account.is_empty());
    }
}

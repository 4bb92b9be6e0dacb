use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::crypto::PublicKey;
use crate::types::address::Address;

/// An account in the ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    /// Learned from the first transaction the account sends
    pub public_key: Option<PublicKey>,
    pub balance: u64,
    /// Delegates this account currently votes for
    pub votes: BTreeSet<PublicKey>,
    /// Co-signers of a multisignature account (empty for plain accounts)
    pub keysgroup: Vec<PublicKey>,
    /// Minimum co-signatures required when `keysgroup` is set
    pub multimin: u8,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Account {
            address,
            public_key: None,
            balance: 0,
            votes: BTreeSet::new(),
            keysgroup: Vec::new(),
            multimin: 0,
        }
    }

    pub fn with_balance(address: Address, balance: u64) -> Self {
        Account {
            balance,
            ..Account::new(address)
        }
    }

    pub fn is_multisignature(&self) -> bool {
        !self.keysgroup.is_empty()
    }

    /// Credit the balance. Returns false (and leaves the balance unchanged)
    /// if the credit would overflow.
    pub fn credit(&mut self, amount: u64) -> bool {
        match self.balance.checked_add(amount) {
            Some(balance) => {
                self.balance = balance;
                true
            }
            None => false,
        }
    }

    /// Debit the balance. Returns false (and leaves the balance unchanged)
    /// if the account cannot cover `amount`.
    pub fn debit(&mut self, amount: u64) -> bool {
        match self.balance.checked_sub(amount) {
            Some(balance) => {
                self.balance = balance;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_new() {
        let account = Account::new(Address(42));
        assert_eq!(account.balance, 0);
        assert!(account.public_key.is_none());
        assert!(!account.is_multisignature());
    }

    #[test]
    fn test_debit_insufficient_balance() {
        let mut account = Account::with_balance(Address(1), 100);
        assert!(!account.debit(101));
        assert_eq!(account.balance, 100);
        assert!(account.debit(100));
        assert_eq!(account.balance, 0);
    }

    #[test]
    fn test_credit_overflow() {
        let mut account = Account::with_balance(Address(1), u64::MAX - 1);
        assert!(!account.credit(2));
        assert_eq!(account.balance, u64::MAX - 1);
        assert!(account.credit(1));
    }
}

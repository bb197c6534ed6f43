//! # Account Ledger
//!
//! Per-`(beneficiary, asset)` withdrawal accounting. Accounts live in a
//! table keyed by a hash of both fields. Operations look accounts up by
//! recomputing the key; only snapshot restore walks the whole table.
//!
//! An account comes into existence on its first intake, together with its
//! custody wallet, and is never deleted. Its deposit address and identity
//! are fixed at that moment. The numeric fields are driven exclusively by
//! [`WithdrawLimitPolicy`](crate::withdraw_limit::WithdrawLimitPolicy).

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use pool_protocol::config::ACCOUNT_KEY_CONTEXT;
use pool_protocol::crypto::domain_separated_hash;
use pool_protocol::types::{Address, AssetTag, Cents};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the ledger and the withdraw limit policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// An account already exists for this key.
    #[error("account already exists: {0}")]
    AccountAlreadyExists(AccountKey),

    /// No account exists for this beneficiary and asset.
    #[error("unknown account: beneficiary {beneficiary}, tag {tag}")]
    UnknownAccount {
        /// Requested beneficiary.
        beneficiary: Address,
        /// Requested asset tag.
        tag: AssetTag,
    },

    /// Intake of zero cents.
    #[error("amount must be positive")]
    ZeroAmount,

    /// The payable amount is zero: either nothing was requested or the
    /// current window's quota is exhausted.
    #[error("nothing to withdraw: requested {requested} cents, {available} available")]
    NothingToWithdraw {
        /// Requested amount.
        requested: Cents,
        /// Quota left in the current window.
        available: Cents,
    },

    /// The asset has fewer decimals than the cent unit.
    #[error("insufficient precision: asset has {decimals} decimals, at least 2 required")]
    InsufficientPrecision {
        /// Registered decimals.
        decimals: u8,
    },

    /// Converting cents to native units overflowed.
    #[error("conversion overflow: {cents} cents at {decimals} decimals")]
    ConversionOverflow {
        /// Amount being converted.
        cents: Cents,
        /// Registered decimals.
        decimals: u8,
    },

    /// A stored account breaks a table invariant. Only raised when loading
    /// state from outside, e.g. a snapshot.
    #[error("corrupt account {key}: {defect}")]
    CorruptAccount {
        /// Key the account was stored under.
        key: AccountKey,
        /// What is wrong with it.
        defect: AccountDefect,
    },
}

/// Invariant violations detected by [`AccountLedger::check_integrity`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AccountDefect {
    /// The table key is not the hash of the account's own fields.
    #[error("stored under a key that does not match its beneficiary and tag")]
    KeyMismatch,
    /// The deposit address is the zero address.
    #[error("zero deposit address")]
    ZeroDepositAddress,
    /// The limit exceeds the global cap.
    #[error("withdraw limit above the cap")]
    LimitAboveCap,
    /// The quota exceeds the limit.
    #[error("available quota above the withdraw limit")]
    AvailableAboveLimit,
}

// ---------------------------------------------------------------------------
// AccountKey
// ---------------------------------------------------------------------------

/// Table key: `BLAKE3-derive_key(context, beneficiary || tag)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AccountKey([u8; 32]);

impl AccountKey {
    /// Recomputes the key for `(beneficiary, tag)`.
    pub fn derive(beneficiary: &Address, tag: AssetTag) -> Self {
        Self(domain_separated_hash(
            ACCOUNT_KEY_CONTEXT,
            &[beneficiary.as_bytes(), &[tag]],
        ))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKey({self})")
    }
}

impl From<AccountKey> for String {
    fn from(key: AccountKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for AccountKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let bytes = hex::decode(&s).map_err(|e| format!("invalid account key: {e}"))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| format!("invalid account key length: {s}"))?;
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// One beneficiary's standing for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account owner and withdrawal recipient.
    pub beneficiary: Address,
    /// Asset tag.
    pub tag: AssetTag,
    /// Custody wallet address; fixed at creation.
    pub deposit_address: Address,
    /// Running trust balance that feeds limit growth. Frozen once the
    /// limit reaches the global cap.
    pub cumulative_balance_cents: Cents,
    /// Size of one full quota window. Never decreases, never exceeds the cap.
    pub withdraw_limit_cents: Cents,
    /// Quota left in the current window.
    pub available_cents: Cents,
    /// Start of the current quota window.
    pub window_started_at: DateTime<Utc>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Table key of this account.
    pub fn key(&self) -> AccountKey {
        AccountKey::derive(&self.beneficiary, self.tag)
    }
}

// ---------------------------------------------------------------------------
// AccountLedger
// ---------------------------------------------------------------------------

/// The account table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountLedger {
    accounts: HashMap<AccountKey, Account>,
}

impl AccountLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `(beneficiary, tag)`.
    pub fn get(&self, beneficiary: &Address, tag: AssetTag) -> Option<&Account> {
        self.accounts.get(&AccountKey::derive(beneficiary, tag))
    }

    /// Looks up a precomputed key.
    pub fn get_by_key(&self, key: &AccountKey) -> Option<&Account> {
        self.accounts.get(key)
    }

    /// Looks up `(beneficiary, tag)` or fails with
    /// [`LedgerError::UnknownAccount`].
    pub fn require(&self, beneficiary: &Address, tag: AssetTag) -> Result<&Account, LedgerError> {
        self.get(beneficiary, tag).ok_or(LedgerError::UnknownAccount {
            beneficiary: *beneficiary,
            tag,
        })
    }

    /// `true` if an account exists for the key.
    pub fn contains(&self, key: &AccountKey) -> bool {
        self.accounts.contains_key(key)
    }

    /// Builds a fresh, empty account without inserting it. The first quota
    /// window starts at `now` with nothing available.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccountAlreadyExists`] if the key is taken.
    pub fn prepare_new(
        &self,
        beneficiary: Address,
        tag: AssetTag,
        deposit_address: Address,
        now: DateTime<Utc>,
    ) -> Result<Account, LedgerError> {
        let key = AccountKey::derive(&beneficiary, tag);
        if self.contains(&key) {
            return Err(LedgerError::AccountAlreadyExists(key));
        }
        Ok(Account {
            beneficiary,
            tag,
            deposit_address,
            cumulative_balance_cents: 0,
            withdraw_limit_cents: 0,
            available_cents: 0,
            window_started_at: now,
            created_at: now,
        })
    }

    /// Creates and inserts a fresh account.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccountAlreadyExists`] if the key is taken.
    pub fn create(
        &mut self,
        beneficiary: Address,
        tag: AssetTag,
        deposit_address: Address,
        now: DateTime<Utc>,
    ) -> Result<&Account, LedgerError> {
        let account = self.prepare_new(beneficiary, tag, deposit_address, now)?;
        let key = account.key();
        Ok(self.accounts.entry(key).or_insert(account))
    }

    /// Writes back a staged account. Identity and deposit address of an
    /// existing entry are kept; only the accounting fields move.
    pub(crate) fn store(&mut self, account: Account) {
        let key = account.key();
        match self.accounts.get_mut(&key) {
            Some(existing) => {
                existing.cumulative_balance_cents = account.cumulative_balance_cents;
                existing.withdraw_limit_cents = account.withdraw_limit_cents;
                existing.available_cents = account.available_cents;
                existing.window_started_at = account.window_started_at;
            }
            None => {
                self.accounts.insert(key, account);
            }
        }
    }

    /// Verifies every stored account against the table invariants:
    /// key matches `(beneficiary, tag)`, non-zero deposit address, and
    /// `available <= limit <= cap`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::CorruptAccount`] for the first offending account.
    pub fn check_integrity(&self, cap: Cents) -> Result<(), LedgerError> {
        for (key, account) in &self.accounts {
            let defect = if account.key() != *key {
                Some(AccountDefect::KeyMismatch)
            } else if account.deposit_address.is_zero() {
                Some(AccountDefect::ZeroDepositAddress)
            } else if account.withdraw_limit_cents > cap {
                Some(AccountDefect::LimitAboveCap)
            } else if account.available_cents > account.withdraw_limit_cents {
                Some(AccountDefect::AvailableAboveLimit)
            } else {
                None
            };
            if let Some(defect) = defect {
                return Err(LedgerError::CorruptAccount { key: *key, defect });
            }
        }
        Ok(())
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// `true` if no account exists.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Iterates all accounts in unspecified order. Meant for snapshots and
    /// audits, not for pool logic.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}

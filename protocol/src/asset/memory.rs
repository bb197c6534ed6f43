//! In-memory fungible asset ledger.
//!
//! Per-asset balances and allowances in plain maps. Good enough to drive the
//! pool in tests and simulations; a production deployment plugs in a client
//! for the real asset contracts instead.

use std::collections::HashMap;

use super::{AssetCapability, AssetError};
use crate::types::{Address, AssetHandle, NativeAmount};

#[derive(Debug, Clone, Default)]
struct Ledger {
    balances: HashMap<Address, NativeAmount>,
    allowances: HashMap<(Address, Address), NativeAmount>,
}

/// A set of fungible assets keyed by handle.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssets {
    ledgers: HashMap<AssetHandle, Ledger>,
}

impl InMemoryAssets {
    /// Creates an empty ledger set with no assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys an asset contract at `handle`. Idempotent.
    pub fn deploy(&mut self, handle: AssetHandle) {
        self.ledgers.entry(handle).or_default();
    }

    /// Creates `amount` of `asset` out of thin air for `to`.
    pub fn mint(
        &mut self,
        asset: AssetHandle,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        let ledger = self.ledger_mut(asset)?;
        let balance = ledger.balances.entry(to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(AssetError::Overflow(to))?;
        Ok(())
    }

    /// Balance of `holder`, or 0.
    pub fn balance_of(&self, asset: AssetHandle, holder: Address) -> NativeAmount {
        self.ledgers
            .get(&asset)
            .and_then(|l| l.balances.get(&holder))
            .copied()
            .unwrap_or(0)
    }

    /// Allowance `owner` granted to `spender`, or 0.
    pub fn allowance(&self, asset: AssetHandle, owner: Address, spender: Address) -> NativeAmount {
        self.ledgers
            .get(&asset)
            .and_then(|l| l.allowances.get(&(owner, spender)))
            .copied()
            .unwrap_or(0)
    }

    fn ledger_mut(&mut self, asset: AssetHandle) -> Result<&mut Ledger, AssetError> {
        self.ledgers
            .get_mut(&asset)
            .ok_or(AssetError::UnknownAsset(asset))
    }

    fn move_balance(
        ledger: &mut Ledger,
        from: Address,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        let from_balance = ledger.balances.get(&from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(AssetError::InsufficientBalance {
                holder: from,
                balance: from_balance,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = ledger.balances.get(&to).copied().unwrap_or(0);
        let credited = to_balance
            .checked_add(amount)
            .ok_or(AssetError::Overflow(to))?;

        ledger.balances.insert(from, from_balance - amount);
        ledger.balances.insert(to, credited);
        Ok(())
    }
}

impl AssetCapability for InMemoryAssets {
    fn approve(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        spender: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        let ledger = self.ledger_mut(asset)?;
        if amount == 0 {
            ledger.allowances.remove(&(caller, spender));
        } else {
            ledger.allowances.insert((caller, spender), amount);
        }
        Ok(())
    }

    fn transfer(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        let ledger = self.ledger_mut(asset)?;
        Self::move_balance(ledger, caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        from: Address,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        let ledger = self.ledger_mut(asset)?;
        let allowance = ledger
            .allowances
            .get(&(from, caller))
            .copied()
            .unwrap_or(0);
        if allowance < amount {
            return Err(AssetError::InsufficientAllowance {
                owner: from,
                spender: caller,
                allowance,
                requested: amount,
            });
        }

        Self::move_balance(ledger, from, to, amount)?;

        if allowance != NativeAmount::MAX {
            ledger.allowances.insert((from, caller), allowance - amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Address = Address::repeat_byte(0xaa);
    const ALICE: Address = Address::repeat_byte(0x01);
    const BOB: Address = Address::repeat_byte(0x02);
    const CAROL: Address = Address::repeat_byte(0x03);

    fn funded() -> InMemoryAssets {
        let mut assets = InMemoryAssets::new();
        assets.deploy(TOKEN);
        assets.mint(TOKEN, ALICE, 1_000).unwrap();
        assets
    }

    #[test]
    fn transfer_moves_balance() {
        let mut assets = funded();
        assets.transfer(ALICE, TOKEN, BOB, 400).unwrap();
        assert_eq!(assets.balance_of(TOKEN, ALICE), 600);
        assert_eq!(assets.balance_of(TOKEN, BOB), 400);
    }

    #[test]
    fn transfer_more_than_balance_rejected() {
        let mut assets = funded();
        let err = assets.transfer(ALICE, TOKEN, BOB, 1_001).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientBalance { balance: 1_000, .. }));
        assert_eq!(assets.balance_of(TOKEN, ALICE), 1_000);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut assets = funded();
        assets.approve(ALICE, TOKEN, BOB, 300).unwrap();
        assets.transfer_from(BOB, TOKEN, ALICE, CAROL, 200).unwrap();
        assert_eq!(assets.allowance(TOKEN, ALICE, BOB), 100);
        assert_eq!(assets.balance_of(TOKEN, CAROL), 200);

        let err = assets.transfer_from(BOB, TOKEN, ALICE, CAROL, 101).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { allowance: 100, .. }));
    }

    #[test]
    fn unlimited_allowance_is_not_decremented() {
        let mut assets = funded();
        assets.approve(ALICE, TOKEN, BOB, NativeAmount::MAX).unwrap();
        assets.transfer_from(BOB, TOKEN, ALICE, CAROL, 500).unwrap();
        assert_eq!(assets.allowance(TOKEN, ALICE, BOB), NativeAmount::MAX);
    }

    #[test]
    fn unknown_asset_rejected() {
        let mut assets = InMemoryAssets::new();
        let err = assets.transfer(ALICE, TOKEN, BOB, 1).unwrap_err();
        assert_eq!(err, AssetError::UnknownAsset(TOKEN));
    }

    #[test]
    fn approve_zero_revokes() {
        let mut assets = funded();
        assets.approve(ALICE, TOKEN, BOB, 50).unwrap();
        assets.approve(ALICE, TOKEN, BOB, 0).unwrap();
        assert_eq!(assets.allowance(TOKEN, ALICE, BOB), 0);
    }
}

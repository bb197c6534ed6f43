//! # Unit of Work
//!
//! Pool operations must be all-or-nothing: a failed intake or withdrawal
//! may not leave a half-instantiated wallet, a pulled deposit without
//! bookkeeping, or a stray event behind.
//!
//! A [`UnitOfWork`] wraps the asset capability for the duration of one
//! operation. Account writes and events are staged and only handed to the
//! pool by [`commit`](UnitOfWork::commit). Asset calls execute immediately
//! (their failure is what we need to detect) and are journaled with a
//! compensating call. Dropping an uncommitted unit replays the journal in
//! reverse, which returns the asset ledger to where it was.
//!
//! Compensations:
//!
//! | executed call                     | compensation                      |
//! |-----------------------------------|-----------------------------------|
//! | `approve(owner → spender)`        | `approve(owner → spender, 0)`     |
//! | `transfer(from → to, n)`          | `transfer(to → from, n)`          |
//! | `transfer_from(from → to, n)`     | `transfer(to → from, n)`          |
//!
//! Approvals are only ever issued by freshly instantiated custody wallets,
//! whose prior allowance is zero, so revoking restores the prior state.

use pool_protocol::asset::{AssetCapability, AssetError};
use pool_protocol::types::{Address, AssetHandle, NativeAmount};
use tracing::{debug, error};

use crate::account_ledger::Account;
use crate::events::EventKind;

#[derive(Debug, Clone, Copy)]
enum Compensation {
    RevokeApproval {
        owner: Address,
        asset: AssetHandle,
        spender: Address,
    },
    ReturnFunds {
        holder: Address,
        asset: AssetHandle,
        to: Address,
        amount: NativeAmount,
    },
}

/// Everything a committed unit of work hands back to the pool.
#[derive(Debug, Default)]
pub struct Changeset {
    /// Account records to write, in staging order.
    pub accounts: Vec<Account>,
    /// Events to append, in emission order.
    pub events: Vec<EventKind>,
}

/// One operation's staged effects over a borrowed asset capability.
pub struct UnitOfWork<'a, A: AssetCapability + ?Sized> {
    assets: &'a mut A,
    journal: Vec<Compensation>,
    staged: Changeset,
    committed: bool,
}

impl<'a, A: AssetCapability + ?Sized> UnitOfWork<'a, A> {
    /// Opens a unit of work over `assets`.
    pub fn begin(assets: &'a mut A) -> Self {
        Self {
            assets,
            journal: Vec::new(),
            staged: Changeset::default(),
            committed: false,
        }
    }

    /// Stages an account write.
    pub fn stage_account(&mut self, account: Account) {
        self.staged.accounts.push(account);
    }

    /// Stages an event.
    pub fn emit(&mut self, event: EventKind) {
        self.staged.events.push(event);
    }

    /// Number of asset calls executed so far.
    pub fn executed_calls(&self) -> usize {
        self.journal.len()
    }

    /// Seals the unit: asset effects become permanent and the staged
    /// changes are returned for the pool to apply.
    pub fn commit(mut self) -> Changeset {
        self.committed = true;
        self.journal.clear();
        std::mem::take(&mut self.staged)
    }

    fn rollback(&mut self) {
        while let Some(step) = self.journal.pop() {
            let result = match step {
                Compensation::RevokeApproval {
                    owner,
                    asset,
                    spender,
                } => self.assets.approve(owner, asset, spender, 0),
                Compensation::ReturnFunds {
                    holder,
                    asset,
                    to,
                    amount,
                } => self.assets.transfer(holder, asset, to, amount),
            };
            match result {
                Ok(()) => debug!(?step, "compensated asset call"),
                Err(e) => error!(?step, error = %e, "compensating asset call failed"),
            }
        }
    }
}

impl<A: AssetCapability + ?Sized> Drop for UnitOfWork<'_, A> {
    fn drop(&mut self) {
        if !self.committed && !self.journal.is_empty() {
            debug!(calls = self.journal.len(), "rolling back unit of work");
            self.rollback();
        }
    }
}

impl<A: AssetCapability + ?Sized> AssetCapability for UnitOfWork<'_, A> {
    fn approve(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        spender: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        self.assets.approve(caller, asset, spender, amount)?;
        self.journal.push(Compensation::RevokeApproval {
            owner: caller,
            asset,
            spender,
        });
        Ok(())
    }

    fn transfer(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        self.assets.transfer(caller, asset, to, amount)?;
        self.journal.push(Compensation::ReturnFunds {
            holder: to,
            asset,
            to: caller,
            amount,
        });
        Ok(())
    }

    fn transfer_from(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        from: Address,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        self.assets.transfer_from(caller, asset, from, to, amount)?;
        self.journal.push(Compensation::ReturnFunds {
            holder: to,
            asset,
            to: from,
            amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pool_protocol::asset::InMemoryAssets;

    const TOKEN: Address = Address::repeat_byte(0xaa);
    const WALLET: Address = Address::repeat_byte(0x10);
    const CONTROLLER: Address = Address::repeat_byte(0xc0);
    const TREASURY: Address = Address::repeat_byte(0x7e);

    fn assets() -> InMemoryAssets {
        let mut assets = InMemoryAssets::new();
        assets.deploy(TOKEN);
        assets.mint(TOKEN, WALLET, 500).unwrap();
        assets
    }

    #[test]
    fn committed_calls_stick() {
        let mut assets = assets();
        {
            let mut uow = UnitOfWork::begin(&mut assets);
            uow.approve(WALLET, TOKEN, CONTROLLER, NativeAmount::MAX).unwrap();
            uow.transfer_from(CONTROLLER, TOKEN, WALLET, TREASURY, 300).unwrap();
            uow.emit(EventKind::PoolLocked { by: CONTROLLER });
            let changeset = uow.commit();
            assert_eq!(changeset.events.len(), 1);
        }
        assert_eq!(assets.balance_of(TOKEN, TREASURY), 300);
        assert_eq!(assets.allowance(TOKEN, WALLET, CONTROLLER), NativeAmount::MAX);
    }

    #[test]
    fn dropped_unit_reverts_executed_calls() {
        let mut assets = assets();
        {
            let mut uow = UnitOfWork::begin(&mut assets);
            uow.approve(WALLET, TOKEN, CONTROLLER, NativeAmount::MAX).unwrap();
            uow.transfer_from(CONTROLLER, TOKEN, WALLET, TREASURY, 300).unwrap();
            // A later call fails; the operation bails out without commit.
            assert!(uow
                .transfer_from(CONTROLLER, TOKEN, WALLET, TREASURY, 1_000)
                .is_err());
            assert_eq!(uow.executed_calls(), 2);
        }
        assert_eq!(assets.balance_of(TOKEN, WALLET), 500);
        assert_eq!(assets.balance_of(TOKEN, TREASURY), 0);
        assert_eq!(assets.allowance(TOKEN, WALLET, CONTROLLER), 0);
    }

    #[test]
    fn failed_call_is_not_journaled() {
        let mut assets = assets();
        let mut uow = UnitOfWork::begin(&mut assets);
        assert!(uow.transfer(WALLET, TOKEN, TREASURY, 10_000).is_err());
        assert_eq!(uow.executed_calls(), 0);
    }
}

//! # Treasury
//!
//! Single custodial holder of all pooled assets. Dumb custody: it never
//! reasons about cents, accounts or windows. Its one operation forwards a
//! transfer, and only its designated controller may call it. All policy
//! lives in the pool above it.

use pool_protocol::asset::{AssetCapability, AssetError};
use pool_protocol::types::{Address, AssetHandle, NativeAmount};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during a payout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreasuryError {
    /// The caller is not the designated controller.
    #[error("unauthorized: {0} is not the treasury controller")]
    NotController(Address),

    /// The asset ledger rejected the transfer.
    #[error("payout failed: {0}")]
    Asset(#[from] AssetError),
}

/// The pooled custody account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    address: Address,
    controller: Address,
}

impl Treasury {
    /// A treasury at `address` that only `controller` may drive.
    pub fn new(address: Address, controller: Address) -> Self {
        Self {
            address,
            controller,
        }
    }

    /// Where pooled funds are held.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The only identity allowed to pay out.
    pub fn controller(&self) -> Address {
        self.controller
    }

    /// Transfers `amount` of `asset` from the treasury to `to`.
    ///
    /// # Errors
    ///
    /// [`TreasuryError::NotController`] for any caller but the controller;
    /// asset ledger failures (e.g. insufficient treasury balance) as
    /// [`TreasuryError::Asset`].
    pub fn pay_out<A: AssetCapability + ?Sized>(
        &self,
        caller: &Address,
        assets: &mut A,
        asset: AssetHandle,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), TreasuryError> {
        if *caller != self.controller {
            return Err(TreasuryError::NotController(*caller));
        }
        assets.transfer(self.address, asset, to, amount)?;
        Ok(())
    }
}

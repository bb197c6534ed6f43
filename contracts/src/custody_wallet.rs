//! # Custody Wallet
//!
//! A per-`(beneficiary, asset)` wallet living at the derived deposit
//! address. Its only behavior is granting the controller unlimited pull
//! authority over one asset, once, at instantiation. After that the
//! controller moves funds out with `transfer_from` and the wallet itself
//! never acts again.

use pool_protocol::asset::{AssetCapability, AssetError};
use pool_protocol::types::{Address, AssetHandle, NativeAmount};

/// An instantiated custody wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustodyWallet {
    address: Address,
    asset: AssetHandle,
    controller: Address,
}

impl CustodyWallet {
    /// Instantiates the wallet at `address`: the wallet approves
    /// `controller` for `NativeAmount::MAX` of `asset`.
    ///
    /// # Errors
    ///
    /// Propagates the asset ledger's rejection of the approval.
    pub fn instantiate<A: AssetCapability + ?Sized>(
        assets: &mut A,
        address: Address,
        asset: AssetHandle,
        controller: Address,
    ) -> Result<Self, AssetError> {
        assets.approve(address, asset, controller, NativeAmount::MAX)?;
        Ok(Self {
            address,
            asset,
            controller,
        })
    }

    /// Where the wallet lives.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The single asset the wallet holds.
    pub fn asset(&self) -> AssetHandle {
        self.asset
    }

    /// The controller holding pull authority.
    pub fn controller(&self) -> Address {
        self.controller
    }
}

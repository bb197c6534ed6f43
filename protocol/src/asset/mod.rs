//! # Fungible Asset Capability
//!
//! The pool never stores balances itself. It reaches the external asset
//! ledger through exactly three calls, the ones every fungible-token
//! contract exposes:
//!
//! - `approve(spender, amount)`
//! - `transfer(to, amount)`
//! - `transfer_from(from, to, amount)`
//!
//! On a real ledger the calling identity is implicit (the message sender).
//! Here it is the first argument of every method, so one capability object
//! can serve the treasury, the custody wallets and the controller alike.
//!
//! [`InMemoryAssets`] is a reference ledger that honors the same semantics.

mod memory;

pub use memory::InMemoryAssets;

use thiserror::Error;

use crate::types::{Address, AssetHandle, NativeAmount};

/// Failures reported by the asset ledger. The pool propagates these
/// unchanged; it never retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    /// The handle does not name an asset the ledger knows.
    #[error("unknown asset contract {0}")]
    UnknownAsset(AssetHandle),

    /// The source account holds less than the transfer amount.
    #[error("insufficient balance: {holder} has {balance}, needs {requested}")]
    InsufficientBalance {
        /// Account being debited.
        holder: Address,
        /// Its current balance.
        balance: NativeAmount,
        /// Amount requested.
        requested: NativeAmount,
    },

    /// The spender's allowance over the source account is too small.
    #[error("insufficient allowance: {spender} may move {allowance} from {owner}, needs {requested}")]
    InsufficientAllowance {
        /// Account whose funds are being pulled.
        owner: Address,
        /// Account doing the pulling.
        spender: Address,
        /// Current allowance.
        allowance: NativeAmount,
        /// Amount requested.
        requested: NativeAmount,
    },

    /// Crediting the recipient would overflow.
    #[error("balance overflow crediting {0}")]
    Overflow(Address),
}

/// The three-method fungible-asset capability the pool depends on.
pub trait AssetCapability {
    /// `caller` lets `spender` move up to `amount` of its `asset` balance.
    /// Replaces any previous allowance.
    fn approve(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        spender: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError>;

    /// Moves `amount` of `asset` from `caller` to `to`.
    fn transfer(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError>;

    /// `caller` moves `amount` of `asset` from `from` to `to`, consuming
    /// allowance granted by `from`. A `NativeAmount::MAX` allowance is
    /// treated as unlimited and never decremented.
    fn transfer_from(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        from: Address,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError>;
}

impl<T: AssetCapability + ?Sized> AssetCapability for &mut T {
    fn approve(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        spender: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        (**self).approve(caller, asset, spender, amount)
    }

    fn transfer(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        (**self).transfer(caller, asset, to, amount)
    }

    fn transfer_from(
        &mut self,
        caller: Address,
        asset: AssetHandle,
        from: Address,
        to: Address,
        amount: NativeAmount,
    ) -> Result<(), AssetError> {
        (**self).transfer_from(caller, asset, from, to, amount)
    }
}

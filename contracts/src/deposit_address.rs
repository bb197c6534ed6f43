//! # Deposit Address Derivation
//!
//! Every `(beneficiary, asset tag)` pair owns a custody wallet whose address
//! is known before the wallet exists. Users can fund the address first; the
//! wallet is instantiated at exactly that address on the first intake.
//!
//! The derivation follows the content-addressed deployment scheme:
//!
//! ```text
//! salt          = SHA-256(beneficiary || tag)
//! template_hash = SHA-256(CUSTODY_WALLET_TEMPLATE || asset_handle)
//! address       = SHA-256(0xff || controller || salt || template_hash)[12..]
//! ```
//!
//! Binding the asset handle into the template hash means an unregistered tag
//! (zero handle) still derives a well-defined address, just one no wallet
//! will ever be instantiated at.

use pool_protocol::config::{CREATE2_PREFIX, CUSTODY_WALLET_TEMPLATE};
use pool_protocol::crypto::sha256_multi;
use pool_protocol::types::{Address, AssetHandle, AssetTag};

/// Pure deposit address derivation for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositAddressDeriver {
    controller: Address,
}

impl DepositAddressDeriver {
    /// A deriver for wallets instantiated by `controller`.
    pub fn new(controller: Address) -> Self {
        Self { controller }
    }

    /// The controller baked into every derived address.
    pub fn controller(&self) -> Address {
        self.controller
    }

    /// Per-account salt.
    pub fn salt(beneficiary: &Address, tag: AssetTag) -> [u8; 32] {
        sha256_multi(&[beneficiary.as_bytes(), &[tag]])
    }

    /// Hash of the custody wallet template specialized to one asset.
    pub fn template_hash(handle: &AssetHandle) -> [u8; 32] {
        sha256_multi(&[CUSTODY_WALLET_TEMPLATE, handle.as_bytes()])
    }

    /// Deposit address of `(beneficiary, tag)` given the tag's handle.
    pub fn derive(&self, beneficiary: &Address, tag: AssetTag, handle: &AssetHandle) -> Address {
        let salt = Self::salt(beneficiary, tag);
        let template_hash = Self::template_hash(handle);
        let digest = sha256_multi(&[
            &[CREATE2_PREFIX],
            self.controller.as_bytes(),
            &salt,
            &template_hash,
        ]);
        Address::from_digest(&digest)
    }
}

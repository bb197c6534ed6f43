//! # Token Registry
//!
//! Operator-curated mapping from a small integer tag to an asset handle and
//! its decimal precision. Entries are append-only: once a tag carries
//! non-zero decimals it can never be re-pointed at a different contract, so
//! an operator cannot silently redirect an asset that accounts already hold.
//!
//! Authorization is the pool's job; the registry only enforces write-once.

use std::collections::BTreeMap;

use pool_protocol::types::{Address, AssetHandle, AssetTag};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The tag is already bound.
    #[error("duplicate asset: tag {0} is already registered")]
    DuplicateAsset(AssetTag),

    /// The tag has never been registered.
    #[error("unknown asset: tag {0} is not registered")]
    UnknownAsset(AssetTag),

    /// Zero decimals would leave the entry indistinguishable from an empty
    /// slot, and re-registrable.
    #[error("invalid decimals for tag {0}: must be non-zero")]
    ZeroDecimals(AssetTag),

    /// The zero handle is what unregistered tags resolve to.
    #[error("invalid handle for tag {0}: must not be the zero address")]
    ZeroHandle(AssetTag),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A registered fungible asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// The asset contract.
    pub handle: AssetHandle,
    /// Decimal places of the asset's native unit.
    pub decimals: u8,
}

/// Write-once table of assets keyed by tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRegistry {
    assets: BTreeMap<AssetTag, Asset>,
}

impl TokenRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `tag` to `(handle, decimals)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateAsset`] if the tag is taken,
    /// [`RegistryError::ZeroDecimals`] or [`RegistryError::ZeroHandle`] for
    /// entries that would be indistinguishable from an empty slot.
    pub fn register(
        &mut self,
        tag: AssetTag,
        handle: AssetHandle,
        decimals: u8,
    ) -> Result<Asset, RegistryError> {
        if self.is_registered(tag) {
            return Err(RegistryError::DuplicateAsset(tag));
        }
        if decimals == 0 {
            return Err(RegistryError::ZeroDecimals(tag));
        }
        if handle.is_zero() {
            return Err(RegistryError::ZeroHandle(tag));
        }

        let asset = Asset { handle, decimals };
        self.assets.insert(tag, asset);
        Ok(asset)
    }

    /// Returns the asset for `tag`, or `None`.
    pub fn get(&self, tag: AssetTag) -> Option<&Asset> {
        self.assets.get(&tag).filter(|a| a.decimals != 0)
    }

    /// Returns the asset for `tag` or [`RegistryError::UnknownAsset`].
    pub fn require(&self, tag: AssetTag) -> Result<&Asset, RegistryError> {
        self.get(tag).ok_or(RegistryError::UnknownAsset(tag))
    }

    /// `true` once `tag` carries non-zero decimals.
    pub fn is_registered(&self, tag: AssetTag) -> bool {
        self.get(tag).is_some()
    }

    /// Handle for `tag`, or the zero address for unregistered tags.
    pub fn handle_of(&self, tag: AssetTag) -> AssetHandle {
        self.get(tag).map(|a| a.handle).unwrap_or(Address::ZERO)
    }

    /// Iterates registered assets in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetTag, &Asset)> {
        self.assets.iter().map(|(tag, asset)| (*tag, asset))
    }

    /// Number of registered assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: Address = Address::repeat_byte(0xa1);
    const BRLA: Address = Address::repeat_byte(0xb2);

    #[test]
    fn register_and_lookup() {
        let mut registry = TokenRegistry::new();
        let asset = registry.register(1, USDC, 6).unwrap();
        assert_eq!(asset.decimals, 6);
        assert_eq!(registry.require(1).unwrap().handle, USDC);
        assert_eq!(registry.handle_of(1), USDC);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_tag_rejected_and_entry_unchanged() {
        let mut registry = TokenRegistry::new();
        registry.register(1, USDC, 6).unwrap();
        let err = registry.register(1, BRLA, 18).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAsset(1));
        assert_eq!(registry.require(1).unwrap().handle, USDC);
        assert_eq!(registry.require(1).unwrap().decimals, 6);
    }

    #[test]
    fn zero_decimals_or_handle_rejected() {
        let mut registry = TokenRegistry::new();
        assert_eq!(
            registry.register(2, USDC, 0),
            Err(RegistryError::ZeroDecimals(2))
        );
        assert_eq!(
            registry.register(2, Address::ZERO, 6),
            Err(RegistryError::ZeroHandle(2))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn unregistered_tag_resolves_to_zero_handle() {
        let registry = TokenRegistry::new();
        assert_eq!(registry.handle_of(7), Address::ZERO);
        assert_eq!(registry.require(7), Err(RegistryError::UnknownAsset(7)));
    }

    #[test]
    fn iter_is_tag_ordered() {
        let mut registry = TokenRegistry::new();
        registry.register(5, BRLA, 18).unwrap();
        registry.register(1, USDC, 6).unwrap();
        let tags: Vec<_> = registry.iter().map(|(t, _)| t).collect();
        assert_eq!(tags, vec![1, 5]);
    }
}

//! # Pool Identities and Amounts
//!
//! Every party the pool talks to is identified by a 20-byte [`Address`]:
//! beneficiaries, the operator, the controller itself, the treasury, the
//! per-account custody wallets, and the fungible-asset contracts. Amounts
//! come in two flavors that must never be mixed up:
//!
//! - [`Cents`]: fiat-cent denominated accounting units. Limits, quotas
//!   and trust balances are all tracked in cents.
//! - [`NativeAmount`]: the asset's own smallest unit. Only the asset
//!   capability and the treasury ever see these.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of an [`Address`] in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Fiat-cent accounting unit.
pub type Cents = u64;

/// Amount in an asset's native (smallest) unit. `u128` because an 18-decimal
/// asset shifts cents by 10^16, which overflows `u64` quickly.
pub type NativeAmount = u128;

/// Small integer tag identifying a registered fungible asset.
pub type AssetTag = u8;

/// Errors produced when parsing textual identities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded bytes had the wrong length.
    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identity.
///
/// The all-zero address is the "unset" marker: an account whose deposit
/// address is zero has never been funded, and an unregistered asset tag
/// resolves to the zero handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Takes the trailing 20 bytes of a 32-byte digest, the same way
    /// content-addressed contract addresses are cut out of a hash.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[32 - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Builds a readable test/fixture address by repeating a single byte.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; ADDRESS_LENGTH])
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Returns `true` for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Lower-case hex with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(TypeError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_hex()
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

/// The address of a fungible-asset contract.
pub type AssetHandle = Address;

// ---------------------------------------------------------------------------
// SettlementRef
// ---------------------------------------------------------------------------

/// Opaque identifier correlating an on-chain withdrawal with the off-chain
/// payment it fulfills. The pool never interprets it, only echoes it in the
/// withdrawal event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementRef(String);

impl SettlementRef {
    /// Wraps an off-chain reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SettlementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SettlementRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Pool Protocol: Shared Primitives
//!
//! Everything the pool controller needs that is not pool policy:
//!
//! - **types**: 20-byte addresses, cents vs. native amounts, settlement refs.
//! - **crypto**: SHA-256 for deposit address derivation, BLAKE3 for keys.
//! - **config**: frozen derivation constants and the runtime [`PoolConfig`].
//! - **clock**: injected time, so window and handshake expiry are testable.
//! - **asset**: the three-method fungible asset capability and an
//!   in-memory reference ledger.
//! - **logging**: `tracing-subscriber` initialization for embedders.
//!
//! [`PoolConfig`]: config::PoolConfig

pub mod asset;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod logging;
pub mod types;

pub use asset::{AssetCapability, AssetError, InMemoryAssets};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, PoolConfig};
pub use types::{Address, AssetHandle, AssetTag, Cents, NativeAmount, SettlementRef};

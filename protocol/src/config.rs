//! # Pool Configuration & Constants
//!
//! Every magic number the pool depends on lives here, next to the runtime
//! [`PoolConfig`] that fixes the three immutable pool parameters (quota
//! window, per-window cap, treasury) at initialization.
//!
//! The constants below shape derived addresses and table keys. Changing any
//! of them after deployment moves every deposit address, so treat them as
//! frozen.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Address, Cents};

// ---------------------------------------------------------------------------
// Derivation Parameters
// ---------------------------------------------------------------------------

/// Leading byte of the content-addressed deposit address preimage.
pub const CREATE2_PREFIX: u8 = 0xff;

/// Fixed instantiation template of the custody wallet. Its hash, together
/// with the asset handle, pins the code every deposit address commits to.
pub const CUSTODY_WALLET_TEMPLATE: &[u8] = b"pool-custody-wallet:v1:approve(controller,max)";

/// BLAKE3 context for account table keys.
pub const ACCOUNT_KEY_CONTEXT: &str = "pool 2026-01 account key v1";

// ---------------------------------------------------------------------------
// Accounting Parameters
// ---------------------------------------------------------------------------

/// Decimal places of the fiat-cent accounting unit. Assets must carry at
/// least this many decimals to be convertible.
pub const CENTS_DECIMALS: u8 = 2;

/// Default quota window: one day.
pub const DEFAULT_WITHDRAW_WINDOW: Duration = Duration::from_secs(86_400);

/// Default ownership handshake window. Short on purpose: a successor has a
/// minute to complete a transfer the owner just authorized.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating a [`PoolConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The quota window is zero.
    #[error("withdraw window must be positive")]
    ZeroWindow,

    /// The per-window cap is zero; nothing could ever be withdrawn.
    #[error("max withdraw amount must be positive")]
    ZeroCap,

    /// The handshake timeout is zero; no transfer could ever complete.
    #[error("handshake timeout must be positive")]
    ZeroHandshakeTimeout,

    /// A required identity is the zero address.
    #[error("{0} address must not be zero")]
    ZeroAddress(&'static str),

    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// PoolConfig
// ---------------------------------------------------------------------------

/// Immutable parameters a pool is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// The pool controller's own address. Custody wallets grant pull
    /// authority to it, and it is baked into every deposit address.
    pub controller: Address,
    /// The single custodial holder of pooled assets.
    pub treasury: Address,
    /// Initial operator.
    pub owner: Address,
    /// Initial successor allowed to complete an ownership handshake.
    pub successor: Address,
    /// Length of one quota window, in seconds.
    #[serde(default = "default_window_secs")]
    pub withdraw_window_secs: u64,
    /// Global cap on any account's per-window limit.
    pub max_withdraw_amount_cents: Cents,
    /// How long a started handshake stays completable, in seconds.
    #[serde(default = "default_handshake_secs")]
    pub handshake_timeout_secs: u64,
}

fn default_window_secs() -> u64 {
    DEFAULT_WITHDRAW_WINDOW.as_secs()
}

fn default_handshake_secs() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT.as_secs()
}

/// Upper bound for configured durations; `chrono::Duration` cannot hold
/// arbitrary `u64` seconds.
const MAX_DURATION_SECS: u64 = 100 * 365 * 86_400;

fn secs_to_duration(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

impl PoolConfig {
    /// Builds a config with default window and handshake timeout.
    pub fn new(
        controller: Address,
        treasury: Address,
        owner: Address,
        successor: Address,
        max_withdraw_amount_cents: Cents,
    ) -> Self {
        Self {
            controller,
            treasury,
            owner,
            successor,
            withdraw_window_secs: default_window_secs(),
            max_withdraw_amount_cents,
            handshake_timeout_secs: default_handshake_secs(),
        }
    }

    /// Overrides the quota window.
    pub fn with_window_secs(mut self, secs: u64) -> Self {
        self.withdraw_window_secs = secs;
        self
    }

    /// Overrides the handshake timeout.
    pub fn with_handshake_timeout_secs(mut self, secs: u64) -> Self {
        self.handshake_timeout_secs = secs;
        self
    }

    /// The quota window as a `chrono` duration.
    pub fn withdraw_window(&self) -> chrono::Duration {
        secs_to_duration(self.withdraw_window_secs)
    }

    /// The handshake timeout as a `chrono` duration.
    pub fn handshake_timeout(&self) -> chrono::Duration {
        secs_to_duration(self.handshake_timeout_secs)
    }

    /// Checks every parameter. The pool refuses to start on an invalid
    /// config rather than discovering the problem on the first withdrawal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.withdraw_window_secs == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.max_withdraw_amount_cents == 0 {
            return Err(ConfigError::ZeroCap);
        }
        if self.handshake_timeout_secs == 0 {
            return Err(ConfigError::ZeroHandshakeTimeout);
        }
        if self.controller.is_zero() {
            return Err(ConfigError::ZeroAddress("controller"));
        }
        if self.treasury.is_zero() {
            return Err(ConfigError::ZeroAddress("treasury"));
        }
        if self.owner.is_zero() {
            return Err(ConfigError::ZeroAddress("owner"));
        }
        Ok(())
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PoolConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PoolConfig {
        PoolConfig::new(
            Address::repeat_byte(0xc0),
            Address::repeat_byte(0x7e),
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
            10_000,
        )
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = sample();
        assert_eq!(cfg.withdraw_window_secs, 86_400);
        assert_eq!(cfg.handshake_timeout_secs, 60);
        assert_eq!(cfg.withdraw_window(), chrono::Duration::days(1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_parameters_rejected() {
        assert!(matches!(
            sample().with_window_secs(0).validate(),
            Err(ConfigError::ZeroWindow)
        ));
        assert!(matches!(
            sample().with_handshake_timeout_secs(0).validate(),
            Err(ConfigError::ZeroHandshakeTimeout)
        ));

        let mut cfg = sample();
        cfg.max_withdraw_amount_cents = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroCap)));

        let mut cfg = sample();
        cfg.treasury = Address::ZERO;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroAddress("treasury"))
        ));
    }

    #[test]
    fn json_config_uses_serde_defaults() {
        let json = format!(
            r#"{{
                "controller": "{}",
                "treasury": "{}",
                "owner": "{}",
                "successor": "{}",
                "max_withdraw_amount_cents": 500000
            }}"#,
            Address::repeat_byte(0xc0),
            Address::repeat_byte(0x7e),
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
        );
        let cfg = PoolConfig::from_json(&json).unwrap();
        assert_eq!(cfg.max_withdraw_amount_cents, 500_000);
        assert_eq!(cfg.withdraw_window_secs, DEFAULT_WITHDRAW_WINDOW.as_secs());
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            PoolConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn cents_precision_constant() {
        assert_eq!(CENTS_DECIMALS, 2);
        assert!(DEFAULT_HANDSHAKE_TIMEOUT < DEFAULT_WITHDRAW_WINDOW);
    }
}

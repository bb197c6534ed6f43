//! # Ownership Handshake
//!
//! Operator succession is a two-phase, time-boxed protocol:
//!
//! 1. The owner calls [`Ownership::start_transfer`], opening a short window.
//! 2. The pre-recorded successor calls [`Ownership::complete_transfer`]
//!    inside that window, becomes the owner and nominates the next
//!    successor.
//!
//! An expired handshake cannot be completed, only restarted. A leaked
//! successor key is therefore useless without a fresh authorization from
//! the current owner.
//!
//! The same state carries the pool-wide lock. Only the owner can engage it,
//! and only a completed transfer clears it, so a new owner always starts
//! from an unlocked pool.

use chrono::{DateTime, Duration, Utc};
use pool_protocol::types::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Authorization and handshake failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    /// The caller is not the current owner.
    #[error("unauthorized: {0} is not the pool owner")]
    NotOwner(Address),

    /// The caller is not the recorded successor.
    #[error("unauthorized: {0} is not the recorded successor")]
    NotSuccessor(Address),

    /// No handshake is in progress.
    #[error("ownership transfer not started")]
    NotStarted,

    /// The handshake window has passed; the owner must start a new one.
    #[error("ownership transfer expired: started at {started_at}, {elapsed_secs}s elapsed")]
    Expired {
        /// When the handshake was started.
        started_at: DateTime<Utc>,
        /// Seconds elapsed since then.
        elapsed_secs: i64,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Handshake {
    /// No transfer in progress.
    Stable,
    /// The owner authorized a transfer at `started_at`.
    Pending {
        /// Start of the handshake window.
        started_at: DateTime<Utc>,
    },
}

impl std::fmt::Display for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handshake::Stable => write!(f, "Stable"),
            Handshake::Pending { started_at } => write!(f, "Pending(since {started_at})"),
        }
    }
}

/// Result of a completed handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipTransfer {
    /// Owner before the transfer.
    pub previous_owner: Address,
    /// Owner after the transfer.
    pub new_owner: Address,
    /// Successor after the transfer.
    pub new_successor: Address,
    /// Whether the transfer cleared an engaged lock.
    pub unlocked: bool,
}

/// Owner, successor, handshake and lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    owner: Address,
    successor: Address,
    handshake: Handshake,
    locked: bool,
}

impl Ownership {
    /// Initial state: `Stable`, unlocked.
    pub fn new(owner: Address, successor: Address) -> Self {
        Self {
            owner,
            successor,
            handshake: Handshake::Stable,
            locked: false,
        }
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Recorded successor.
    pub fn successor(&self) -> Address {
        self.successor
    }

    /// Handshake state.
    pub fn handshake(&self) -> Handshake {
        self.handshake
    }

    /// `true` while the pool-wide lock is engaged.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Fails unless `caller` is the owner.
    pub fn require_owner(&self, caller: &Address) -> Result<(), OwnershipError> {
        if *caller != self.owner {
            return Err(OwnershipError::NotOwner(*caller));
        }
        Ok(())
    }

    /// Opens (or re-opens) the handshake window at `now`.
    pub fn start_transfer(&mut self, caller: &Address, now: DateTime<Utc>) -> Result<(), OwnershipError> {
        self.require_owner(caller)?;
        self.handshake = Handshake::Pending { started_at: now };
        Ok(())
    }

    /// Completes a pending handshake.
    ///
    /// # Errors
    ///
    /// [`OwnershipError::NotSuccessor`] if `caller` is not the successor,
    /// [`OwnershipError::NotStarted`] without a pending handshake,
    /// [`OwnershipError::Expired`] once `now - started_at >= timeout`.
    pub fn complete_transfer(
        &mut self,
        caller: &Address,
        new_successor: Address,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<OwnershipTransfer, OwnershipError> {
        if *caller != self.successor {
            return Err(OwnershipError::NotSuccessor(*caller));
        }

        let started_at = match self.handshake {
            Handshake::Pending { started_at } => started_at,
            Handshake::Stable => return Err(OwnershipError::NotStarted),
        };

        let elapsed = now - started_at;
        if elapsed >= timeout {
            return Err(OwnershipError::Expired {
                started_at,
                elapsed_secs: elapsed.num_seconds(),
            });
        }

        let transfer = OwnershipTransfer {
            previous_owner: self.owner,
            new_owner: self.successor,
            new_successor,
            unlocked: self.locked,
        };

        self.owner = self.successor;
        self.successor = new_successor;
        self.locked = false;
        self.handshake = Handshake::Stable;

        Ok(transfer)
    }

    /// Engages the pool-wide lock. Idempotent.
    pub fn lock(&mut self, caller: &Address) -> Result<(), OwnershipError> {
        self.require_owner(caller)?;
        self.locked = true;
        Ok(())
    }
}

//! # Pool Events
//!
//! Append-only log for off-chain observers. Every committed state change
//! produces exactly one event per effect; rejected operations produce none.
//! The settlement process correlates [`EventKind::Withdrawn`] with its own
//! payments through the settlement reference.

use chrono::{DateTime, Utc};
use pool_protocol::types::{Address, AssetHandle, AssetTag, Cents, SettlementRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A new asset tag was bound to a handle.
    AssetRegistered {
        /// The tag.
        tag: AssetTag,
        /// The asset contract.
        handle: AssetHandle,
        /// Registered decimal precision.
        decimals: u8,
    },

    /// A sub-account was created and its custody wallet instantiated.
    AccountCreated {
        /// Account owner.
        beneficiary: Address,
        /// Asset tag.
        tag: AssetTag,
        /// Custody wallet address.
        deposit_address: Address,
    },

    /// Funds were pulled from a custody wallet into the treasury.
    DepositReceived {
        /// Account owner.
        beneficiary: Address,
        /// Custody wallet the funds came from.
        deposit_address: Address,
        /// Asset tag.
        tag: AssetTag,
        /// Amount credited, in cents.
        amount_cents: Cents,
    },

    /// The treasury paid a beneficiary.
    Withdrawn {
        /// Recipient.
        beneficiary: Address,
        /// Asset tag.
        tag: AssetTag,
        /// Amount actually paid, in cents.
        amount_cents: Cents,
        /// Off-chain payment this release fulfills.
        settlement_ref: SettlementRef,
    },

    /// An ownership handshake completed.
    OwnershipTransferred {
        /// Owner before the transfer.
        previous_owner: Address,
        /// Owner after the transfer.
        new_owner: Address,
        /// Successor nominated by the new owner.
        new_successor: Address,
    },

    /// The owner engaged the pool-wide lock.
    PoolLocked {
        /// Who locked the pool.
        by: Address,
    },
}

impl EventKind {
    /// Short machine-friendly name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::AssetRegistered { .. } => "asset_registered",
            EventKind::AccountCreated { .. } => "account_created",
            EventKind::DepositReceived { .. } => "deposit_received",
            EventKind::Withdrawn { .. } => "withdrawn",
            EventKind::OwnershipTransferred { .. } => "ownership_transferred",
            EventKind::PoolLocked { .. } => "pool_locked",
        }
    }
}

/// A committed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Time of the operation that produced the event.
    pub emitted_at: DateTime<Utc>,
    /// Payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

impl PoolEvent {
    /// Stamps an event kind with a fresh id and the operation time.
    pub fn new(kind: EventKind, emitted_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            emitted_at,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdrawn_event_serializes_with_type_tag() {
        let event = PoolEvent::new(
            EventKind::Withdrawn {
                beneficiary: Address::repeat_byte(1),
                tag: 3,
                amount_cents: 250,
                settlement_ref: SettlementRef::new("tx-42"),
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "withdrawn");
        assert_eq!(json["settlement_ref"], "tx-42");
        assert_eq!(json["amount_cents"], 250);

        let back: PoolEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn event_ids_are_unique() {
        let kind = EventKind::PoolLocked {
            by: Address::repeat_byte(9),
        };
        let a = PoolEvent::new(kind.clone(), Utc::now());
        let b = PoolEvent::new(kind, Utc::now());
        assert_ne!(a.id, b.id);
        assert_eq!(a.kind.name(), "pool_locked");
    }
}

//! Integration tests for the ownership handshake and the pool-wide lock.
//!
//! The handshake is time-boxed: the owner opens it, and the successor has a
//! fixed window to complete it. Completion rotates owner and successor and
//! always clears the lock.

use pool_contracts::events::EventKind;
use pool_contracts::ownership::{Handshake, OwnershipError};
use pool_contracts::{LiquidityPool, PoolError};
use pool_protocol::asset::InMemoryAssets;
use pool_protocol::clock::ManualClock;
use pool_protocol::config::PoolConfig;
use pool_protocol::logging::{self, LogConfig};
use pool_protocol::types::Address;

const CONTROLLER: Address = Address::repeat_byte(0xc0);
const TREASURY: Address = Address::repeat_byte(0x7e);
const OWNER: Address = Address::repeat_byte(0x01);
const SUCCESSOR: Address = Address::repeat_byte(0x02);
const NEXT: Address = Address::repeat_byte(0x03);
const MALLORY: Address = Address::repeat_byte(0x66);

/// Helper: a pool with a 60s handshake timeout.
fn pool() -> LiquidityPool<InMemoryAssets, ManualClock> {
    let _ = logging::try_init(&LogConfig::for_tests());
    let config = PoolConfig::new(CONTROLLER, TREASURY, OWNER, SUCCESSOR, 10_000)
        .with_handshake_timeout_secs(60);
    LiquidityPool::new(config, InMemoryAssets::new(), ManualClock::at_unix(1_700_000_000)).unwrap()
}

// ---------------------------------------------------------------------------
// Handshake Timing
// ---------------------------------------------------------------------------

#[test]
fn completion_inside_window_rotates_roles() {
    let mut pool = pool();
    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(59);

    pool.complete_transfer(&SUCCESSOR, NEXT).unwrap();
    assert_eq!(pool.owner(), SUCCESSOR);
    assert_eq!(pool.successor(), NEXT);
    assert_eq!(pool.handshake(), Handshake::Stable);
}

#[test]
fn completion_after_window_fails() {
    let mut pool = pool();
    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(61);

    let err = pool.complete_transfer(&SUCCESSOR, NEXT).unwrap_err();
    assert!(matches!(
        err,
        PoolError::Ownership(OwnershipError::Expired {
            elapsed_secs: 61,
            ..
        })
    ));
    assert_eq!(pool.owner(), OWNER);
    assert_eq!(pool.successor(), SUCCESSOR);
}

#[test]
fn completion_exactly_at_timeout_fails() {
    let mut pool = pool();
    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(60);
    assert!(pool.complete_transfer(&SUCCESSOR, NEXT).is_err());
}

#[test]
fn restarting_resets_the_window() {
    let mut pool = pool();
    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(50);
    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(50);

    pool.complete_transfer(&SUCCESSOR, NEXT).unwrap();
    assert_eq!(pool.owner(), SUCCESSOR);
}

#[test]
fn expired_handshake_can_be_reopened() {
    let mut pool = pool();
    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(120);
    assert!(pool.complete_transfer(&SUCCESSOR, NEXT).is_err());

    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(1);
    pool.complete_transfer(&SUCCESSOR, NEXT).unwrap();
    assert_eq!(pool.owner(), SUCCESSOR);
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[test]
fn only_owner_starts_transfer() {
    let mut pool = pool();
    let err = pool.start_transfer(&SUCCESSOR).unwrap_err();
    assert!(matches!(
        err,
        PoolError::Ownership(OwnershipError::NotOwner(a)) if a == SUCCESSOR
    ));
    assert_eq!(pool.handshake(), Handshake::Stable);
}

#[test]
fn only_successor_completes_transfer() {
    let mut pool = pool();
    pool.start_transfer(&OWNER).unwrap();

    for caller in [OWNER, MALLORY] {
        let err = pool.complete_transfer(&caller, MALLORY).unwrap_err();
        assert!(matches!(
            err,
            PoolError::Ownership(OwnershipError::NotSuccessor(_))
        ));
    }
    assert_eq!(pool.owner(), OWNER);
}

#[test]
fn completion_without_start_fails() {
    let mut pool = pool();
    let err = pool.complete_transfer(&SUCCESSOR, NEXT).unwrap_err();
    assert!(matches!(
        err,
        PoolError::Ownership(OwnershipError::NotStarted)
    ));
}

#[test]
fn previous_owner_loses_authority() {
    let mut pool = pool();
    pool.start_transfer(&OWNER).unwrap();
    pool.complete_transfer(&SUCCESSOR, NEXT).unwrap();

    assert!(pool.lock(&OWNER).is_err());
    assert!(pool.register_asset(&OWNER, 1, Address::repeat_byte(0xd6), 6).is_err());
    pool.register_asset(&SUCCESSOR, 1, Address::repeat_byte(0xd6), 6)
        .unwrap();
}

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

#[test]
fn completed_transfer_clears_lock() {
    let mut pool = pool();
    pool.lock(&OWNER).unwrap();
    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(59);
    pool.complete_transfer(&SUCCESSOR, NEXT).unwrap();
    assert!(!pool.is_locked());
}

#[test]
fn failed_transfer_keeps_lock() {
    let mut pool = pool();
    pool.lock(&OWNER).unwrap();
    pool.start_transfer(&OWNER).unwrap();
    pool.clock().advance_secs(61);
    assert!(pool.complete_transfer(&SUCCESSOR, NEXT).is_err());
    assert!(pool.is_locked());
}

#[test]
fn lock_and_transfer_emit_events() {
    let mut pool = pool();
    pool.lock(&OWNER).unwrap();
    pool.start_transfer(&OWNER).unwrap();
    pool.complete_transfer(&SUCCESSOR, NEXT).unwrap();

    let events = pool.drain_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventKind::PoolLocked { by: OWNER });
    assert_eq!(
        events[1].kind,
        EventKind::OwnershipTransferred {
            previous_owner: OWNER,
            new_owner: SUCCESSOR,
            new_successor: NEXT,
        }
    );
    assert!(pool.events().is_empty());
}

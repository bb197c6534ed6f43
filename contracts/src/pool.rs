//! # Liquidity Pool Controller
//!
//! Ties the components together and enforces the operation-level rules:
//!
//! - every mutating call checks authorization first;
//! - intake and withdrawal require the lock to be clear and the asset tag
//!   to be registered;
//! - every call reads the clock exactly once, at entry;
//! - intake and withdrawal run inside a [`UnitOfWork`], so a failure at any
//!   step leaves the pool and the asset ledger exactly as they were.
//!
//! The pool owns its state outright (no globals) and can export it as a
//! [`PoolSnapshot`] and be rebuilt from one.

use chrono::{DateTime, Utc};
use pool_protocol::asset::{AssetCapability, AssetError};
use pool_protocol::clock::{Clock, SystemClock};
use pool_protocol::config::{ConfigError, PoolConfig};
use pool_protocol::types::{Address, AssetHandle, AssetTag, Cents, NativeAmount, SettlementRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::account_ledger::{Account, AccountKey, AccountLedger, LedgerError};
use crate::custody_wallet::CustodyWallet;
use crate::deposit_address::DepositAddressDeriver;
use crate::events::{EventKind, PoolEvent};
use crate::ownership::{Handshake, Ownership, OwnershipError};
use crate::token_registry::{Asset, RegistryError, TokenRegistry};
use crate::treasury::{Treasury, TreasuryError};
use crate::unit_of_work::{Changeset, UnitOfWork};
use crate::withdraw_limit::{to_native_units, Quota, WithdrawLimitPolicy};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Every way a pool operation can be rejected. Rejections are atomic: no
/// state or asset balance changes.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Intake and withdrawal are disabled until the next ownership transfer.
    #[error("pool is locked")]
    Locked,

    /// Authorization or handshake failure.
    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    /// Asset registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Accounting precondition or conversion failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Treasury payout failure.
    #[error(transparent)]
    Treasury(#[from] TreasuryError),

    /// The asset ledger rejected a pull or wallet instantiation.
    #[error("asset call failed: {0}")]
    Asset(#[from] AssetError),

    /// Invalid pool configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Receipts & Snapshot
// ---------------------------------------------------------------------------

/// Result of a successful intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositReceipt {
    /// Custody wallet the funds were pulled from.
    pub deposit_address: Address,
    /// `true` if this intake created the account.
    pub account_created: bool,
    /// Amount credited, in cents.
    pub amount_cents: Cents,
    /// Amount pulled, in native units.
    pub native_amount: NativeAmount,
    /// Limit after the intake.
    pub withdraw_limit_cents: Cents,
}

/// Result of a successful withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    /// Amount paid, in cents. May be less than requested.
    pub paid_cents: Cents,
    /// Amount paid, in native units.
    pub native_amount: NativeAmount,
    /// Quota left in the current window.
    pub available_cents: Cents,
}

/// Serializable pool state: configuration, ownership, the asset table and
/// the account table. Nothing else is externally visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Immutable configuration.
    pub config: PoolConfig,
    /// Owner, successor, handshake and lock.
    pub ownership: Ownership,
    /// Registered assets.
    pub registry: TokenRegistry,
    /// Accounts.
    pub accounts: AccountLedger,
}

impl PoolSnapshot {
    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses JSON produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// LiquidityPool
// ---------------------------------------------------------------------------

/// The pool controller.
pub struct LiquidityPool<A: AssetCapability, C: Clock = SystemClock> {
    config: PoolConfig,
    ownership: Ownership,
    registry: TokenRegistry,
    ledger: AccountLedger,
    deriver: DepositAddressDeriver,
    treasury: Treasury,
    policy: WithdrawLimitPolicy,
    assets: A,
    clock: C,
    events: Vec<PoolEvent>,
}

impl<A: AssetCapability, C: Clock> LiquidityPool<A, C> {
    /// Creates an empty pool.
    ///
    /// # Errors
    ///
    /// [`PoolError::Config`] if the configuration does not validate.
    pub fn new(config: PoolConfig, assets: A, clock: C) -> Result<Self, PoolError> {
        let ownership = Ownership::new(config.owner, config.successor);
        Self::assemble(
            config,
            ownership,
            TokenRegistry::new(),
            AccountLedger::new(),
            assets,
            clock,
        )
    }

    /// Rebuilds a pool from a snapshot.
    ///
    /// # Errors
    ///
    /// [`PoolError::Config`] for an invalid configuration and
    /// [`LedgerError::CorruptAccount`] for any account that breaks the
    /// table invariants under that configuration (e.g. a limit above a
    /// lowered cap).
    pub fn restore(snapshot: PoolSnapshot, assets: A, clock: C) -> Result<Self, PoolError> {
        Self::assemble(
            snapshot.config,
            snapshot.ownership,
            snapshot.registry,
            snapshot.accounts,
            assets,
            clock,
        )
    }

    fn assemble(
        config: PoolConfig,
        ownership: Ownership,
        registry: TokenRegistry,
        ledger: AccountLedger,
        assets: A,
        clock: C,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        ledger.check_integrity(config.max_withdraw_amount_cents)?;
        info!(
            controller = %config.controller,
            treasury = %config.treasury,
            owner = %ownership.owner(),
            window_secs = config.withdraw_window_secs,
            cap_cents = config.max_withdraw_amount_cents,
            accounts = ledger.len(),
            "liquidity pool initialized"
        );
        Ok(Self {
            deriver: DepositAddressDeriver::new(config.controller),
            treasury: Treasury::new(config.treasury, config.controller),
            policy: WithdrawLimitPolicy::new(
                config.withdraw_window(),
                config.max_withdraw_amount_cents,
            ),
            config,
            ownership,
            registry,
            ledger,
            assets,
            clock,
            events: Vec::new(),
        })
    }

    /// Exports the persistent state.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            config: self.config.clone(),
            ownership: self.ownership.clone(),
            registry: self.registry.clone(),
            accounts: self.ledger.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Binds an asset tag. Owner-only, write-once.
    pub fn register_asset(
        &mut self,
        caller: &Address,
        tag: AssetTag,
        handle: AssetHandle,
        decimals: u8,
    ) -> Result<Asset, PoolError> {
        let now = self.clock.now();
        let result = match self.ownership.require_owner(caller) {
            Ok(()) => self
                .registry
                .register(tag, handle, decimals)
                .map_err(PoolError::from),
            Err(e) => Err(e.into()),
        };

        let asset = reject_logged("register_asset", result)?;
        info!(tag, handle = %handle, decimals, "asset registered");
        self.record(
            EventKind::AssetRegistered {
                tag,
                handle,
                decimals,
            },
            now,
        );
        Ok(asset)
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    /// Opens (or restarts) the ownership handshake window.
    pub fn start_transfer(&mut self, caller: &Address) -> Result<(), PoolError> {
        let now = self.clock.now();
        reject_logged(
            "start_transfer",
            self.ownership.start_transfer(caller, now).map_err(Into::into),
        )?;
        info!(owner = %caller, successor = %self.ownership.successor(), "ownership transfer started");
        Ok(())
    }

    /// Completes a pending handshake; clears the lock.
    pub fn complete_transfer(
        &mut self,
        caller: &Address,
        new_successor: Address,
    ) -> Result<(), PoolError> {
        let now = self.clock.now();
        let timeout = self.config.handshake_timeout();
        let transfer = reject_logged(
            "complete_transfer",
            self.ownership
                .complete_transfer(caller, new_successor, now, timeout)
                .map_err(Into::into),
        )?;

        info!(
            previous_owner = %transfer.previous_owner,
            new_owner = %transfer.new_owner,
            new_successor = %transfer.new_successor,
            unlocked = transfer.unlocked,
            "ownership transferred"
        );
        self.record(
            EventKind::OwnershipTransferred {
                previous_owner: transfer.previous_owner,
                new_owner: transfer.new_owner,
                new_successor: transfer.new_successor,
            },
            now,
        );
        Ok(())
    }

    /// Engages the pool-wide lock.
    pub fn lock(&mut self, caller: &Address) -> Result<(), PoolError> {
        let now = self.clock.now();
        reject_logged("lock", self.ownership.lock(caller).map_err(Into::into))?;
        warn!(by = %caller, "pool locked");
        self.record(EventKind::PoolLocked { by: *caller }, now);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Intake & Withdrawal
    // -----------------------------------------------------------------------

    /// Pulls `amount_cents` worth of the asset from the beneficiary's
    /// custody wallet into the treasury and grows the account's limit.
    /// Creates the account and instantiates its wallet on first use.
    pub fn intake(
        &mut self,
        caller: &Address,
        beneficiary: Address,
        tag: AssetTag,
        amount_cents: Cents,
    ) -> Result<DepositReceipt, PoolError> {
        let now = self.clock.now();
        let result = self.try_intake(caller, beneficiary, tag, amount_cents, now);
        let (receipt, changeset) = reject_logged("intake", result)?;
        self.apply(changeset, now);
        info!(
            beneficiary = %beneficiary,
            tag,
            amount_cents,
            deposit_address = %receipt.deposit_address,
            limit_cents = receipt.withdraw_limit_cents,
            "deposit received"
        );
        Ok(receipt)
    }

    fn try_intake(
        &mut self,
        caller: &Address,
        beneficiary: Address,
        tag: AssetTag,
        amount_cents: Cents,
        now: DateTime<Utc>,
    ) -> Result<(DepositReceipt, Changeset), PoolError> {
        self.ownership.require_owner(caller)?;
        self.ensure_unlocked()?;
        let asset = *self.registry.require(tag)?;
        if amount_cents == 0 {
            return Err(LedgerError::ZeroAmount.into());
        }
        let native_amount = to_native_units(amount_cents, asset.decimals)?;

        let existing = self
            .ledger
            .get_by_key(&AccountKey::derive(&beneficiary, tag))
            .cloned();

        let controller = self.config.controller;
        let mut uow = UnitOfWork::begin(&mut self.assets);

        let (mut account, account_created) = match existing {
            Some(account) => (account, false),
            None => {
                let address = self.deriver.derive(&beneficiary, tag, &asset.handle);
                let wallet = CustodyWallet::instantiate(&mut uow, address, asset.handle, controller)?;
                debug!(
                    wallet = %wallet.address(),
                    asset = %wallet.asset(),
                    controller = %wallet.controller(),
                    "custody wallet instantiated"
                );
                let fresh = self
                    .ledger
                    .prepare_new(beneficiary, tag, wallet.address(), now)?;
                uow.emit(EventKind::AccountCreated {
                    beneficiary,
                    tag,
                    deposit_address: wallet.address(),
                });
                (fresh, true)
            }
        };

        uow.transfer_from(
            controller,
            asset.handle,
            account.deposit_address,
            self.treasury.address(),
            native_amount,
        )?;

        let outcome = self.policy.apply_intake(&mut account, amount_cents);
        if outcome.limit_cents != outcome.previous_limit_cents {
            debug!(
                beneficiary = %beneficiary,
                tag,
                from = outcome.previous_limit_cents,
                to = outcome.limit_cents,
                capped = outcome.capped,
                "withdraw limit raised"
            );
        }

        let receipt = DepositReceipt {
            deposit_address: account.deposit_address,
            account_created,
            amount_cents,
            native_amount,
            withdraw_limit_cents: account.withdraw_limit_cents,
        };
        uow.emit(EventKind::DepositReceived {
            beneficiary,
            deposit_address: account.deposit_address,
            tag,
            amount_cents,
        });
        uow.stage_account(account);

        Ok((receipt, uow.commit()))
    }

    /// Pays up to `amount_cents` to the beneficiary from the treasury,
    /// bounded by the account's current quota.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        beneficiary: Address,
        tag: AssetTag,
        amount_cents: Cents,
        settlement_ref: SettlementRef,
    ) -> Result<WithdrawalReceipt, PoolError> {
        let now = self.clock.now();
        let result = self.try_withdraw(caller, beneficiary, tag, amount_cents, settlement_ref, now);
        let (receipt, changeset) = reject_logged("withdraw", result)?;
        self.apply(changeset, now);
        info!(
            beneficiary = %beneficiary,
            tag,
            requested_cents = amount_cents,
            paid_cents = receipt.paid_cents,
            available_cents = receipt.available_cents,
            "withdrawal paid"
        );
        Ok(receipt)
    }

    fn try_withdraw(
        &mut self,
        caller: &Address,
        beneficiary: Address,
        tag: AssetTag,
        amount_cents: Cents,
        settlement_ref: SettlementRef,
        now: DateTime<Utc>,
    ) -> Result<(WithdrawalReceipt, Changeset), PoolError> {
        self.ownership.require_owner(caller)?;
        self.ensure_unlocked()?;
        let asset = *self.registry.require(tag)?;

        let mut account = self.ledger.require(&beneficiary, tag)?.clone();
        if self.policy.window_expired(&account, now) {
            debug!(beneficiary = %beneficiary, tag, "quota window rolled over");
        }
        let paid_cents = self.policy.apply_withdrawal(&mut account, amount_cents, now)?;
        let native_amount = to_native_units(paid_cents, asset.decimals)?;

        let controller = self.config.controller;
        let mut uow = UnitOfWork::begin(&mut self.assets);
        self.treasury
            .pay_out(&controller, &mut uow, asset.handle, beneficiary, native_amount)?;

        let receipt = WithdrawalReceipt {
            paid_cents,
            native_amount,
            available_cents: account.available_cents,
        };
        uow.emit(EventKind::Withdrawn {
            beneficiary,
            tag,
            amount_cents: paid_cents,
            settlement_ref,
        });
        uow.stage_account(account);

        Ok((receipt, uow.commit()))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Deposit address of `(beneficiary, tag)`. Works before the account
    /// exists and for unregistered tags (zero handle).
    pub fn derive_deposit_address(&self, beneficiary: &Address, tag: AssetTag) -> Address {
        self.deriver
            .derive(beneficiary, tag, &self.registry.handle_of(tag))
    }

    /// The quota a withdrawal attempted now would see.
    pub fn get_quota(&self, beneficiary: &Address, tag: AssetTag) -> Quota {
        let now = self.clock.now();
        self.ledger
            .get(beneficiary, tag)
            .map(|account| self.policy.quota_at(account, now))
            .unwrap_or_else(Quota::empty)
    }

    /// The stored account record, if any.
    pub fn account(&self, beneficiary: &Address, tag: AssetTag) -> Option<&Account> {
        self.ledger.get(beneficiary, tag)
    }

    /// The registered asset for `tag`, if any.
    pub fn asset(&self, tag: AssetTag) -> Option<&Asset> {
        self.registry.get(tag)
    }

    /// `true` if `tag` is bound to an asset.
    pub fn is_registered(&self, tag: AssetTag) -> bool {
        self.registry.is_registered(tag)
    }

    /// Handle bound to `tag`, or the zero handle.
    pub fn handle_of(&self, tag: AssetTag) -> AssetHandle {
        self.registry.handle_of(tag)
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.ownership.owner()
    }

    /// Recorded successor.
    pub fn successor(&self) -> Address {
        self.ownership.successor()
    }

    /// Handshake state.
    pub fn handshake(&self) -> Handshake {
        self.ownership.handshake()
    }

    /// `true` while intake and withdrawal are disabled.
    pub fn is_locked(&self) -> bool {
        self.ownership.is_locked()
    }

    /// Immutable configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The treasury.
    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    /// The injected asset capability.
    pub fn assets(&self) -> &A {
        &self.assets
    }

    /// Mutable access to the asset capability, for the external side of
    /// the system (users funding deposit addresses).
    pub fn assets_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    /// The injected clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Events committed since creation (or the last drain).
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    /// Takes the committed events, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_unlocked(&self) -> Result<(), PoolError> {
        if self.ownership.is_locked() {
            return Err(PoolError::Locked);
        }
        Ok(())
    }

    fn apply(&mut self, changeset: Changeset, now: DateTime<Utc>) {
        for account in changeset.accounts {
            self.ledger.store(account);
        }
        for event in changeset.events {
            self.record(event, now);
        }
    }

    fn record(&mut self, kind: EventKind, now: DateTime<Utc>) {
        let event = PoolEvent::new(kind, now);
        debug!(id = %event.id, kind = event.kind.name(), "event emitted");
        self.events.push(event);
    }
}

fn reject_logged<T>(op: &'static str, result: Result<T, PoolError>) -> Result<T, PoolError> {
    result.map_err(|e| {
        warn!(op, error = %e, "operation rejected");
        e
    })
}

//! # Withdraw Limit Policy
//!
//! The anti-abuse core of the pool. Each account has a withdrawal limit
//! that grows with deposited value and a quota that resets to the full
//! limit once per window.
//!
//! ## Limit growth
//!
//! Intake adds to a cumulative trust balance. Whenever that balance passes
//! the current limit, the limit is raised to it, up to the global cap. This
//! is the only way a limit grows, and it never shrinks.
//!
//! ## Freeze at the cap
//!
//! Once the limit equals the cap there is nothing left to compute, so the
//! trust balance stops moving on both intake and withdrawal. A capped
//! account stays capped.
//!
//! ## Quota windows
//!
//! A window opens when the account is created, with nothing available.
//! When a full window has elapsed, the next withdrawal (or quota query)
//! sees a fresh window holding the entire limit. Replenishment is a reset,
//! not an accumulation: unused quota does not carry over.

use chrono::{DateTime, Duration, Utc};
use pool_protocol::config::CENTS_DECIMALS;
use pool_protocol::types::{Cents, NativeAmount};
use serde::{Deserialize, Serialize};

use crate::account_ledger::{Account, LedgerError};

/// Quota an account would have if a withdrawal were attempted now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Withdrawable right now, in cents.
    pub available_cents: Cents,
    /// Start of the window `available_cents` belongs to. `None` for an
    /// account that does not exist yet.
    pub window_started_at: Option<DateTime<Utc>>,
    /// Full-window limit.
    pub limit_cents: Cents,
}

impl Quota {
    /// The quota of an account that has never been funded.
    pub fn empty() -> Self {
        Self {
            available_cents: 0,
            window_started_at: None,
            limit_cents: 0,
        }
    }
}

/// What an intake did to the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeOutcome {
    /// Limit before the intake.
    pub previous_limit_cents: Cents,
    /// Limit after the intake.
    pub limit_cents: Cents,
    /// `true` if the trust balance is frozen after this intake.
    pub capped: bool,
}

/// Window length and global cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawLimitPolicy {
    window: Duration,
    cap: Cents,
}

impl WithdrawLimitPolicy {
    /// Policy with the given window and cap.
    pub fn new(window: Duration, cap: Cents) -> Self {
        Self { window, cap }
    }

    /// Length of one quota window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Global per-window cap.
    pub fn cap(&self) -> Cents {
        self.cap
    }

    /// `true` once the account's limit has reached the cap.
    pub fn is_capped(&self, account: &Account) -> bool {
        account.withdraw_limit_cents >= self.cap
    }

    /// `true` if a full window has elapsed since the current one opened.
    pub fn window_expired(&self, account: &Account, now: DateTime<Utc>) -> bool {
        now - account.window_started_at >= self.window
    }

    /// Applies an intake of `amount_cents` to the limit and trust balance.
    /// Does not touch the quota.
    pub fn apply_intake(&self, account: &mut Account, amount_cents: Cents) -> IntakeOutcome {
        let previous_limit_cents = account.withdraw_limit_cents;
        let new_cumulative = account.cumulative_balance_cents.saturating_add(amount_cents);

        if new_cumulative > account.withdraw_limit_cents && !self.is_capped(account) {
            account.withdraw_limit_cents = new_cumulative.min(self.cap);
        }

        let capped = self.is_capped(account);
        if !capped {
            account.cumulative_balance_cents = new_cumulative;
        }

        IntakeOutcome {
            previous_limit_cents,
            limit_cents: account.withdraw_limit_cents,
            capped,
        }
    }

    /// The quota as of `now`, without mutating anything.
    pub fn quota_at(&self, account: &Account, now: DateTime<Utc>) -> Quota {
        if self.window_expired(account, now) {
            Quota {
                available_cents: account.withdraw_limit_cents,
                window_started_at: Some(now),
                limit_cents: account.withdraw_limit_cents,
            }
        } else {
            Quota {
                available_cents: account.available_cents,
                window_started_at: Some(account.window_started_at),
                limit_cents: account.withdraw_limit_cents,
            }
        }
    }

    /// Rolls the window if due, then consumes up to `requested_cents` of
    /// quota. Returns the payable amount.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NothingToWithdraw`] when the payable amount is zero.
    /// The account is left untouched in that case.
    pub fn apply_withdrawal(
        &self,
        account: &mut Account,
        requested_cents: Cents,
        now: DateTime<Utc>,
    ) -> Result<Cents, LedgerError> {
        let quota = self.quota_at(account, now);
        let payable = requested_cents.min(quota.available_cents);
        if payable == 0 {
            return Err(LedgerError::NothingToWithdraw {
                requested: requested_cents,
                available: quota.available_cents,
            });
        }

        if let Some(started_at) = quota.window_started_at {
            account.window_started_at = started_at;
        }
        account.available_cents = quota.available_cents - payable;

        if !self.is_capped(account) {
            account.cumulative_balance_cents =
                account.cumulative_balance_cents.saturating_sub(payable);
        }

        Ok(payable)
    }
}

/// Converts cents to native units: `cents * 10^(decimals - 2)`.
///
/// # Errors
///
/// [`LedgerError::InsufficientPrecision`] below two decimals,
/// [`LedgerError::ConversionOverflow`] if the result does not fit.
pub fn to_native_units(cents: Cents, decimals: u8) -> Result<NativeAmount, LedgerError> {
    let shift = decimals
        .checked_sub(CENTS_DECIMALS)
        .ok_or(LedgerError::InsufficientPrecision { decimals })?;

    NativeAmount::from(10u8)
        .checked_pow(u32::from(shift))
        .and_then(|scale| NativeAmount::from(cents).checked_mul(scale))
        .ok_or(LedgerError::ConversionOverflow { cents, decimals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pool_protocol::types::Address;

    const CAP: Cents = 10_000;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn policy() -> WithdrawLimitPolicy {
        WithdrawLimitPolicy::new(Duration::seconds(86_400), CAP)
    }

    fn fresh() -> Account {
        Account {
            beneficiary: Address::repeat_byte(1),
            tag: 1,
            deposit_address: Address::repeat_byte(0x10),
            cumulative_balance_cents: 0,
            withdraw_limit_cents: 0,
            available_cents: 0,
            window_started_at: t(0),
            created_at: t(0),
        }
    }

    #[test]
    fn intake_raises_limit_to_cumulative() {
        let mut account = fresh();
        let outcome = policy().apply_intake(&mut account, 3_000);
        assert_eq!(outcome.limit_cents, 3_000);
        assert!(!outcome.capped);
        assert_eq!(account.cumulative_balance_cents, 3_000);
        assert_eq!(account.available_cents, 0);
    }

    #[test]
    fn intake_caps_limit_and_freezes_cumulative() {
        let mut account = fresh();
        let p = policy();
        p.apply_intake(&mut account, 3_000);
        let outcome = p.apply_intake(&mut account, 9_000);
        assert_eq!(outcome.previous_limit_cents, 3_000);
        assert_eq!(outcome.limit_cents, CAP);
        assert!(outcome.capped);
        assert_eq!(account.cumulative_balance_cents, 3_000);

        p.apply_intake(&mut account, 50_000);
        assert_eq!(account.cumulative_balance_cents, 3_000);
        assert_eq!(account.withdraw_limit_cents, CAP);
    }

    #[test]
    fn intake_below_limit_only_grows_cumulative() {
        let mut account = fresh();
        let p = policy();
        p.apply_intake(&mut account, 5_000);
        // Withdrawal while ramping reduces the trust balance but not the limit.
        account.available_cents = 5_000;
        p.apply_withdrawal(&mut account, 4_000, t(10)).unwrap();
        assert_eq!(account.cumulative_balance_cents, 1_000);

        let outcome = p.apply_intake(&mut account, 2_000);
        assert_eq!(outcome.limit_cents, 5_000);
        assert_eq!(account.cumulative_balance_cents, 3_000);
    }

    #[test]
    fn first_window_has_no_quota() {
        let mut account = fresh();
        let p = policy();
        p.apply_intake(&mut account, 3_000);
        let err = p.apply_withdrawal(&mut account, 100, t(60)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::NothingToWithdraw {
                requested: 100,
                available: 0
            }
        );
    }

    #[test]
    fn window_rollover_restores_full_limit() {
        let mut account = fresh();
        let p = policy();
        p.apply_intake(&mut account, 3_000);

        let quota = p.quota_at(&account, t(86_400));
        assert_eq!(quota.available_cents, 3_000);
        assert_eq!(quota.window_started_at, Some(t(86_400)));
        // Read-only: nothing moved.
        assert_eq!(account.available_cents, 0);
        assert_eq!(account.window_started_at, t(0));

        let paid = p.apply_withdrawal(&mut account, 3_000, t(86_400)).unwrap();
        assert_eq!(paid, 3_000);
        assert_eq!(account.available_cents, 0);
        assert_eq!(account.window_started_at, t(86_400));
    }

    #[test]
    fn withdrawal_pays_at_most_available() {
        let mut account = fresh();
        let p = policy();
        p.apply_intake(&mut account, 3_000);
        let paid = p.apply_withdrawal(&mut account, 5_000, t(90_000)).unwrap();
        assert_eq!(paid, 3_000);
    }

    #[test]
    fn rollover_resets_instead_of_accumulating() {
        let mut account = fresh();
        let p = policy();
        p.apply_intake(&mut account, 3_000);
        p.apply_withdrawal(&mut account, 1_000, t(86_400)).unwrap();
        assert_eq!(account.available_cents, 2_000);

        // Two windows later: still just the limit, not limit + leftover.
        let quota = p.quota_at(&account, t(3 * 86_400));
        assert_eq!(quota.available_cents, 3_000);
    }

    #[test]
    fn zero_request_fails_without_rolling_window() {
        let mut account = fresh();
        let p = policy();
        p.apply_intake(&mut account, 3_000);
        assert!(p.apply_withdrawal(&mut account, 0, t(90_000)).is_err());
        assert_eq!(account.window_started_at, t(0));
    }

    #[test]
    fn capped_withdrawal_leaves_cumulative_alone() {
        let mut account = fresh();
        let p = policy();
        p.apply_intake(&mut account, 12_000);
        assert_eq!(account.cumulative_balance_cents, 0);
        p.apply_withdrawal(&mut account, 10_000, t(86_400)).unwrap();
        assert_eq!(account.cumulative_balance_cents, 0);
        assert_eq!(account.withdraw_limit_cents, CAP);
    }

    #[test]
    fn native_unit_conversion() {
        assert_eq!(to_native_units(150, 2).unwrap(), 150);
        assert_eq!(to_native_units(150, 6).unwrap(), 1_500_000);
        assert_eq!(
            to_native_units(1, 18).unwrap(),
            10_000_000_000_000_000
        );
    }

    #[test]
    fn conversion_requires_two_decimals() {
        assert_eq!(
            to_native_units(1, 1),
            Err(LedgerError::InsufficientPrecision { decimals: 1 })
        );
    }

    #[test]
    fn conversion_overflow_detected() {
        assert_eq!(
            to_native_units(u64::MAX, 255),
            Err(LedgerError::ConversionOverflow {
                cents: u64::MAX,
                decimals: 255
            })
        );
    }
}

//! # Liquidity Pool Contracts
//!
//! A custodial liquidity pool. Users fund per-user deposit addresses,
//! an owner sweeps those deposits into a single treasury, and the owner
//! pays users back out of the treasury under a per-account, per-window
//! withdrawal limit that grows with deposited value.
//!
//! - **Token Registry**: write-once `tag → (handle, decimals)` table.
//! - **Deposit Addresses**: deterministic custody wallet address per
//!   `(beneficiary, asset)`, computable before the wallet exists.
//! - **Account Ledger**: per-`(beneficiary, asset)` limit and quota state.
//! - **Withdraw Limit Policy**: limit growth, cap freeze and window reset.
//! - **Ownership**: owner/successor handshake and the pool-wide lock.
//! - **Treasury**: dumb custody, driven only by the controller.
//! - **Liquidity Pool**: the controller that ties it all together.
//!
//! ## Design Principles
//!
//! 1. Monetary arithmetic never wraps. Cent amounts saturate where the
//!    accounting allows it and conversions to native units are checked.
//! 2. Operations are atomic. Asset calls run inside a unit of work that
//!    reverts them if a later step fails.
//! 3. Time is injected and read once per call.
//! 4. Persistent state is serializable (serde) so a pool can be snapshotted
//!    and restored.

pub mod account_ledger;
pub mod custody_wallet;
pub mod deposit_address;
pub mod events;
pub mod ownership;
pub mod pool;
pub mod token_registry;
pub mod treasury;
pub mod unit_of_work;
pub mod withdraw_limit;

pub use pool::{DepositReceipt, LiquidityPool, PoolError, PoolSnapshot, WithdrawalReceipt};

//! Engine error type.

use crate::amount::FixedPointAmount;
use crate::state::{PoolId, UserId};

/// All errors returned by the staking engine.
///
/// Every failure is reported before anything is committed, so the engine state
/// after an `Err` is exactly the state before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    // ── Pool registry ────────────────────────────────────────────────────────
    /// `reward_rate_per_second` or `lock_duration_seconds` was zero.
    #[error("Invalid pool parameters: {0}")]
    InvalidPoolParameters(String),

    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    /// The pool is deactivated; existing positions may still withdraw and claim.
    #[error("Pool {0} is inactive; new stakes are not accepted")]
    PoolInactive(PoolId),

    // ── Position ledger ──────────────────────────────────────────────────────
    #[error("Stake of {amount} is below the pool minimum of {minimum}")]
    AmountTooLow {
        amount:  FixedPointAmount,
        minimum: FixedPointAmount,
    },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Withdrawal of {requested} exceeds staked balance {staked}")]
    InsufficientStake {
        requested: FixedPointAmount,
        staked:    FixedPointAmount,
    },

    #[error("No position for user {user} in pool {pool_id}")]
    PositionNotFound { pool_id: PoolId, user: UserId },

    /// The reward pool cannot cover the payout. Fatal to the call, not the pool.
    #[error("Reward pool of pool {pool_id} holds {available}, payout needs {required}")]
    InsufficientRewardPool {
        pool_id:   PoolId,
        required:  FixedPointAmount,
        available: FixedPointAmount,
    },

    #[error("Pool {0} stakes and rewards different tokens; compounding is not supported")]
    CompoundingNotSupported(PoolId),

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("Early-withdrawal fee of {0} bps exceeds 10000 bps")]
    InvalidFeeConfiguration(u16),

    // ── Clock ────────────────────────────────────────────────────────────────
    /// `now` is earlier than the pool's last accrual. A caller bug, not a
    /// business condition.
    #[error("Clock regression on pool {pool_id}: now={now} is before last accrual {last_accrual}")]
    ClockRegression {
        pool_id:      PoolId,
        now:          u64,
        last_accrual: u64,
    },

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Division by zero")]
    DivisionByZero,

    // ── Parsing ──────────────────────────────────────────────────────────────
    #[error("Cannot parse amount '{input}': {reason}")]
    ParseAmount { input: String, reason: String },
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, StakingError>;

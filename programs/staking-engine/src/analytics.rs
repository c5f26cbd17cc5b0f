//! Read-only pool metrics.
//!
//! Nothing here mutates engine state. Callers pass pools that were accrued to
//! a single snapshot instant (see `accumulator::peek`), so ratios between two
//! pools are never skewed by reading them at different times.
//!
//! Percentages are returned as `FixedPointAmount`s: `12.5` means 12.5 %.

use serde::Serialize;

use crate::amount::{FixedPointAmount, RewardPerShare};
use crate::constants::PERCENT;
use crate::error::Result;
use crate::state::{Pool, PoolId};

/// `rate × seconds_per_year × 100 / total_staked`, or 0 with nothing staked.
pub fn apr(pool: &Pool, seconds_per_year: u64) -> Result<FixedPointAmount> {
    if pool.total_staked.is_zero() {
        return Ok(FixedPointAmount::ZERO);
    }
    pool.reward_rate_per_second
        .checked_mul_int(seconds_per_year)?
        .checked_mul_int(PERCENT)?
        .div_floor(pool.total_staked)
}

/// APR when reward and staking tokens trade at different prices.
///
/// Prices are in any common quote unit. A zero staking price with a non-empty
/// pool is a `DivisionByZero`.
pub fn value_weighted_apr(
    pool: &Pool,
    reward_token_price: FixedPointAmount,
    staking_token_price: FixedPointAmount,
    seconds_per_year: u64,
) -> Result<FixedPointAmount> {
    if pool.total_staked.is_zero() {
        return Ok(FixedPointAmount::ZERO);
    }
    let yearly_rewards = pool.reward_rate_per_second.checked_mul_int(seconds_per_year)?;
    let reward_value = yearly_rewards.checked_mul(reward_token_price)?;
    let staked_value = pool.total_staked.checked_mul(staking_token_price)?;
    reward_value.checked_mul_int(PERCENT)?.div_floor(staked_value)
}

/// `pool.total_staked × 100 / reference.total_staked`; 0 for an empty reference.
pub fn utilization_rate(pool: &Pool, reference: &Pool) -> Result<FixedPointAmount> {
    if reference.total_staked.is_zero() {
        return Ok(FixedPointAmount::ZERO);
    }
    pool.total_staked
        .checked_mul_int(PERCENT)?
        .div_floor(reference.total_staked)
}

/// Reward a new stake of `amount` would earn over `duration_seconds`, assuming
/// the rest of the pool's stake stays as it is.
pub fn estimate_rewards(
    pool: &Pool,
    amount: FixedPointAmount,
    duration_seconds: u64,
) -> Result<FixedPointAmount> {
    if amount.is_zero() || duration_seconds == 0 {
        return Ok(FixedPointAmount::ZERO);
    }
    let emitted = pool.reward_rate_per_second.checked_mul_int(duration_seconds)?;
    let stake_after = pool.total_staked.checked_add(amount)?;
    FixedPointAmount::scaled_mul_div(emitted, amount, stake_after)
}

/// Point-in-time metrics for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolAnalytics {
    pub pool_id: PoolId,
    pub timestamp: u64,
    pub is_active: bool,
    pub total_staked: FixedPointAmount,
    pub reward_rate_per_second: FixedPointAmount,
    pub reward_pool_balance: FixedPointAmount,
    pub acc_reward_per_share: RewardPerShare,
    pub apr_percent: FixedPointAmount,
    pub stakers: usize,
    /// Seconds of emission the reward pool can still fund at the current rate,
    /// capped at `u64::MAX` for very slow pools
    pub funded_seconds: u64,
}

/// Build the metrics for `pool` (already accrued to `timestamp`).
pub fn pool_analytics(
    pool: &Pool,
    stakers: usize,
    timestamp: u64,
    seconds_per_year: u64,
) -> Result<PoolAnalytics> {
    let runway = pool.reward_pool_balance.quotient(pool.reward_rate_per_second)?;
    Ok(PoolAnalytics {
        pool_id:                pool.id,
        timestamp,
        is_active:              pool.is_active,
        total_staked:           pool.total_staked,
        reward_rate_per_second: pool.reward_rate_per_second,
        reward_pool_balance:    pool.reward_pool_balance,
        acc_reward_per_share:   pool.acc_reward_per_share,
        apr_percent:            apr(pool, seconds_per_year)?,
        stakers,
        funded_seconds:         u64::try_from(runway).unwrap_or(u64::MAX),
    })
}

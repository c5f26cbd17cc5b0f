//! Reward-per-share accumulator.
//!
//! Rewards stream at `reward_rate_per_second` and are split across stakers in
//! proportion to stake. Instead of touching every position on each tick, the
//! pool keeps a monotonic `acc_reward_per_share`, and each position remembers
//! the value it was last settled against (`reward_debt`):
//!
//! ```text
//! acc_reward_per_share += rate × elapsed × 1e36 / total_staked
//! pending               = staked × (acc_reward_per_share − reward_debt) / 1e36
//! ```
//!
//! The accumulator carries 36 decimals against the amounts' 18, so a sole
//! staker loses at most one base unit to rounding.
//!
//! Accrual is lazy: it runs at the start of every operation that touches the
//! pool, so the cost of an operation never depends on the number of stakers.

use tracing::{debug, error, warn};

use crate::amount::{FixedPointAmount, RewardPerShare};
use crate::error::{Result, StakingError};
use crate::state::{Pool, Position};

/// Seconds since the last accrual. `now` earlier than that is a caller bug.
fn elapsed_since_accrual(pool: &Pool, now: u64) -> Result<u64> {
    now.checked_sub(pool.last_accrual_timestamp).ok_or_else(|| {
        error!(
            pool_id = %pool.id,
            now,
            last_accrual = pool.last_accrual_timestamp,
            "clock regression: caller supplied a timestamp earlier than the last accrual"
        );
        StakingError::ClockRegression {
            pool_id:      pool.id,
            now,
            last_accrual: pool.last_accrual_timestamp,
        }
    })
}

/// Growth of `acc_reward_per_share` between the last accrual and `now`.
pub fn reward_per_share_delta(pool: &Pool, now: u64) -> Result<RewardPerShare> {
    let elapsed = elapsed_since_accrual(pool, now)?;
    if elapsed == 0 || pool.total_staked.is_zero() {
        return Ok(RewardPerShare::ZERO);
    }
    let reward = pool.reward_rate_per_second.checked_mul_int(elapsed)?;
    RewardPerShare::from_rewards(reward, pool.total_staked)
}

/// Advance the pool to `now`. A second call with the same `now` is a no-op.
///
/// Time that passes while nothing is staked distributes nothing.
pub fn accrue(pool: &mut Pool, now: u64) -> Result<()> {
    let delta = reward_per_share_delta(pool, now)?;
    if !delta.is_zero() {
        pool.acc_reward_per_share = pool.acc_reward_per_share.checked_add(delta)?;
        debug!(
            pool_id = %pool.id,
            delta = %delta,
            acc_reward_per_share = %pool.acc_reward_per_share,
            "accrued"
        );
    }
    pool.last_accrual_timestamp = now;
    Ok(())
}

/// Accrued copy of `pool` for read paths; the stored pool is left untouched.
pub fn peek(pool: &Pool, now: u64) -> Result<Pool> {
    let mut view = pool.clone();
    // Reads at a timestamp before the last write see the stored state.
    if now > view.last_accrual_timestamp {
        accrue(&mut view, now)?;
    }
    Ok(view)
}

/// Rewards earned by `position` since its last settlement.
///
/// Assumes `pool` has already been accrued to the instant of interest.
pub fn pending_rewards(pool: &Pool, position: &Position) -> Result<FixedPointAmount> {
    let growth = pool
        .acc_reward_per_share
        .checked_sub(position.reward_debt)?;
    growth.rewards_for(position.staked_amount)
}

/// What happened to the rewards released by a settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Added to `rewards_owed`
    pub credited: FixedPointAmount,
    /// Reinvested into `staked_amount`
    pub compounded: FixedPointAmount,
}

/// Move reward tokens from the reward pool into the position's stake.
///
/// Only legal for pools whose staking and reward token are the same.
pub fn compound(pool: &mut Pool, position: &mut Position, amount: FixedPointAmount) -> Result<()> {
    if amount > pool.reward_pool_balance {
        return Err(StakingError::InsufficientRewardPool {
            pool_id:   pool.id,
            required:  amount,
            available: pool.reward_pool_balance,
        });
    }
    pool.reward_pool_balance = pool.reward_pool_balance.checked_sub(amount)?;
    position.staked_amount = position.staked_amount.checked_add(amount)?;
    pool.total_staked = pool.total_staked.checked_add(amount)?;
    Ok(())
}

/// Settle pending rewards and checkpoint the position.
///
/// Call after `accrue` and before any change to `position.staked_amount`.
/// Compounding positions reinvest when the reward pool can fund it; if it
/// cannot, the reward is credited to `rewards_owed` instead so it is not lost.
pub fn settle(pool: &mut Pool, position: &mut Position) -> Result<Settlement> {
    let pending = pending_rewards(pool, position)?;
    position.reward_debt = pool.acc_reward_per_share;

    let mut settlement = Settlement::default();
    if pending.is_zero() {
        return Ok(settlement);
    }

    let wants_compound = position.is_compounding && pool.supports_compounding();
    if wants_compound && pending <= pool.reward_pool_balance {
        compound(pool, position, pending)?;
        settlement.compounded = pending;
    } else {
        if wants_compound {
            warn!(
                pool_id = %pool.id,
                pending = %pending,
                reward_pool_balance = %pool.reward_pool_balance,
                "reward pool cannot fund compounding, crediting rewards instead"
            );
        }
        position.rewards_owed = position.rewards_owed.checked_add(pending)?;
        settlement.credited = pending;
    }
    // Compounding grew the stake; re-checkpoint against the same accumulator.
    position.reward_debt = pool.acc_reward_per_share;
    Ok(settlement)
}

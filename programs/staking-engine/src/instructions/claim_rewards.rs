use serde::Serialize;
use tracing::info;

use crate::accumulator::{accrue, compound, pending_rewards};
use crate::amount::FixedPointAmount;
use crate::error::{Result, StakingError};
use crate::events::StakingEvent;
use crate::registry::PoolShard;
use crate::state::{PoolId, UserId};

use super::Outcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    pub pool_id: PoolId,
    pub user: UserId,
    /// Reward tokens owed to the caller, deducted from the reward pool
    pub paid: FixedPointAmount,
    /// Rewards added to the stake instead of being paid out
    pub compounded: FixedPointAmount,
    pub staked_amount: FixedPointAmount,
}

/// Pay out (or reinvest) everything the position has earned.
///
/// Compounding positions in single-token pools add the reward to their stake
/// without touching the lock. Either way the reward pool must cover the full
/// amount, otherwise the call fails with `InsufficientRewardPool` rather than
/// paying less.
pub fn handler(shard: &mut PoolShard, user: &UserId, now: u64) -> Result<Outcome<ClaimReceipt>> {
    let mut pool = shard.stage_pool();
    let mut position = match shard.position(user) {
        Some(p) => p.clone(),
        None => return Err(StakingError::PositionNotFound { pool_id: pool.id, user: user.clone() }),
    };

    accrue(&mut pool, now)?;
    let pending = pending_rewards(&pool, &position)?;
    position.reward_debt = pool.acc_reward_per_share;
    let total = position.rewards_owed.checked_add(pending)?;

    let mut receipt = ClaimReceipt {
        pool_id:       pool.id,
        user:          user.clone(),
        paid:          FixedPointAmount::ZERO,
        compounded:    FixedPointAmount::ZERO,
        staked_amount: position.staked_amount,
    };

    if total.is_zero() {
        info!(pool_id = %pool.id, user = %user, "no rewards to claim");
        shard.commit(pool, user, position);
        return Ok(Outcome::new(receipt, Vec::new()));
    }

    let event = if position.is_compounding && pool.supports_compounding() {
        compound(&mut pool, &mut position, total)?;
        receipt.compounded = total;
        info!(pool_id = %pool.id, user = %user, reward = %total, "rewards compounded");
        StakingEvent::RewardCompounded {
            pool_id:   pool.id,
            user:      user.clone(),
            reward:    total,
            timestamp: now,
        }
    } else {
        if total > pool.reward_pool_balance {
            return Err(StakingError::InsufficientRewardPool {
                pool_id:   pool.id,
                required:  total,
                available: pool.reward_pool_balance,
            });
        }
        pool.reward_pool_balance = pool.reward_pool_balance.checked_sub(total)?;
        receipt.paid = total;
        info!(pool_id = %pool.id, user = %user, reward = %total, "rewards paid");
        StakingEvent::RewardPaid {
            pool_id:   pool.id,
            user:      user.clone(),
            reward:    total,
            timestamp: now,
        }
    };

    position.rewards_owed = FixedPointAmount::ZERO;
    // Compounding grew the stake at the current accumulator value.
    position.reward_debt = pool.acc_reward_per_share;
    receipt.staked_amount = position.staked_amount;

    shard.commit(pool, user, position);
    Ok(Outcome::new(receipt, vec![event]))
}

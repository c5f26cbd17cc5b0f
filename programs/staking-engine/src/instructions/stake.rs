use serde::Serialize;
use tracing::info;

use crate::accumulator::{accrue, settle};
use crate::amount::FixedPointAmount;
use crate::error::{Result, StakingError};
use crate::events::StakingEvent;
use crate::registry::PoolShard;
use crate::state::{PoolId, UserId};

use super::Outcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeReceipt {
    pub pool_id: PoolId,
    pub user: UserId,
    pub amount: FixedPointAmount,
    /// Position stake after the deposit (and any compounding settlement)
    pub staked_amount: FixedPointAmount,
    pub lock_end_time: u64,
    /// Rewards settled into `rewards_owed` by this call
    pub rewards_credited: FixedPointAmount,
    /// Rewards reinvested by this call
    pub rewards_compounded: FixedPointAmount,
}

/// Deposit `amount` into the user's position, creating it on first stake.
///
/// Every stake restarts the lock: `lock_end_time = now + lock_duration`, also
/// for top-ups of a position that is already unlocked.
pub fn handler(
    shard: &mut PoolShard,
    engine_minimum: FixedPointAmount,
    user: &UserId,
    amount: FixedPointAmount,
    now: u64,
) -> Result<Outcome<StakeReceipt>> {
    let mut pool = shard.stage_pool();
    if !pool.is_active {
        return Err(StakingError::PoolInactive(pool.id));
    }
    let minimum = pool.effective_minimum(engine_minimum);
    if amount < minimum {
        return Err(StakingError::AmountTooLow { amount, minimum });
    }
    if amount.is_zero() {
        return Err(StakingError::ZeroAmount);
    }

    // Sync rewards then grow the position
    accrue(&mut pool, now)?;
    let mut position = shard.stage_position(user);
    let settlement = settle(&mut pool, &mut position)?;

    position.staked_amount = position.staked_amount.checked_add(amount)?;
    position.lock_end_time = now
        .checked_add(pool.lock_duration_seconds)
        .ok_or(StakingError::Overflow)?;
    pool.total_staked = pool.total_staked.checked_add(amount)?;

    let receipt = StakeReceipt {
        pool_id:            pool.id,
        user:               user.clone(),
        amount,
        staked_amount:      position.staked_amount,
        lock_end_time:      position.lock_end_time,
        rewards_credited:   settlement.credited,
        rewards_compounded: settlement.compounded,
    };

    let mut events = Vec::with_capacity(2);
    if !settlement.compounded.is_zero() {
        events.push(StakingEvent::RewardCompounded {
            pool_id:   pool.id,
            user:      user.clone(),
            reward:    settlement.compounded,
            timestamp: now,
        });
    }
    events.push(StakingEvent::Staked {
        pool_id:       pool.id,
        user:          user.clone(),
        amount,
        lock_end_time: position.lock_end_time,
        timestamp:     now,
    });

    info!(
        pool_id = %pool.id,
        user = %user,
        amount = %amount,
        staked = %position.staked_amount,
        lock_end_time = position.lock_end_time,
        "staked"
    );
    shard.commit(pool, user, position);
    Ok(Outcome::new(receipt, events))
}

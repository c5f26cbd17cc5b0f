use serde::Serialize;
use tracing::info;

use crate::accumulator::{accrue, settle};
use crate::amount::FixedPointAmount;
use crate::error::{Result, StakingError};
use crate::events::StakingEvent;
use crate::fee_policy::FeePolicy;
use crate::registry::PoolShard;
use crate::state::{PoolId, UserId};

use super::Outcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawReceipt {
    pub pool_id: PoolId,
    pub user: UserId,
    /// Amount removed from the stake
    pub gross: FixedPointAmount,
    /// Early-withdrawal fee retained by the pool
    pub fee: FixedPointAmount,
    /// Amount returned to the caller: `gross − fee`
    pub net: FixedPointAmount,
    pub remaining_stake: FixedPointAmount,
    pub rewards_credited: FixedPointAmount,
    pub rewards_compounded: FixedPointAmount,
}

/// Remove `amount` from the user's stake, charging the early-withdrawal fee
/// while the position is still locked.
///
/// The full `amount` leaves `total_staked`; the fee stays with the pool in
/// `collected_fees`. Settled rewards are credited, not paid (see claim).
pub fn handler(
    shard: &mut PoolShard,
    fee_policy: &FeePolicy,
    user: &UserId,
    amount: FixedPointAmount,
    now: u64,
) -> Result<Outcome<WithdrawReceipt>> {
    if amount.is_zero() {
        return Err(StakingError::ZeroAmount);
    }
    let staked = shard
        .position(user)
        .map(|p| p.staked_amount)
        .unwrap_or_default();
    if amount > staked {
        return Err(StakingError::InsufficientStake { requested: amount, staked });
    }

    let mut pool = shard.stage_pool();
    let mut position = shard.stage_position(user);
    accrue(&mut pool, now)?;
    let settlement = settle(&mut pool, &mut position)?;

    let fee = fee_policy.compute_fee(amount, now, position.lock_end_time)?;
    let net = amount.checked_sub(fee)?;

    position.staked_amount = position.staked_amount.checked_sub(amount)?;
    pool.total_staked = pool.total_staked.checked_sub(amount)?;
    pool.collected_fees = pool.collected_fees.checked_add(fee)?;

    let receipt = WithdrawReceipt {
        pool_id:            pool.id,
        user:               user.clone(),
        gross:              amount,
        fee,
        net,
        remaining_stake:    position.staked_amount,
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
    events.push(StakingEvent::Withdrawn {
        pool_id:   pool.id,
        user:      user.clone(),
        amount,
        fee,
        timestamp: now,
    });

    info!(
        pool_id = %pool.id,
        user = %user,
        gross = %amount,
        fee = %fee,
        locked = position.is_locked(now),
        "withdrawn"
    );
    shard.commit(pool, user, position);
    Ok(Outcome::new(receipt, events))
}

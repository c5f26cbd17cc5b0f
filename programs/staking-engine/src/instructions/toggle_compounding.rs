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
pub struct ToggleReceipt {
    pub pool_id: PoolId,
    pub user: UserId,
    pub is_compounding: bool,
    pub rewards_credited: FixedPointAmount,
    pub rewards_compounded: FixedPointAmount,
}

/// Flip the position's compounding flag.
///
/// Rewards earned so far are settled under the mode in force before the flip.
/// A user without a position gets one, so the preference can be set before
/// the first stake.
pub fn handler(shard: &mut PoolShard, user: &UserId, now: u64) -> Result<Outcome<ToggleReceipt>> {
    let mut pool = shard.stage_pool();
    if !pool.supports_compounding() {
        return Err(StakingError::CompoundingNotSupported(pool.id));
    }

    accrue(&mut pool, now)?;
    let mut position = shard.stage_position(user);
    let settlement = settle(&mut pool, &mut position)?;
    position.is_compounding = !position.is_compounding;

    let receipt = ToggleReceipt {
        pool_id:            pool.id,
        user:               user.clone(),
        is_compounding:     position.is_compounding,
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
    events.push(if position.is_compounding {
        StakingEvent::CompoundingEnabled { pool_id: pool.id, user: user.clone() }
    } else {
        StakingEvent::CompoundingDisabled { pool_id: pool.id, user: user.clone() }
    });

    info!(pool_id = %pool.id, user = %user, enabled = position.is_compounding, "compounding toggled");
    shard.commit(pool, user, position);
    Ok(Outcome::new(receipt, events))
}

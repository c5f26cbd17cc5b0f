//! Pool arena.
//!
//! Pools live in an append-only vector indexed by `PoolId`. Each pool and its
//! positions form a `PoolShard` behind its own mutex: operations on one pool
//! serialize, operations on different pools run in parallel. The outer
//! `RwLock` is only write-locked to append a new pool.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::amount::{FixedPointAmount, RewardPerShare};
use crate::error::{Result, StakingError};
use crate::state::{Pool, PoolId, Position, TokenId, UserId};

/// Arguments to [`PoolRegistry::create_pool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolParams {
    pub staking_token: TokenId,
    pub reward_token: TokenId,
    pub reward_rate_per_second: FixedPointAmount,
    pub lock_duration_seconds: u64,
    #[serde(default)]
    pub minimum_stake: Option<FixedPointAmount>,
}

// ─── Shard ─────────────────────────────────────────────────────────────────

/// One pool plus every position opened in it.
#[derive(Debug, Clone)]
pub struct PoolShard {
    pool: Pool,
    positions: HashMap<UserId, Position>,
}

impl PoolShard {
    fn new(pool: Pool) -> Self {
        Self { pool, positions: HashMap::new() }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn position(&self, user: &UserId) -> Option<&Position> {
        self.positions.get(user)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&UserId, &Position)> {
        self.positions.iter()
    }

    /// Positions currently holding a non-zero stake.
    pub fn staker_count(&self) -> usize {
        self.positions
            .values()
            .filter(|p| !p.staked_amount.is_zero())
            .count()
    }

    /// Working copy of the pool for a staged mutation.
    pub(crate) fn stage_pool(&self) -> Pool {
        self.pool.clone()
    }

    /// Working copy of a position; a fresh default one if the user never staked.
    pub(crate) fn stage_position(&self, user: &UserId) -> Position {
        self.positions.get(user).cloned().unwrap_or_default()
    }

    pub(crate) fn commit_pool(&mut self, pool: Pool) {
        self.pool = pool;
    }

    /// Install staged copies. Only called once every check has passed.
    pub(crate) fn commit(&mut self, pool: Pool, user: &UserId, position: Position) {
        self.pool = pool;
        self.positions.insert(user.clone(), position);
    }
}

// ─── Registry ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PoolRegistry {
    shards: RwLock<Vec<Arc<Mutex<PoolShard>>>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate parameters and append a new active pool. Returns its snapshot.
    pub fn create_pool(&self, params: CreatePoolParams, now: u64) -> Result<Pool> {
        if params.reward_rate_per_second.is_zero() {
            return Err(StakingError::InvalidPoolParameters(
                "reward_rate_per_second must be greater than zero".into(),
            ));
        }
        if params.lock_duration_seconds == 0 {
            return Err(StakingError::InvalidPoolParameters(
                "lock_duration_seconds must be greater than zero".into(),
            ));
        }

        let mut shards = self.shards.write();
        let id = PoolId(shards.len() as u64);
        let pool = Pool {
            id,
            staking_token:          params.staking_token,
            reward_token:           params.reward_token,
            reward_rate_per_second: params.reward_rate_per_second,
            lock_duration_seconds:  params.lock_duration_seconds,
            minimum_stake:          params.minimum_stake,
            is_active:              true,
            total_staked:           FixedPointAmount::ZERO,
            acc_reward_per_share:   RewardPerShare::ZERO,
            last_accrual_timestamp: now,
            reward_pool_balance:    FixedPointAmount::ZERO,
            collected_fees:         FixedPointAmount::ZERO,
            created_at:             now,
        };
        shards.push(Arc::new(Mutex::new(PoolShard::new(pool.clone()))));

        info!(
            pool_id = %id,
            staking_token = %pool.staking_token,
            reward_token = %pool.reward_token,
            rate = %pool.reward_rate_per_second,
            lock = pool.lock_duration_seconds,
            "pool created"
        );
        Ok(pool)
    }

    fn shard(&self, id: PoolId) -> Result<Arc<Mutex<PoolShard>>> {
        let shards = self.shards.read();
        usize::try_from(id.0)
            .ok()
            .and_then(|i| shards.get(i))
            .cloned()
            .ok_or(StakingError::PoolNotFound(id))
    }

    /// Run `f` with the pool's lock held for reading.
    pub fn with_pool<R>(&self, id: PoolId, f: impl FnOnce(&PoolShard) -> Result<R>) -> Result<R> {
        let shard = self.shard(id)?;
        let guard = shard.lock();
        f(&guard)
    }

    /// Run `f` with exclusive access to the pool and its positions.
    pub fn with_pool_mut<R>(
        &self,
        id: PoolId,
        f: impl FnOnce(&mut PoolShard) -> Result<R>,
    ) -> Result<R> {
        let shard = self.shard(id)?;
        let mut guard = shard.lock();
        f(&mut guard)
    }

    /// Hold both pools' locks at once so the two reads come from one instant.
    ///
    /// Locks are taken in ascending id order.
    pub fn with_pool_pair<R>(
        &self,
        a: PoolId,
        b: PoolId,
        f: impl FnOnce(&PoolShard, &PoolShard) -> Result<R>,
    ) -> Result<R> {
        if a == b {
            return self.with_pool(a, |shard| f(shard, shard));
        }
        let shard_a = self.shard(a)?;
        let shard_b = self.shard(b)?;
        if a < b {
            let guard_a = shard_a.lock();
            let guard_b = shard_b.lock();
            f(&guard_a, &guard_b)
        } else {
            let guard_b = shard_b.lock();
            let guard_a = shard_a.lock();
            f(&guard_a, &guard_b)
        }
    }

    pub fn get_pool(&self, id: PoolId) -> Result<Pool> {
        self.with_pool(id, |shard| Ok(shard.pool().clone()))
    }

    /// Top up the funds rewards are paid from. Allowed at any time.
    pub fn fund_reward_pool(&self, id: PoolId, amount: FixedPointAmount) -> Result<Pool> {
        if amount.is_zero() {
            return Err(StakingError::ZeroAmount);
        }
        self.with_pool_mut(id, |shard| {
            let mut pool = shard.stage_pool();
            pool.reward_pool_balance = pool.reward_pool_balance.checked_add(amount)?;
            shard.commit_pool(pool.clone());
            info!(pool_id = %id, amount = %amount, balance = %pool.reward_pool_balance, "reward pool funded");
            Ok(pool)
        })
    }

    /// Toggle whether new stakes are accepted. Existing positions are unaffected.
    pub fn set_active(&self, id: PoolId, active: bool) -> Result<Pool> {
        self.with_pool_mut(id, |shard| {
            let mut pool = shard.stage_pool();
            pool.is_active = active;
            shard.commit_pool(pool.clone());
            info!(pool_id = %id, active, "pool status changed");
            Ok(pool)
        })
    }

    pub fn pool_count(&self) -> usize {
        self.shards.read().len()
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        (0..self.pool_count() as u64).map(PoolId).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(rate: u64, lock: u64) -> CreatePoolParams {
        CreatePoolParams {
            staking_token:          TokenId::from("STK"),
            reward_token:           TokenId::from("RWD"),
            reward_rate_per_second: FixedPointAmount::from_tokens(rate),
            lock_duration_seconds:  lock,
            minimum_stake:          None,
        }
    }

    #[test]
    fn assigns_sequential_ids() {
        let registry = PoolRegistry::new();
        let a = registry.create_pool(params(1, 60), 10).unwrap();
        let b = registry.create_pool(params(2, 60), 20).unwrap();
        assert_eq!(a.id, PoolId(0));
        assert_eq!(b.id, PoolId(1));
        assert_eq!(b.last_accrual_timestamp, 20);
        assert!(b.is_active);
        assert_eq!(registry.pool_ids(), vec![PoolId(0), PoolId(1)]);
    }

    #[test]
    fn rejects_zero_rate_or_lock() {
        let registry = PoolRegistry::new();
        assert!(matches!(
            registry.create_pool(params(0, 60), 0),
            Err(StakingError::InvalidPoolParameters(_))
        ));
        assert!(matches!(
            registry.create_pool(params(1, 0), 0),
            Err(StakingError::InvalidPoolParameters(_))
        ));
        assert_eq!(registry.pool_count(), 0);
    }

    #[test]
    fn unknown_pool_is_not_found() {
        let registry = PoolRegistry::new();
        assert_eq!(registry.get_pool(PoolId(7)), Err(StakingError::PoolNotFound(PoolId(7))));
    }

    #[test]
    fn funding_and_status_toggle() {
        let registry = PoolRegistry::new();
        let id = registry.create_pool(params(1, 60), 0).unwrap().id;
        registry.fund_reward_pool(id, FixedPointAmount::from_tokens(5)).unwrap();
        let pool = registry.fund_reward_pool(id, FixedPointAmount::from_tokens(7)).unwrap();
        assert_eq!(pool.reward_pool_balance, FixedPointAmount::from_tokens(12));
        assert_eq!(registry.fund_reward_pool(id, FixedPointAmount::ZERO), Err(StakingError::ZeroAmount));

        assert!(!registry.set_active(id, false).unwrap().is_active);
        assert!(registry.set_active(id, true).unwrap().is_active);
    }
}

//! [`StakingEngine`]: the entry point for relays, read models and tools.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::accumulator::{accrue, peek, pending_rewards};
use crate::amount::FixedPointAmount;
use crate::analytics::{self, PoolAnalytics};
use crate::config::EngineConfig;
use crate::error::{Result, StakingError};
use crate::events::{EventSink, StakingEvent};
use crate::fee_policy::FeePolicy;
use crate::instructions::{
    claim_rewards, stake, toggle_compounding, withdraw, ClaimReceipt, Outcome, StakeReceipt,
    ToggleReceipt, WithdrawReceipt,
};
use crate::registry::{CreatePoolParams, PoolRegistry};
use crate::state::{Pool, PoolId, PositionInfo, UserId};

/// Deterministic single-writer-per-pool staking engine.
///
/// `now` is always supplied by the caller, so replaying the same calls with
/// the same timestamps reproduces the same state bit for bit.
///
/// ```rust
/// use staking_engine::{CreatePoolParams, EngineConfig, FixedPointAmount, StakingEngine, UserId};
///
/// # fn main() -> Result<(), staking_engine::StakingError> {
/// let engine = StakingEngine::new(EngineConfig::default())?;
/// let pool = engine.create_pool(CreatePoolParams {
///     staking_token:          "STK".into(),
///     reward_token:           "RWD".into(),
///     reward_rate_per_second: "0.1".parse()?,
///     lock_duration_seconds:  7 * 24 * 60 * 60,
///     minimum_stake:          None,
/// }, 0)?;
/// engine.fund_reward_pool(pool, FixedPointAmount::from_tokens(500_000))?;
///
/// let alice = UserId::from("alice");
/// engine.stake(pool, &alice, FixedPointAmount::from_tokens(1000), 0)?;
/// let pending = engine.pending_rewards(pool, &alice, 86_400)?;
/// assert_eq!(pending, FixedPointAmount::from_tokens(8640));
/// # Ok(())
/// # }
/// ```
pub struct StakingEngine {
    config: EngineConfig,
    fee_policy: FeePolicy,
    registry: PoolRegistry,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl StakingEngine {
    /// Fails with `InvalidFeeConfiguration` for a fee above 10_000 bps.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let fee_policy = FeePolicy::new(config.early_withdraw_fee_bps)?;
        Ok(Self {
            config,
            fee_policy,
            registry: PoolRegistry::new(),
            sinks: RwLock::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fee_policy
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    /// Register a sink for every fact committed from now on.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    fn publish(&self, events: &[StakingEvent]) {
        let sinks = self.sinks.read();
        for event in events {
            debug!(event = event.name(), pool_id = %event.pool_id(), "publishing");
            for sink in sinks.iter() {
                sink.publish(event);
            }
        }
    }

    fn finish<T>(&self, outcome: Outcome<T>) -> T {
        self.publish(&outcome.events);
        outcome.receipt
    }

    // ── Pool registry ─────────────────────────────────────────────────────────

    pub fn create_pool(&self, params: CreatePoolParams, now: u64) -> Result<PoolId> {
        let pool = self.registry.create_pool(params, now)?;
        self.publish(&[StakingEvent::PoolCreated {
            pool_id:                pool.id,
            staking_token:          pool.staking_token,
            reward_token:           pool.reward_token,
            reward_rate_per_second: pool.reward_rate_per_second,
            lock_duration_seconds:  pool.lock_duration_seconds,
            timestamp:              now,
        }]);
        Ok(pool.id)
    }

    /// Stored pool state, as of its last accrual.
    pub fn get_pool(&self, pool_id: PoolId) -> Result<Pool> {
        self.registry.get_pool(pool_id)
    }

    /// Pool state accrued to `now` without persisting the accrual.
    pub fn get_pool_info(&self, pool_id: PoolId, now: u64) -> Result<Pool> {
        self.registry.with_pool(pool_id, |shard| peek(shard.pool(), now))
    }

    /// Returns the new reward pool balance.
    pub fn fund_reward_pool(&self, pool_id: PoolId, amount: FixedPointAmount) -> Result<FixedPointAmount> {
        let pool = self.registry.fund_reward_pool(pool_id, amount)?;
        self.publish(&[StakingEvent::RewardPoolFunded {
            pool_id,
            amount,
            balance: pool.reward_pool_balance,
        }]);
        Ok(pool.reward_pool_balance)
    }

    pub fn set_active(&self, pool_id: PoolId, active: bool) -> Result<()> {
        self.registry.set_active(pool_id, active)?;
        self.publish(&[StakingEvent::PoolStatusChanged { pool_id, is_active: active }]);
        Ok(())
    }

    /// Persist accrual up to `now` without any other change.
    pub fn accrue(&self, pool_id: PoolId, now: u64) -> Result<Pool> {
        self.registry.with_pool_mut(pool_id, |shard| {
            let mut pool = shard.stage_pool();
            accrue(&mut pool, now)?;
            shard.commit_pool(pool.clone());
            Ok(pool)
        })
    }

    // ── Position ledger ───────────────────────────────────────────────────────

    pub fn stake(
        &self,
        pool_id: PoolId,
        user: &UserId,
        amount: FixedPointAmount,
        now: u64,
    ) -> Result<StakeReceipt> {
        let minimum = self.config.minimum_stake;
        let outcome = self
            .registry
            .with_pool_mut(pool_id, |shard| stake::handler(shard, minimum, user, amount, now))?;
        Ok(self.finish(outcome))
    }

    pub fn withdraw(
        &self,
        pool_id: PoolId,
        user: &UserId,
        amount: FixedPointAmount,
        now: u64,
    ) -> Result<WithdrawReceipt> {
        let policy = self.fee_policy;
        let outcome = self
            .registry
            .with_pool_mut(pool_id, |shard| withdraw::handler(shard, &policy, user, amount, now))?;
        Ok(self.finish(outcome))
    }

    pub fn claim_rewards(&self, pool_id: PoolId, user: &UserId, now: u64) -> Result<ClaimReceipt> {
        let outcome = self
            .registry
            .with_pool_mut(pool_id, |shard| claim_rewards::handler(shard, user, now))?;
        Ok(self.finish(outcome))
    }

    pub fn toggle_compounding(&self, pool_id: PoolId, user: &UserId, now: u64) -> Result<ToggleReceipt> {
        let outcome = self
            .registry
            .with_pool_mut(pool_id, |shard| toggle_compounding::handler(shard, user, now))?;
        Ok(self.finish(outcome))
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// Everything the user could claim at `now`: owed plus newly accrued.
    /// Zero for users without a position.
    pub fn pending_rewards(&self, pool_id: PoolId, user: &UserId, now: u64) -> Result<FixedPointAmount> {
        self.registry.with_pool(pool_id, |shard| {
            let Some(position) = shard.position(user) else {
                return Ok(FixedPointAmount::ZERO);
            };
            let view = peek(shard.pool(), now)?;
            position.rewards_owed.checked_add(pending_rewards(&view, position)?)
        })
    }

    pub fn get_user_info(&self, pool_id: PoolId, user: &UserId, now: u64) -> Result<PositionInfo> {
        self.registry.with_pool(pool_id, |shard| {
            let position = shard.position(user).ok_or_else(|| StakingError::PositionNotFound {
                pool_id,
                user: user.clone(),
            })?;
            let view = peek(shard.pool(), now)?;
            Ok(PositionInfo {
                pool_id,
                user:           user.clone(),
                staked_amount:  position.staked_amount,
                rewards:        position.rewards_owed.checked_add(pending_rewards(&view, position)?)?,
                lock_end_time:  position.lock_end_time,
                is_locked:      position.is_locked(now),
                is_compounding: position.is_compounding,
            })
        })
    }

    /// Pools in which the user has ever opened a position.
    pub fn get_user_pools(&self, user: &UserId) -> Vec<PoolId> {
        self.registry
            .pool_ids()
            .into_iter()
            .filter(|&id| {
                self.registry
                    .with_pool(id, |shard| Ok(shard.position(user).is_some()))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn total_stakers(&self, pool_id: PoolId) -> Result<usize> {
        self.registry.with_pool(pool_id, |shard| Ok(shard.staker_count()))
    }

    // ── Analytics ─────────────────────────────────────────────────────────────

    pub fn apr(&self, pool_id: PoolId, now: u64) -> Result<FixedPointAmount> {
        let pool = self.get_pool_info(pool_id, now)?;
        analytics::apr(&pool, self.config.seconds_per_year)
    }

    pub fn value_weighted_apr(
        &self,
        pool_id: PoolId,
        reward_token_price: FixedPointAmount,
        staking_token_price: FixedPointAmount,
        now: u64,
    ) -> Result<FixedPointAmount> {
        let pool = self.get_pool_info(pool_id, now)?;
        analytics::value_weighted_apr(
            &pool,
            reward_token_price,
            staking_token_price,
            self.config.seconds_per_year,
        )
    }

    /// Both pools are read under their locks at the same `now`.
    pub fn utilization_rate(&self, pool_id: PoolId, reference: PoolId, now: u64) -> Result<FixedPointAmount> {
        self.registry.with_pool_pair(pool_id, reference, |shard, reference_shard| {
            let pool = peek(shard.pool(), now)?;
            let reference = peek(reference_shard.pool(), now)?;
            analytics::utilization_rate(&pool, &reference)
        })
    }

    pub fn estimate_rewards(
        &self,
        pool_id: PoolId,
        amount: FixedPointAmount,
        duration_seconds: u64,
        now: u64,
    ) -> Result<FixedPointAmount> {
        let pool = self.get_pool_info(pool_id, now)?;
        analytics::estimate_rewards(&pool, amount, duration_seconds)
    }

    pub fn pool_analytics(&self, pool_id: PoolId, now: u64) -> Result<PoolAnalytics> {
        let seconds_per_year = self.config.seconds_per_year;
        self.registry.with_pool(pool_id, |shard| {
            let pool = peek(shard.pool(), now)?;
            analytics::pool_analytics(&pool, shard.staker_count(), now, seconds_per_year)
        })
    }
}

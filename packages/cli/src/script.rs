//! Replay scenarios: a JSON list of engine calls driven by a virtual clock.
//!
//! ```json
//! {
//!   "config": { "minimumStake": "100", "earlyWithdrawFeeBps": 500 },
//!   "steps": [
//!     { "op": "create_pool", "stakingToken": "STK", "rewardToken": "RWD",
//!       "rewardRatePerSecond": "0.1", "lockDurationSeconds": 604800 },
//!     { "op": "fund", "pool": 0, "amount": "500000" },
//!     { "op": "stake", "pool": 0, "user": "alice", "amount": "1000" },
//!     { "op": "advance", "seconds": 86400 },
//!     { "op": "claim", "pool": 0, "user": "alice" }
//!   ]
//! }
//! ```

use std::collections::BTreeSet;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use staking_engine::{
    CreatePoolParams, EngineConfig, FixedPointAmount, PoolId, StakingEngine, StakingError, UserId,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub config: Option<EngineConfig>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Step {
    CreatePool(CreatePoolParams),
    Fund { pool: PoolId, amount: FixedPointAmount },
    SetActive { pool: PoolId, active: bool },
    Stake { pool: PoolId, user: UserId, amount: FixedPointAmount },
    Withdraw { pool: PoolId, user: UserId, amount: FixedPointAmount },
    Claim { pool: PoolId, user: UserId },
    ToggleCompounding { pool: PoolId, user: UserId },
    /// Move the clock forward
    Advance { seconds: u64 },
    /// Jump the clock to an absolute timestamp; going back is allowed so
    /// clock-regression handling can be replayed
    At { timestamp: u64 },
    UserInfo { pool: PoolId, user: UserId },
    Analytics { pool: PoolId },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CreatePool(_) => "create_pool",
            Step::Fund { .. } => "fund",
            Step::SetActive { .. } => "set_active",
            Step::Stake { .. } => "stake",
            Step::Withdraw { .. } => "withdraw",
            Step::Claim { .. } => "claim",
            Step::ToggleCompounding { .. } => "toggle_compounding",
            Step::Advance { .. } => "advance",
            Step::At { .. } => "at",
            Step::UserInfo { .. } => "user_info",
            Step::Analytics { .. } => "analytics",
        }
    }
}

/// Runs steps against one engine and remembers who touched which pool.
pub struct Replay<'a> {
    engine: &'a StakingEngine,
    now: u64,
    pools: BTreeSet<PoolId>,
    users: BTreeSet<(PoolId, UserId)>,
}

impl<'a> Replay<'a> {
    pub fn new(engine: &'a StakingEngine) -> Self {
        Self { engine, now: 0, pools: BTreeSet::new(), users: BTreeSet::new() }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Execute one step and return its receipt as JSON.
    pub fn apply(&mut self, step: &Step) -> Result<Value> {
        let engine = self.engine;
        let now = self.now;
        let receipt = match step {
            Step::CreatePool(params) => {
                let id = engine.create_pool(params.clone(), now)?;
                self.pools.insert(id);
                json!({ "poolId": id })
            }
            Step::Fund { pool, amount } => {
                let balance = engine.fund_reward_pool(*pool, *amount)?;
                json!({ "poolId": pool, "rewardPoolBalance": balance })
            }
            Step::SetActive { pool, active } => {
                engine.set_active(*pool, *active)?;
                json!({ "poolId": pool, "isActive": active })
            }
            Step::Stake { pool, user, amount } => {
                let r = engine.stake(*pool, user, *amount, now)?;
                self.users.insert((*pool, user.clone()));
                to_value(&r)?
            }
            Step::Withdraw { pool, user, amount } => to_value(&engine.withdraw(*pool, user, *amount, now)?)?,
            Step::Claim { pool, user } => to_value(&engine.claim_rewards(*pool, user, now)?)?,
            Step::ToggleCompounding { pool, user } => {
                let r = engine.toggle_compounding(*pool, user, now)?;
                self.users.insert((*pool, user.clone()));
                to_value(&r)?
            }
            Step::Advance { seconds } => {
                self.now = now.checked_add(*seconds).ok_or(StakingError::Overflow)?;
                json!({ "now": self.now })
            }
            Step::At { timestamp } => {
                self.now = *timestamp;
                json!({ "now": self.now })
            }
            Step::UserInfo { pool, user } => to_value(&engine.get_user_info(*pool, user, now)?)?,
            Step::Analytics { pool } => to_value(&engine.pool_analytics(*pool, now)?)?,
        };
        Ok(receipt)
    }

    /// Analytics for every created pool and info for every known position,
    /// all read at the current clock.
    pub fn summary(&self) -> Result<Value> {
        let mut pools = Vec::with_capacity(self.pools.len());
        for &id in &self.pools {
            let analytics = self.engine.pool_analytics(id, self.now)?;
            let collected_fees = self.engine.get_pool(id)?.collected_fees;
            pools.push(json!({ "analytics": analytics, "collectedFees": collected_fees }));
        }
        let mut positions = Vec::with_capacity(self.users.len());
        for (pool, user) in &self.users {
            positions.push(to_value(&self.engine.get_user_info(*pool, user, self.now)?)?);
        }
        Ok(json!({ "now": self.now, "pools": pools, "positions": positions }))
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "config": { "minimumStake": "100" },
        "steps": [
            { "op": "create_pool", "stakingToken": "STK", "rewardToken": "RWD",
              "rewardRatePerSecond": "0.1", "lockDurationSeconds": 604800 },
            { "op": "fund", "pool": 0, "amount": "500000" },
            { "op": "stake", "pool": 0, "user": "alice", "amount": "1000" },
            { "op": "advance", "seconds": 86400 },
            { "op": "claim", "pool": 0, "user": "alice" }
        ]
    }"#;

    #[test]
    fn parses_tagged_steps() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let config = scenario.config.unwrap();
        assert_eq!(config.minimum_stake, FixedPointAmount::from_tokens(100));
        assert_eq!(config.early_withdraw_fee_bps, 500);
        let names: Vec<_> = scenario.steps.iter().map(Step::name).collect();
        assert_eq!(names, ["create_pool", "fund", "stake", "advance", "claim"]);
    }

    #[test]
    fn replays_one_day_claim() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let engine = StakingEngine::new(scenario.config.unwrap_or_default()).unwrap();
        let mut replay = Replay::new(&engine);

        let mut last = Value::Null;
        for step in &scenario.steps {
            last = replay.apply(step).unwrap();
        }
        assert_eq!(replay.now(), 86_400);
        assert_eq!(last["paid"], json!("8640"));

        let summary = replay.summary().unwrap();
        assert_eq!(summary["pools"][0]["analytics"]["rewardPoolBalance"], json!("491360"));
        assert_eq!(summary["positions"][0]["stakedAmount"], json!("1000"));
    }

    #[test]
    fn summary_survives_slow_pools() {
        let engine = StakingEngine::new(EngineConfig::default()).unwrap();
        let mut replay = Replay::new(&engine);
        let steps: Vec<Step> = serde_json::from_str(
            r#"[
                { "op": "create_pool", "stakingToken": "STK", "rewardToken": "RWD",
                  "rewardRatePerSecond": "0.000000000000000001", "lockDurationSeconds": 60 },
                { "op": "fund", "pool": 0, "amount": "100" }
            ]"#,
        )
        .unwrap();
        for step in &steps {
            replay.apply(step).unwrap();
        }
        let summary = replay.summary().unwrap();
        assert_eq!(summary["pools"][0]["analytics"]["fundedSeconds"], json!(u64::MAX));
    }

    #[test]
    fn failing_step_reports_engine_error() {
        let engine = StakingEngine::new(EngineConfig::default()).unwrap();
        let mut replay = Replay::new(&engine);
        let err = replay
            .apply(&Step::Claim { pool: PoolId(3), user: UserId::from("bob") })
            .unwrap_err();
        assert_eq!(err.downcast_ref::<StakingError>(), Some(&StakingError::PoolNotFound(PoolId(3))));
    }
}

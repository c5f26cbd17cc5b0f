use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::{FixedPointAmount, RewardPerShare};

// ─── Identifiers ───────────────────────────────────────────────────────────

/// Sequential pool id, assigned by the registry at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub u64);

/// Opaque user identity. Signature checks happen upstream of the engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Opaque token identifier (mint, contract address, symbol…).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ─── Pool ──────────────────────────────────────────────────────────────────
// One staking configuration plus its aggregate accounting.
// Never deleted; deactivation only blocks new stakes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: PoolId,
    pub staking_token: TokenId,
    pub reward_token: TokenId,
    /// Reward tokens released per second across all stakers
    pub reward_rate_per_second: FixedPointAmount,
    pub lock_duration_seconds: u64,
    /// Overrides the engine-wide minimum when set
    pub minimum_stake: Option<FixedPointAmount>,
    pub is_active: bool,
    pub total_staked: FixedPointAmount,
    /// Cumulative reward per staked token. Never decreases.
    pub acc_reward_per_share: RewardPerShare,
    pub last_accrual_timestamp: u64,
    /// Funds available to pay rewards out
    pub reward_pool_balance: FixedPointAmount,
    /// Early-withdrawal fees retained by the pool
    pub collected_fees: FixedPointAmount,
    pub created_at: u64,
}

impl Pool {
    /// Compounding needs rewards paid in the staked token.
    pub fn supports_compounding(&self) -> bool {
        self.staking_token == self.reward_token
    }

    pub fn effective_minimum(&self, engine_minimum: FixedPointAmount) -> FixedPointAmount {
        self.minimum_stake.unwrap_or(engine_minimum)
    }
}

// ─── Position ──────────────────────────────────────────────────────────────
// One user's stake in one pool, keyed by (pool_id, user).
// Created lazily on first stake; never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub staked_amount: FixedPointAmount,
    /// `acc_reward_per_share` value at last settlement
    pub reward_debt: RewardPerShare,
    /// Settled but unpaid rewards
    pub rewards_owed: FixedPointAmount,
    /// Absolute timestamp; reset by every explicit stake
    pub lock_end_time: u64,
    pub is_compounding: bool,
}

impl Position {
    pub fn is_locked(&self, now: u64) -> bool {
        now < self.lock_end_time
    }
}

// ─── Read models ───────────────────────────────────────────────────────────

/// Snapshot of one position as served to read-model consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    pub pool_id: PoolId,
    pub user: UserId,
    pub staked_amount: FixedPointAmount,
    /// Owed plus pending rewards as of the query timestamp
    pub rewards: FixedPointAmount,
    pub lock_end_time: u64,
    pub is_locked: bool,
    pub is_compounding: bool,
}

//! Output fact stream.
//!
//! The engine publishes one [`StakingEvent`] per committed state transition to
//! every registered [`EventSink`]. Publishing happens after the mutation is
//! committed and the pool lock is released; sinks never see rolled-back work.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::amount::FixedPointAmount;
use crate::state::{PoolId, TokenId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StakingEvent {
    PoolCreated {
        pool_id: PoolId,
        staking_token: TokenId,
        reward_token: TokenId,
        reward_rate_per_second: FixedPointAmount,
        lock_duration_seconds: u64,
        timestamp: u64,
    },
    RewardPoolFunded {
        pool_id: PoolId,
        amount: FixedPointAmount,
        balance: FixedPointAmount,
    },
    PoolStatusChanged {
        pool_id: PoolId,
        is_active: bool,
    },
    Staked {
        pool_id: PoolId,
        user: UserId,
        amount: FixedPointAmount,
        lock_end_time: u64,
        timestamp: u64,
    },
    Withdrawn {
        pool_id: PoolId,
        user: UserId,
        /// Amount leaving the staked base, fee included
        amount: FixedPointAmount,
        fee: FixedPointAmount,
        timestamp: u64,
    },
    RewardPaid {
        pool_id: PoolId,
        user: UserId,
        reward: FixedPointAmount,
        timestamp: u64,
    },
    RewardCompounded {
        pool_id: PoolId,
        user: UserId,
        reward: FixedPointAmount,
        timestamp: u64,
    },
    CompoundingEnabled {
        pool_id: PoolId,
        user: UserId,
    },
    CompoundingDisabled {
        pool_id: PoolId,
        user: UserId,
    },
}

impl StakingEvent {
    pub fn pool_id(&self) -> PoolId {
        match self {
            Self::PoolCreated { pool_id, .. }
            | Self::RewardPoolFunded { pool_id, .. }
            | Self::PoolStatusChanged { pool_id, .. }
            | Self::Staked { pool_id, .. }
            | Self::Withdrawn { pool_id, .. }
            | Self::RewardPaid { pool_id, .. }
            | Self::RewardCompounded { pool_id, .. }
            | Self::CompoundingEnabled { pool_id, .. }
            | Self::CompoundingDisabled { pool_id, .. } => *pool_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PoolCreated { .. } => "PoolCreated",
            Self::RewardPoolFunded { .. } => "RewardPoolFunded",
            Self::PoolStatusChanged { .. } => "PoolStatusChanged",
            Self::Staked { .. } => "Staked",
            Self::Withdrawn { .. } => "Withdrawn",
            Self::RewardPaid { .. } => "RewardPaid",
            Self::RewardCompounded { .. } => "RewardCompounded",
            Self::CompoundingEnabled { .. } => "CompoundingEnabled",
            Self::CompoundingDisabled { .. } => "CompoundingDisabled",
        }
    }
}

/// Receiver of committed facts. Each fact is delivered once, after its call
/// has committed. Facts from one call arrive together and in emission order;
/// facts from concurrent calls, even on the same pool, may interleave.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &StakingEvent);
}

// ─── Sinks ─────────────────────────────────────────────────────────────────

/// Logs every fact as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &StakingEvent) {
        let payload = serde_json::to_string(event).unwrap_or_else(|e| e.to_string());
        info!(target: "staking_engine::events", event = event.name(), pool_id = %event.pool_id(), %payload);
    }
}

/// Forwards facts into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StakingEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<StakingEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: &StakingEvent) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

/// Channel sink plus its receiving half.
pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<StakingEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink::new(tx), rx)
}

/// Keeps every fact in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<StakingEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StakingEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<StakingEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &StakingEvent) {
        self.events.lock().push(event.clone());
    }
}

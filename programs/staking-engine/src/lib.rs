//! Staking-pool accounting engine.
//!
//! Tracks staked balances per pool, streams rewards over time with a
//! reward-per-share accumulator, enforces lock periods with an
//! early-withdrawal fee, and lets single-token pools compound rewards.
//!
//! Operations:
//!   create_pool: register a pool (staking token, reward token, rate, lock)
//!   fund_reward_pool: top up the balance rewards are paid from
//!   set_active: stop or resume accepting new stakes
//!   stake: deposit; restarts the lock
//!   withdraw: remove stake; fee while locked
//!   claim_rewards: pay out, or reinvest when compounding
//!   toggle_compounding: opt in/out of reinvesting (single-token pools only)
//!
//! All arithmetic is exact 18-decimal fixed point on 256-bit integers. The
//! engine never reads a clock: every operation takes `now` from the caller.
//!
//! | Read | Description |
//! |------|-------------|
//! | [`StakingEngine::get_pool_info`] | Pool state accrued to a timestamp |
//! | [`StakingEngine::get_user_info`] | Stake, claimable rewards, lock state |
//! | [`StakingEngine::pending_rewards`] | Claimable rewards at a timestamp |
//! | [`StakingEngine::pool_analytics`] | APR, stakers, funded runway |
//! | [`StakingEngine::utilization_rate`] | Stake of one pool relative to another |

pub mod accumulator;
pub mod amount;
pub mod analytics;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod fee_policy;
pub mod instructions;
pub mod registry;
pub mod state;

pub use amount::{FixedPointAmount, RewardPerShare};
pub use analytics::PoolAnalytics;
pub use config::EngineConfig;
pub use engine::StakingEngine;
pub use error::{Result, StakingError};
pub use events::{channel, ChannelSink, EventSink, MemorySink, StakingEvent, TracingSink};
pub use fee_policy::FeePolicy;
pub use instructions::{ClaimReceipt, StakeReceipt, ToggleReceipt, WithdrawReceipt};
pub use registry::{CreatePoolParams, PoolRegistry};
pub use state::{Pool, PoolId, Position, PositionInfo, TokenId, UserId};

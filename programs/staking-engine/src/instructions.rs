//! Position ledger.
//!
//! Every operation follows the same discipline: stage copies of the pool and
//! the position, accrue the pool to `now`, settle the position, apply the
//! change, and commit the copies only once every check has passed. A failed
//! call leaves the shard exactly as it found it.

use serde::Serialize;

use crate::events::StakingEvent;

pub mod stake;
pub mod withdraw;
pub mod claim_rewards;
pub mod toggle_compounding;

pub use stake::StakeReceipt;
pub use withdraw::WithdrawReceipt;
pub use claim_rewards::ClaimReceipt;
pub use toggle_compounding::ToggleReceipt;

/// Result of a committed ledger operation plus the facts it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub receipt: T,
    #[serde(skip)]
    pub events: Vec<StakingEvent>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(receipt: T, events: Vec<StakingEvent>) -> Self {
        Self { receipt, events }
    }
}

//! Engine-wide configuration, fixed at construction.

use serde::{Deserialize, Serialize};

use crate::amount::FixedPointAmount;
use crate::constants::{DEFAULT_EARLY_WITHDRAW_FEE_BPS, MAX_FEE_BPS, SECONDS_PER_YEAR};
use crate::error::{Result, StakingError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Smallest accepted stake for pools without their own minimum.
    /// Zero still rejects zero-amount stakes.
    pub minimum_stake: FixedPointAmount,
    /// Penalty on withdrawals made before the lock ends, in basis points
    pub early_withdraw_fee_bps: u16,
    /// Year length used by APR analytics
    pub seconds_per_year: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minimum_stake:          FixedPointAmount::ZERO,
            early_withdraw_fee_bps: DEFAULT_EARLY_WITHDRAW_FEE_BPS,
            seconds_per_year:       SECONDS_PER_YEAR,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.early_withdraw_fee_bps > MAX_FEE_BPS {
            return Err(StakingError::InvalidFeeConfiguration(self.early_withdraw_fee_bps));
        }
        Ok(())
    }

    pub fn with_minimum_stake(mut self, minimum_stake: FixedPointAmount) -> Self {
        self.minimum_stake = minimum_stake;
        self
    }

    pub fn with_early_withdraw_fee_bps(mut self, bps: u16) -> Self {
        self.early_withdraw_fee_bps = bps;
        self
    }
}

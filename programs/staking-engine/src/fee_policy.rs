use crate::amount::FixedPointAmount;
use crate::constants::MAX_FEE_BPS;
use crate::error::{Result, StakingError};

/// Early-withdrawal fee rule.
///
/// Construction rejects rates above 100 %, so a computed fee never exceeds
/// the amount it is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    early_withdraw_fee_bps: u16,
}

impl FeePolicy {
    pub fn new(early_withdraw_fee_bps: u16) -> Result<Self> {
        if early_withdraw_fee_bps > MAX_FEE_BPS {
            return Err(StakingError::InvalidFeeConfiguration(early_withdraw_fee_bps));
        }
        Ok(Self { early_withdraw_fee_bps })
    }

    pub fn early_withdraw_fee_bps(&self) -> u16 {
        self.early_withdraw_fee_bps
    }

    /// Zero once `now >= lock_end_time`; otherwise `amount × bps / 10_000`, floored.
    pub fn compute_fee(
        &self,
        amount: FixedPointAmount,
        now: u64,
        lock_end_time: u64,
    ) -> Result<FixedPointAmount> {
        if now >= lock_end_time {
            return Ok(FixedPointAmount::ZERO);
        }
        amount.bps_of(self.early_withdraw_fee_bps)
    }
}

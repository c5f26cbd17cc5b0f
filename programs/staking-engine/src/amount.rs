//! 18-decimal fixed-point token quantities.
//!
//! A `FixedPointAmount` stores `value × 10^18` in a 256-bit unsigned integer.
//! Every operation is exact integer arithmetic and reports overflow, underflow
//! and division by zero as errors instead of wrapping or saturating.
//!
//! [`RewardPerShare`] is the accumulator's own type: reward per staked token
//! at 36 decimals.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{ACC_DECIMALS, BPS_DENOMINATOR, DECIMALS, PRECISION};
use crate::error::{Result, StakingError};

/// Token quantity scaled by 10^18.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedPointAmount(U256);

#[inline]
fn scale() -> U256 {
    U256::from(PRECISION)
}

#[inline]
fn acc_scale() -> U256 {
    scale() * scale()
}

impl FixedPointAmount {
    pub const ZERO: Self = Self(U256::ZERO);

    /// Wrap a raw (already scaled) integer.
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Raw scaled integer.
    pub const fn raw(&self) -> U256 {
        self.0
    }

    /// Whole tokens: `from_tokens(3)` is `3.0`.
    pub fn from_tokens(tokens: u64) -> Self {
        Self(U256::from(tokens) * scale())
    }

    /// Raw base units: `from_units(1)` is `0.000000000000000001`.
    pub fn from_units(units: u64) -> Self {
        Self(U256::from(units))
    }

    pub fn one() -> Self {
        Self(scale())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0.checked_add(rhs.0).map(Self).ok_or(StakingError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(StakingError::Underflow)
    }

    /// Fixed-point product, floored: `self × rhs`.
    pub fn checked_mul(self, rhs: Self) -> Result<Self> {
        Self::scaled_mul_div(self, rhs, Self(scale()))
    }

    /// Multiply by a plain integer (e.g. a rate by elapsed seconds).
    pub fn checked_mul_int(self, n: u64) -> Result<Self> {
        self.0
            .checked_mul(U256::from(n))
            .map(Self)
            .ok_or(StakingError::Overflow)
    }

    /// Fixed-point quotient, floored: `self ÷ rhs`.
    pub fn div_floor(self, rhs: Self) -> Result<Self> {
        if rhs.is_zero() {
            return Err(StakingError::DivisionByZero);
        }
        Self::scaled_mul_div(self, Self(scale()), rhs)
    }

    /// `floor(a × b ÷ c)` on raw values.
    ///
    /// The product is formed in 256 bits; a product that does not fit is an
    /// `Overflow`, never a truncated result.
    pub fn scaled_mul_div(a: Self, b: Self, c: Self) -> Result<Self> {
        if c.is_zero() {
            return Err(StakingError::DivisionByZero);
        }
        let product = a.0.checked_mul(b.0).ok_or(StakingError::Overflow)?;
        Ok(Self(product / c.0))
    }

    /// `floor(self × bps ÷ 10_000)`.
    pub fn bps_of(self, bps: u16) -> Result<Self> {
        let product = self
            .0
            .checked_mul(U256::from(bps))
            .ok_or(StakingError::Overflow)?;
        Ok(Self(product / U256::from(BPS_DENOMINATOR)))
    }

    /// Integer quotient of the raw values, e.g. balance ÷ rate = seconds.
    pub fn quotient(self, divisor: Self) -> Result<U256> {
        if divisor.is_zero() {
            return Err(StakingError::DivisionByZero);
        }
        Ok(self.0 / divisor.0)
    }
}

// ─── Decimal text form ────────────────────────────────────────────────────────

fn write_decimal(f: &mut fmt::Formatter<'_>, value: U256, unit: U256, decimals: u32) -> fmt::Result {
    let whole = value / unit;
    let frac = value % unit;
    if frac.is_zero() {
        return write!(f, "{whole}");
    }
    let digits = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    write!(f, "{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse a non-negative decimal with at most `decimals` fractional digits.
fn parse_decimal(s: &str, unit: U256, decimals: u32) -> Result<U256> {
    let fail = |reason: &str| StakingError::ParseAmount {
        input:  s.to_string(),
        reason: reason.to_string(),
    };
    let text = s.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(fail("empty amount"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(fail("only decimal digits and one '.' are allowed"));
    }
    if frac.len() > decimals as usize {
        return Err(fail(&format!("more than {decimals} fractional digits")));
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|e| fail(&e.to_string()))?
    };
    let padded = format!("{frac:0<width$}", width = decimals as usize);
    let frac = U256::from_str_radix(&padded, 10).map_err(|e| fail(&e.to_string()))?;

    whole
        .checked_mul(unit)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| fail("value does not fit in 256 bits"))
}

impl fmt::Display for FixedPointAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_decimal(f, self.0, scale(), DECIMALS)
    }
}

impl fmt::Debug for FixedPointAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedPointAmount({self})")
    }
}

impl FromStr for FixedPointAmount {
    type Err = StakingError;

    /// Parse `"1000"`, `"0.1"` or `"12.000000000000000001"` into raw units.
    fn from_str(s: &str) -> Result<Self> {
        parse_decimal(s, scale(), DECIMALS).map(Self)
    }
}

impl Serialize for FixedPointAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FixedPointAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ─── Reward per share ─────────────────────────────────────────────────────────

/// Cumulative reward per staked token, stored as `value × 10^36`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RewardPerShare(U256);

impl RewardPerShare {
    pub const ZERO: Self = Self(U256::ZERO);

    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `floor(reward × 10^36 ÷ total_staked)` on raw amounts.
    pub fn from_rewards(reward: FixedPointAmount, total_staked: FixedPointAmount) -> Result<Self> {
        if total_staked.is_zero() {
            return Err(StakingError::DivisionByZero);
        }
        let scaled = reward.0.checked_mul(acc_scale()).ok_or(StakingError::Overflow)?;
        Ok(Self(scaled / total_staked.0))
    }

    /// Reward owed to `staked` for this much growth, floored.
    pub fn rewards_for(self, staked: FixedPointAmount) -> Result<FixedPointAmount> {
        let product = staked.0.checked_mul(self.0).ok_or(StakingError::Overflow)?;
        Ok(FixedPointAmount(product / acc_scale()))
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0.checked_add(rhs.0).map(Self).ok_or(StakingError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(StakingError::Underflow)
    }
}

impl fmt::Display for RewardPerShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_decimal(f, self.0, acc_scale(), ACC_DECIMALS)
    }
}

impl fmt::Debug for RewardPerShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RewardPerShare({self})")
    }
}

impl FromStr for RewardPerShare {
    type Err = StakingError;

    fn from_str(s: &str) -> Result<Self> {
        parse_decimal(s, acc_scale(), ACC_DECIMALS).map(Self)
    }
}

impl Serialize for RewardPerShare {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RewardPerShare {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> FixedPointAmount {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_prints_decimal_tokens() {
        assert_eq!(amt("1000"), FixedPointAmount::from_tokens(1000));
        assert_eq!(amt("0.1").raw(), U256::from(100_000_000_000_000_000u64));
        assert_eq!(amt("0.000000000000000001"), FixedPointAmount::from_units(1));
        assert_eq!(amt("1000.50").to_string(), "1000.5");
        assert_eq!(FixedPointAmount::ZERO.to_string(), "0");
        assert_eq!(amt(".25").to_string(), "0.25");
    }

    #[test]
    fn rejects_malformed_text() {
        assert!("".parse::<FixedPointAmount>().is_err());
        assert!("-1".parse::<FixedPointAmount>().is_err());
        assert!("1.2.3".parse::<FixedPointAmount>().is_err());
        assert!("0.0000000000000000001".parse::<FixedPointAmount>().is_err());
    }

    #[test]
    fn sub_below_zero_is_underflow() {
        let err = amt("1").checked_sub(amt("1.5")).unwrap_err();
        assert_eq!(err, StakingError::Underflow);
    }

    #[test]
    fn add_past_max_is_overflow() {
        let max = FixedPointAmount::from_raw(U256::MAX);
        assert_eq!(max.checked_add(FixedPointAmount::from_units(1)), Err(StakingError::Overflow));
        assert_eq!(max.checked_mul_int(2), Err(StakingError::Overflow));
    }

    #[test]
    fn fixed_point_mul_and_div() {
        assert_eq!(amt("1.5").checked_mul(amt("2")).unwrap(), amt("3"));
        assert_eq!(amt("1").div_floor(amt("3")).unwrap().to_string(), "0.333333333333333333");
        assert_eq!(amt("1").div_floor(FixedPointAmount::ZERO), Err(StakingError::DivisionByZero));
    }

    #[test]
    fn scaled_mul_div_floors() {
        let r = FixedPointAmount::scaled_mul_div(
            FixedPointAmount::from_units(10),
            FixedPointAmount::from_units(10),
            FixedPointAmount::from_units(3),
        )
        .unwrap();
        assert_eq!(r, FixedPointAmount::from_units(33));
    }

    #[test]
    fn bps_of_amount() {
        assert_eq!(amt("1000").bps_of(500).unwrap(), amt("50"));
        assert_eq!(amt("1000").bps_of(10_000).unwrap(), amt("1000"));
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let json = serde_json::to_string(&amt("12.5")).unwrap();
        assert_eq!(json, "\"12.5\"");
        let back: FixedPointAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amt("12.5"));
    }

    #[test]
    fn quotient_is_not_limited_to_u64() {
        let balance = amt("100");
        let rate = FixedPointAmount::from_units(1);
        assert_eq!(balance.quotient(rate).unwrap(), U256::from(100u64) * scale());
        assert_eq!(balance.quotient(FixedPointAmount::ZERO), Err(StakingError::DivisionByZero));
    }

    #[test]
    fn reward_per_share_keeps_36_decimals() {
        // 1 token spread over 7000 staked tokens
        let rps = RewardPerShare::from_rewards(amt("1"), amt("7000")).unwrap();
        let back = rps.rewards_for(amt("7000")).unwrap();
        assert_eq!(back, amt("0.999999999999999999"));
        assert_eq!("0.5".parse::<RewardPerShare>().unwrap().rewards_for(amt("3")).unwrap(), amt("1.5"));
        assert_eq!(
            RewardPerShare::from_raw(U256::from(1u64)).to_string(),
            "0.000000000000000000000000000000000001"
        );
    }
}

/// Decimal places carried by every `FixedPointAmount`.
pub const DECIMALS: u32 = 18;

/// 10^18, the fixed-point scale for amounts and rates.
pub const PRECISION: u64 = 1_000_000_000_000_000_000;

/// Decimal places carried by the reward-per-share accumulator (scale 10^36).
/// The extra 18 digits keep a sole staker's rounding loss within one base unit.
pub const ACC_DECIMALS: u32 = 36;

/// Denominator for basis-point math
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Highest legal early-withdrawal fee: 100 %
pub const MAX_FEE_BPS: u16 = 10_000;

/// Default early-withdrawal fee: 5.00 %
pub const DEFAULT_EARLY_WITHDRAW_FEE_BPS: u16 = 500;

/// 365 days
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Analytics ratios are expressed in percent.
pub const PERCENT: u64 = 100;

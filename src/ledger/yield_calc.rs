//! 收益率計算
//!
//! 三種收益率皆以 ppm 表示：
//! - native：金庫公告利率，直接透傳
//! - implied：由前後兩個日桶的份額價格變化推得的年化收益率
//! - accumulative：自起始時間以來價格成長的複利年化收益率

use crate::config::ImpliedYieldMode;
use crate::domain_types::{DayBucket, DerivedYields, VaultSnapshot};
use crate::utils::MS_PER_DAY;
use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::warn;

/// ppm 的基數
pub const PPM: u64 = 1_000_000;
pub const DAYS_PER_YEAR: u64 = 365;
/// 價格的小數位數
pub const PRICE_DECIMALS: u32 = 18;

/// 前一個日桶的收盤價格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviousPrice {
    pub price: U256,
    /// 前一日桶的 UTC 午夜毫秒時間戳
    pub timestamp_ms: i64,
}

impl From<&DayBucket> for PreviousPrice {
    fn from(bucket: &DayBucket) -> Self {
        Self {
            price: bucket.svzchf_price,
            timestamp_ms: bucket.timestamp,
        }
    }
}

/// 收益率計算器
#[derive(Debug, Clone)]
pub struct YieldCalculator {
    mode: ImpliedYieldMode,
    inception_timestamp_ms: i64,
    inception_price: U256,
}

impl YieldCalculator {
    pub fn new(mode: ImpliedYieldMode, inception_timestamp_ms: i64, inception_price: U256) -> Self {
        Self {
            mode,
            inception_timestamp_ms,
            inception_price,
        }
    }

    /// 計算衍生收益率
    ///
    /// `bucket_timestamp_ms` 是目前日桶的午夜時間戳，用於計算與前一日桶的間隔；
    /// `event_timestamp_ms` 是觸發事件的時間，用於計算距起始時間的天數。
    pub fn compute(
        &self,
        snapshot: &VaultSnapshot,
        bucket_timestamp_ms: i64,
        event_timestamp_ms: i64,
        previous: Option<PreviousPrice>,
    ) -> DerivedYields {
        let native_yield = snapshot.rate_ppm;

        let previous = match previous {
            Some(p) if !p.price.is_zero() => p,
            _ => {
                return DerivedYields {
                    native_yield,
                    implied_yield: 0,
                    accumulative_yield: 0,
                }
            }
        };

        let implied_yield = match self.mode {
            ImpliedYieldMode::Daily => implied_yield_daily(snapshot.price, previous.price),
            ImpliedYieldMode::TimeWeighted => implied_yield_time_weighted(
                snapshot.price,
                previous.price,
                bucket_timestamp_ms - previous.timestamp_ms,
            ),
        };

        let accumulative_yield = accumulative_yield(
            snapshot.price,
            self.inception_price,
            event_timestamp_ms,
            self.inception_timestamp_ms,
        );

        DerivedYields {
            native_yield,
            implied_yield,
            accumulative_yield,
        }
    }
}

/// 以一天間隔年化的隱含收益率
///
/// `((current - previous) * 1_000_000 * 365) / previous`，先乘後除並向零截斷，
/// 與歷史輸出逐位一致。前一價格為零時返回 0。
pub fn implied_yield_daily(current: U256, previous: U256) -> i64 {
    signed_ratio(current, previous, U256::from(PPM * DAYS_PER_YEAR), U256::from(1u64))
}

/// 依實際間隔年化的隱含收益率
///
/// `((current - previous) * 1_000_000 * 365 * 86_400_000) / (previous * gap_ms)`。
/// 間隔不為正數時返回 0。
pub fn implied_yield_time_weighted(current: U256, previous: U256, gap_ms: i64) -> i64 {
    if gap_ms <= 0 {
        return 0;
    }
    signed_ratio(
        current,
        previous,
        U256::from(PPM * DAYS_PER_YEAR) * U256::from(MS_PER_DAY as u64),
        U256::from(gap_ms as u64),
    )
}

/// `sign(current - previous) * (|current - previous| * scale) / (previous * gap)`
fn signed_ratio(current: U256, previous: U256, scale: U256, gap: U256) -> i64 {
    if previous.is_zero() || gap.is_zero() {
        return 0;
    }

    let (magnitude, negative) = if current >= previous {
        (current - previous, false)
    } else {
        (previous - current, true)
    };

    let numerator = magnitude.checked_mul(scale);
    let denominator = previous.checked_mul(gap);
    let quotient = match (numerator, denominator) {
        (Some(n), Some(d)) => n / d,
        _ => {
            warn!("隱含收益率計算溢位，以 0 記錄");
            return 0;
        }
    };

    match i64::try_from(quotient) {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => {
            warn!(quotient = %quotient, "隱含收益率超出 i64 範圍，以 0 記錄");
            0
        }
    }
}

/// 自起始時間以來的複利年化收益率
///
/// `floor((growth ^ (365 / age_days) - 1) * 1_000_000)`，
/// 其中 `growth = current_price / inception_price`。
/// 天數不為正或結果非有限數時返回 0。
pub fn accumulative_yield(
    current_price: U256,
    inception_price: U256,
    current_timestamp_ms: i64,
    inception_timestamp_ms: i64,
) -> i64 {
    let age_ms = current_timestamp_ms - inception_timestamp_ms;
    if age_ms <= 0 {
        return 0;
    }
    let age_days = age_ms as f64 / MS_PER_DAY as f64;

    let growth = match (
        fixed_point_to_decimal(current_price),
        fixed_point_to_decimal(inception_price),
    ) {
        (Some(current), Some(inception)) if !inception.is_zero() => {
            current.checked_div(inception).and_then(|g| g.to_f64())
        }
        _ => None,
    };

    let growth = match growth {
        Some(g) if g > 0.0 && g.is_finite() => g,
        _ => return 0,
    };

    let annualized = (growth.powf(DAYS_PER_YEAR as f64 / age_days) - 1.0) * PPM as f64;
    let floored = annualized.floor();

    if !floored.is_finite() || floored < i64::MIN as f64 || floored > i64::MAX as f64 {
        return 0;
    }
    floored as i64
}

/// 18 位小數定點數轉 Decimal
fn fixed_point_to_decimal(value: U256) -> Option<Decimal> {
    let raw = i128::try_from(u128::try_from(value).ok()?).ok()?;
    Decimal::try_from_i128_with_scale(raw, PRICE_DECIMALS).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn price(units: u64, micros: u64) -> U256 {
        // units.micros，例如 price(1, 100) = 1.000100
        U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
            + U256::from(micros) * U256::from(10u64).pow(U256::from(12u64))
    }

    fn snapshot(p: U256, rate_ppm: u32) -> VaultSnapshot {
        VaultSnapshot {
            price: p,
            total_assets: U256::from(1000u64),
            total_shares: U256::from(1000u64),
            rate_ppm,
        }
    }

    #[test]
    fn test_implied_yield_daily_reference_value() {
        // (1.0005 - 1.0001) * 1e6 * 365 / 1.0001 = 145985.4...
        assert_eq!(implied_yield_daily(price(1, 500), price(1, 100)), 145_985);
    }

    #[rstest]
    #[case(price(1, 100), price(1, 100), 0)]
    #[case(price(1, 0), price(1, 100), -36_496)]
    #[case(price(1, 100), U256::ZERO, 0)]
    fn test_implied_yield_daily_cases(#[case] current: U256, #[case] previous: U256, #[case] expected: i64) {
        assert_eq!(implied_yield_daily(current, previous), expected);
    }

    #[test]
    fn test_implied_yield_beyond_i64_records_zero() {
        // 價格自 1 wei 漲到 2^60 wei，ppm 商數超出 i64
        let previous = U256::from(1u64);
        let current = U256::from(1u128 << 60);
        assert_eq!(implied_yield_daily(current, previous), 0);
        assert_eq!(implied_yield_daily(previous, current), -364_999_999);
    }

    #[test]
    fn test_time_weighted_matches_daily_for_one_day_gap() {
        let current = price(1, 500);
        let previous = price(1, 100);
        assert_eq!(
            implied_yield_time_weighted(current, previous, MS_PER_DAY),
            implied_yield_daily(current, previous)
        );
        // 兩天間隔年化結果減半（截斷）
        assert_eq!(implied_yield_time_weighted(current, previous, 2 * MS_PER_DAY), 72_992);
        assert_eq!(implied_yield_time_weighted(current, previous, 0), 0);
        assert_eq!(implied_yield_time_weighted(current, previous, -MS_PER_DAY), 0);
    }

    #[test]
    fn test_accumulative_yield_one_year() {
        let inception_ms = 1_700_000_000_000;
        let one_year_later = inception_ms + 365 * MS_PER_DAY;
        let value = accumulative_yield(price(1, 50_000), price(1, 0), one_year_later, inception_ms);
        assert!((49_999..=50_000).contains(&value), "實際值: {}", value);
    }

    #[test]
    fn test_accumulative_yield_compounds() {
        // 兩年成長 1.1025 = 1.05^2，年化約 5%
        let inception_ms = 1_700_000_000_000;
        let two_years_later = inception_ms + 730 * MS_PER_DAY;
        let value = accumulative_yield(price(1, 102_500), price(1, 0), two_years_later, inception_ms);
        assert!((49_990..=50_000).contains(&value), "實際值: {}", value);
    }

    #[test]
    fn test_accumulative_yield_guards_zero_age() {
        let ts = 1_700_000_000_000;
        assert_eq!(accumulative_yield(price(1, 500), price(1, 0), ts, ts), 0);
        assert_eq!(accumulative_yield(price(1, 500), price(1, 0), ts - 1, ts), 0);
        assert_eq!(accumulative_yield(U256::ZERO, price(1, 0), ts + MS_PER_DAY, ts), 0);
    }

    #[test]
    fn test_accumulative_yield_huge_exponent_fails_closed() {
        // 起始後一毫秒價格翻倍，指數極大導致溢位
        let ts = 1_700_000_000_000;
        assert_eq!(accumulative_yield(price(2, 0), price(1, 0), ts + 1, ts), 0);
    }

    #[test]
    fn test_compute_without_previous() {
        let calc = YieldCalculator::new(ImpliedYieldMode::Daily, 1_700_000_000_000, price(1, 0));
        let yields = calc.compute(&snapshot(price(1, 0), 38_000), 1_700_006_400_000, 1_700_010_000_000, None);

        assert_eq!(yields.native_yield, 38_000);
        assert_eq!(yields.implied_yield, 0);
        assert_eq!(yields.accumulative_yield, 0);
    }

    #[test]
    fn test_compute_with_zero_previous_price() {
        let calc = YieldCalculator::new(ImpliedYieldMode::Daily, 1_700_000_000_000, price(1, 0));
        let previous = PreviousPrice {
            price: U256::ZERO,
            timestamp_ms: 1_699_920_000_000,
        };
        let yields = calc.compute(&snapshot(price(1, 500), 0), 1_700_006_400_000, 1_700_010_000_000, Some(previous));
        assert_eq!(yields.implied_yield, 0);
        assert_eq!(yields.accumulative_yield, 0);
    }

    proptest! {
        #[test]
        fn implied_yield_sign_follows_price(prev in 1u64..u64::MAX, delta in 0u64..1_000_000_000_000) {
            let previous = U256::from(prev);
            let up = previous + U256::from(delta);
            let down = previous.saturating_sub(U256::from(delta));

            prop_assert!(implied_yield_daily(up, previous) >= 0);
            prop_assert!(implied_yield_daily(down, previous) <= 0);
            prop_assert_eq!(implied_yield_daily(previous, previous), 0);
        }

        #[test]
        fn implied_yield_positive_for_real_price_growth(micros in 1u64..100_000) {
            let previous = price(1, 0);
            let current = price(1, micros);
            prop_assert!(implied_yield_daily(current, previous) > 0);
        }
    }
}

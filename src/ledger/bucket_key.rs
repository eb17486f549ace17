use crate::domain_types::BucketKey;
use crate::utils::{format_utc_date, seconds_to_datetime, utc_midnight_ms};
use chrono::{DateTime, Utc};

/// 將 (鏈 ID, 事件時間) 映射為日桶鍵
///
/// 只使用 UTC；同一條鏈同一 UTC 日內的任意時間都得到相同的鍵。
pub fn resolve_bucket_key(chain_id: u64, event_time: &DateTime<Utc>) -> BucketKey {
    let date = format_utc_date(event_time);
    BucketKey {
        id: format!("{}-{}", chain_id, date),
        chain_id,
        date,
        timestamp_ms: utc_midnight_ms(event_time),
    }
}

/// 從鏈上秒級時間戳解析日桶鍵，時間戳超出可表示範圍時返回 None
pub fn resolve_bucket_key_from_seconds(chain_id: u64, timestamp_sec: i64) -> Option<BucketKey> {
    seconds_to_datetime(timestamp_sec).map(|dt| resolve_bucket_key(chain_id, &dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(100, 1_699_920_000, "100-2023-11-14", 1_699_920_000_000)]
    #[case(100, 1_700_006_399, "100-2023-11-14", 1_699_920_000_000)]
    #[case(100, 1_700_006_400, "100-2023-11-15", 1_700_006_400_000)]
    #[case(1, 1_700_000_000, "1-2023-11-14", 1_699_920_000_000)]
    fn test_resolve_bucket_key(
        #[case] chain_id: u64,
        #[case] timestamp_sec: i64,
        #[case] expected_id: &str,
        #[case] expected_ms: i64,
    ) {
        let key = resolve_bucket_key_from_seconds(chain_id, timestamp_sec).unwrap();
        assert_eq!(key.id, expected_id);
        assert_eq!(key.chain_id, chain_id);
        assert_eq!(key.timestamp_ms, expected_ms);
        assert!(key.id.ends_with(&key.date));
    }

    #[test]
    fn test_unrepresentable_timestamp() {
        assert!(resolve_bucket_key_from_seconds(100, i64::MAX).is_none());
    }

    proptest! {
        #[test]
        fn same_utc_day_same_key(day in 0i64..40_000, a in 0i64..86_400, b in 0i64..86_400, chain in 1u64..1_000) {
            let base = day * 86_400;
            let first = resolve_bucket_key_from_seconds(chain, base + a).unwrap();
            let second = resolve_bucket_key_from_seconds(chain, base + b).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.timestamp_ms, base * 1_000);
        }

        #[test]
        fn different_chain_different_key(ts in 0i64..3_000_000_000, chain in 1u64..1_000) {
            let first = resolve_bucket_key_from_seconds(chain, ts).unwrap();
            let second = resolve_bucket_key_from_seconds(chain + 1, ts).unwrap();
            prop_assert_ne!(first.id, second.id);
            prop_assert_eq!(first.timestamp_ms, second.timestamp_ms);
        }
    }
}

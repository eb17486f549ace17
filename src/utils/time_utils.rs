// time_utils.rs
//
// 提供時間轉換相關的工具函數，用於在系統不同層之間轉換時間格式。
// 主要功能：
// 1. 鏈上秒級時間戳與 DateTime<Utc> 之間的轉換
// 2. 將任意時間截斷到 UTC 午夜（日桶邊界）
// 3. 日桶日期字串格式化
//
// 所有函數只使用 UTC，避免部署時區不同導致日桶漂移。

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

/// 一天的毫秒數
pub const MS_PER_DAY: i64 = 86_400_000;

//
// 基礎時間轉換函數
//

/// 將 DateTime<Utc> 轉換為毫秒時間戳
pub fn datetime_to_timestamp_ms(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// 將毫秒時間戳轉換為 DateTime<Utc>，超出可表示範圍時返回 None
pub fn timestamp_ms_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ts).single()
}

/// 將鏈上區塊時間（秒）轉換為 DateTime<Utc>
pub fn seconds_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

//
// 日桶相關函數
//

/// 將時間截斷到當日 UTC 午夜，返回毫秒時間戳
pub fn utc_midnight_ms(dt: &DateTime<Utc>) -> i64 {
    let midnight = dt.date_naive().and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&midnight).timestamp_millis()
}

/// 格式化為 ISO 日期字串 (YYYY-MM-DD)
pub fn format_utc_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

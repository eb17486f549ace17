use crate::utils::time_utils::{datetime_to_timestamp_ms, timestamp_ms_to_datetime};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::PgPool;

// 重新導出子模塊
pub mod daily_log;
pub mod memory;

// 重新導出常用類型
pub use daily_log::{LedgerStore, PgDailyLogRepository};
pub use memory::InMemoryDailyLogRepository;

/// 時間範圍查詢（兩端皆包含）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// 從毫秒時間戳創建 TimeRange，超出可表示範圍的一端視為無界
    pub fn from_timestamps(start_ts: i64, end_ts: i64) -> Self {
        Self {
            start: timestamp_ms_to_datetime(start_ts).unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: timestamp_ms_to_datetime(end_ts).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// 將 TimeRange 轉換為毫秒時間戳元組
    pub fn to_timestamps(&self) -> (i64, i64) {
        (
            datetime_to_timestamp_ms(&self.start),
            datetime_to_timestamp_ms(&self.end),
        )
    }

    /// 日期範圍，以兩端日期的 UTC 午夜為界
    pub fn from_date_range(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN)),
            end: Utc.from_utc_datetime(&end.and_time(NaiveTime::MIN)),
        }
    }

    /// 返回一個表示無限時間範圍的 TimeRange
    pub fn all_time() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// 毫秒時間戳是否落在範圍內
    pub fn contains_ms(&self, ts: i64) -> bool {
        let (start, end) = self.to_timestamps();
        ts >= start && ts <= end
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all_time()
    }
}

/// 通用的數據庫操作特性
pub trait DbExecutor {
    fn get_pool(&self) -> &PgPool;
}

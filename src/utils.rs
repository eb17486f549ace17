// utils.rs - 公共工具模組
//
// 提供各種通用的工具函數和輔助方法，用於簡化系統其他部分的代碼。

pub mod serde_helpers;
pub mod time_utils;

// 重新導出時間工具函數，使其可以通過 utils::function_name 直接訪問
pub use time_utils::{
    // 基礎時間轉換
    datetime_to_timestamp_ms,
    seconds_to_datetime,
    timestamp_ms_to_datetime,
    // 日桶相關
    format_utc_date,
    utc_midnight_ms,
    MS_PER_DAY,
};

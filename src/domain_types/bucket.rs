//! 日桶（每條鏈每個 UTC 日一行）結構定義

use super::event::EventPosition;
use crate::utils::serde_helpers::{deserialize_u256, serialize_u256};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// 日桶鍵
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    /// `"{chain_id}-{YYYY-MM-DD}"`
    pub id: String,
    pub chain_id: u64,
    pub date: String,
    /// 當日 UTC 午夜的毫秒時間戳
    pub timestamp_ms: i64,
}

/// 日聚合日誌行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub id: String,
    pub chain_id: u64,
    pub date: String,
    /// 排序鍵，建立後不再變動
    pub timestamp: i64,

    pub deposit_count: u64,
    pub withdraw_count: u64,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub deposits: U256,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub withdrawals: U256,

    // 快照欄位：覆寫而非累加
    #[serde(
        rename = "svZCHFPrice",
        serialize_with = "serialize_u256",
        deserialize_with = "deserialize_u256"
    )]
    pub svzchf_price: U256,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub total_assets: U256,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub total_shares: U256,
    pub native_yield: u32,
    pub implied_yield: i64,
    pub accumulative_yield: i64,

    /// 目前快照所屬事件的位置
    pub snapshot_block: u64,
    pub snapshot_timestamp: i64,
}

impl DayBucket {
    pub fn snapshot_position(&self) -> EventPosition {
        EventPosition::new(self.snapshot_block, self.snapshot_timestamp)
    }

    pub fn event_count(&self) -> u64 {
        self.deposit_count + self.withdraw_count
    }
}

//! 金庫存取事件定義

use crate::utils::serde_helpers::{deserialize_u256, serialize_u256};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 事件類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Deposit,
    Withdraw,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Deposit => "deposit",
            EventKind::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deposit" => Ok(EventKind::Deposit),
            "withdraw" => Ok(EventKind::Withdraw),
            other => Err(format!("未知的事件類型: {}", other)),
        }
    }
}

/// 事件在鏈上的先後位置，先比較區塊高度再比較時間戳
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EventPosition {
    pub block_number: u64,
    pub timestamp_sec: i64,
}

impl EventPosition {
    pub fn new(block_number: u64, timestamp_sec: i64) -> Self {
        Self {
            block_number,
            timestamp_sec,
        }
    }
}

/// 已解碼的 Deposit / Withdraw 事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEvent {
    pub chain_id: u64,
    pub timestamp_sec: i64,
    pub block_number: u64,
    pub kind: EventKind,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub asset_amount: U256,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub share_amount: U256,
    pub tx_ref: String,
    /// 同一筆交易內的日誌序號，缺省為 0
    #[serde(default)]
    pub log_index: u64,
}

impl VaultEvent {
    /// 創建新的事件，份額預設等於資產數量
    pub fn new(
        chain_id: u64,
        kind: EventKind,
        timestamp_sec: i64,
        block_number: u64,
        asset_amount: U256,
        tx_ref: impl Into<String>,
    ) -> Self {
        Self {
            chain_id,
            timestamp_sec,
            block_number,
            kind,
            asset_amount,
            share_amount: asset_amount,
            tx_ref: tx_ref.into(),
            log_index: 0,
        }
    }

    pub fn with_shares(mut self, share_amount: U256) -> Self {
        self.share_amount = share_amount;
        self
    }

    pub fn with_log_index(mut self, log_index: u64) -> Self {
        self.log_index = log_index;
        self
    }

    /// 事件唯一標識，用於冪等去重
    pub fn event_id(&self) -> String {
        format!("{}:{}", self.tx_ref, self.log_index)
    }

    pub fn position(&self) -> EventPosition {
        EventPosition::new(self.block_number, self.timestamp_sec)
    }
}

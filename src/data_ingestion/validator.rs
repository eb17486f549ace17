//! 事件前置條件驗證
//!
//! 不符合前置條件的事件屬於上游契約錯誤，引擎直接拒絕，不做重試。

use crate::domain_types::VaultEvent;
use crate::utils::seconds_to_datetime;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventValidationError {
    #[error("chain_id 不可為 0")]
    ZeroChainId,

    #[error("未配置的鏈: {0}")]
    UnknownChain(u64),

    #[error("時間戳必須為正數: {0}")]
    NonPositiveTimestamp(i64),

    #[error("時間戳超出可表示範圍: {0}")]
    TimestampOutOfRange(i64),

    #[error("交易參考不可為空")]
    EmptyTxRef,

    #[error("區塊高度不可為 0")]
    ZeroBlock,

    #[error("區塊 {block} 早於金庫部署區塊 {start}")]
    BlockBeforeStart { block: u64, start: u64 },

    #[error("事件時間 {timestamp} 早於金庫起始時間 {inception}")]
    BeforeInception { timestamp: i64, inception: i64 },
}

/// 事件驗證器
#[derive(Debug, Clone)]
pub struct EventValidator {
    /// chain_id -> 金庫部署區塊
    start_blocks: HashMap<u64, u64>,
    /// 金庫起始時間（秒）
    inception_timestamp: i64,
}

impl EventValidator {
    pub fn new(start_blocks: HashMap<u64, u64>, inception_timestamp: i64) -> Self {
        Self {
            start_blocks,
            inception_timestamp,
        }
    }

    /// 驗證事件，成功時返回事件的 UTC 時間
    pub fn validate(&self, event: &VaultEvent) -> Result<DateTime<Utc>, EventValidationError> {
        if event.chain_id == 0 {
            return Err(EventValidationError::ZeroChainId);
        }

        let start = *self
            .start_blocks
            .get(&event.chain_id)
            .ok_or(EventValidationError::UnknownChain(event.chain_id))?;

        if event.timestamp_sec <= 0 {
            return Err(EventValidationError::NonPositiveTimestamp(event.timestamp_sec));
        }

        let datetime = seconds_to_datetime(event.timestamp_sec)
            .ok_or(EventValidationError::TimestampOutOfRange(event.timestamp_sec))?;

        if event.tx_ref.trim().is_empty() {
            return Err(EventValidationError::EmptyTxRef);
        }

        if event.block_number == 0 {
            return Err(EventValidationError::ZeroBlock);
        }

        if event.block_number < start {
            return Err(EventValidationError::BlockBeforeStart {
                block: event.block_number,
                start,
            });
        }

        if event.timestamp_sec < self.inception_timestamp {
            return Err(EventValidationError::BeforeInception {
                timestamp: event.timestamp_sec,
                inception: self.inception_timestamp,
            });
        }

        Ok(datetime)
    }
}

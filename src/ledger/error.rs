use crate::data_ingestion::validator::EventValidationError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// 被包裝的底層錯誤
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 快照中的讀取項
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotField {
    Price,
    TotalAssets,
    TotalShares,
    RatePpm,
}

impl SnapshotField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotField::Price => "price",
            SnapshotField::TotalAssets => "totalAssets",
            SnapshotField::TotalShares => "totalSupply",
            SnapshotField::RatePpm => "currentRatePPM",
        }
    }
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 日誌引擎錯誤
///
/// `InvalidEvent` 代表上游違反契約，不應自動重試；
/// 其餘皆為暫時性 I/O 失敗，由上游的至少一次投遞負責重送。
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("事件前置條件不符: {0}")]
    InvalidEvent(#[from] EventValidationError),

    #[error("讀取金庫狀態 {field} 失敗: {source}")]
    StateRead {
        field: SnapshotField,
        source: BoxError,
    },

    #[error("日誌儲存操作失敗: {source}")]
    Store { source: BoxError },

    #[error("{stage} 逾時 (上限 {after:?})")]
    Timeout { stage: &'static str, after: Duration },
}

impl LedgerError {
    pub fn state_read(field: SnapshotField, err: anyhow::Error) -> Self {
        Self::StateRead {
            field,
            source: err.into(),
        }
    }

    pub fn store(err: anyhow::Error) -> Self {
        Self::Store { source: err.into() }
    }

    /// 是否可由重新投遞恢復
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LedgerError::InvalidEvent(_))
    }

    /// 指標與日誌使用的分類標籤
    pub fn label(&self) -> &'static str {
        match self {
            LedgerError::InvalidEvent(_) => "invalid_event",
            LedgerError::StateRead { .. } => "state_read",
            LedgerError::Store { .. } => "store",
            LedgerError::Timeout { .. } => "timeout",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

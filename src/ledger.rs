// 日聚合日誌更新引擎
//
// 每個事件依序經過：事件驗證 -> 日桶鍵解析 -> 金庫狀態快照與前一日桶查詢
// -> 收益率計算 -> 冪等合併寫入。同一日桶的合併以鍵鎖串行化。

pub mod bucket_key;
pub mod engine;
pub mod error;
pub mod locks;
pub mod merge;
pub mod metrics;
pub mod snapshot;
pub mod yield_calc;

pub use bucket_key::{resolve_bucket_key, resolve_bucket_key_from_seconds};
pub use engine::{BatchSummary, DailyLogEngine, EngineConfig};
pub use error::{LedgerError, LedgerResult, SnapshotField};
pub use locks::{KeyedLockGuard, KeyedLocks};
pub use merge::{merge_bucket, BucketUpdate, MergeOutcome};
pub use snapshot::{read_snapshot, VaultStateReader};
pub use yield_calc::{PreviousPrice, YieldCalculator};

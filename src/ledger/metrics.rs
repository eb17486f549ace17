use metrics::{counter, histogram};
use std::time::Duration;

/// 監控指標命名空間
pub const METRIC_NAMESPACE: &str = "savings_ledger";

/// 日誌引擎監控指標記錄器
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// 記錄事件處理結果
    ///
    /// # Arguments
    /// * `kind` - 事件類型 ("deposit" / "withdraw")
    /// * `outcome` - 合併結果標籤 ("created" / "updated" / "duplicate")
    pub fn record_outcome(kind: &'static str, outcome: &'static str) {
        counter!(
            format!("{}.events", METRIC_NAMESPACE),
            "kind" => kind,
            "outcome" => outcome
        )
        .increment(1);
    }

    /// 記錄處理失敗
    pub fn record_failure(kind: &'static str, reason: &'static str) {
        counter!(
            format!("{}.error", METRIC_NAMESPACE),
            "kind" => kind,
            "reason" => reason
        )
        .increment(1);
    }

    /// 記錄各階段耗時
    pub fn record_latency(stage: &'static str, duration: Duration) {
        histogram!(
            format!("{}.latency_ms", METRIC_NAMESPACE),
            "stage" => stage
        )
        .record(duration.as_secs_f64() * 1_000.0);
    }

    /// 記錄快照未被覆寫（事件早於已存快照）
    pub fn record_stale_snapshot() {
        counter!(format!("{}.stale_snapshot", METRIC_NAMESPACE)).increment(1);
    }

    /// 記錄批次處理
    pub fn record_batch(size: usize, duration: Duration) {
        counter!(format!("{}.batch_events", METRIC_NAMESPACE)).increment(size as u64);
        histogram!(format!("{}.batch_latency_ms", METRIC_NAMESPACE))
            .record(duration.as_secs_f64() * 1_000.0);
    }
}

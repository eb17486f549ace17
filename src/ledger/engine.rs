use crate::config::{ApplicationConfig, ImpliedYieldMode, ValidationError};
use crate::data_ingestion::validator::EventValidator;
use crate::domain_types::VaultEvent;
use crate::ledger::bucket_key::resolve_bucket_key;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::locks::KeyedLocks;
use crate::ledger::merge::{BucketUpdate, MergeOutcome};
use crate::ledger::metrics::LedgerMetrics;
use crate::ledger::snapshot::{read_snapshot, VaultStateReader};
use crate::ledger::yield_calc::{PreviousPrice, YieldCalculator};
use crate::storage::repository::LedgerStore;
use crate::utils::datetime_to_timestamp_ms;
use alloy_primitives::U256;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// 引擎運行參數
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 金庫起始時間（秒）
    pub inception_timestamp: i64,
    pub inception_price: U256,
    pub implied_yield_mode: ImpliedYieldMode,
    pub read_timeout: Duration,
    pub store_timeout: Duration,
    /// chain_id -> 金庫部署區塊
    pub start_blocks: HashMap<u64, u64>,
}

impl EngineConfig {
    pub fn from_app_config(config: &ApplicationConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            inception_timestamp: config.ledger.inception_timestamp,
            inception_price: config.ledger.inception_price_value()?,
            implied_yield_mode: config.ledger.implied_yield_mode,
            read_timeout: config.ledger.read_timeout(),
            store_timeout: config.ledger.store_timeout(),
            start_blocks: config
                .chains
                .iter()
                .map(|c| (c.chain_id, c.start_block))
                .collect(),
        })
    }
}

/// 批次處理統計
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub created: usize,
    pub updated: usize,
    /// 事件早於已存快照，只累加計數
    pub stale_snapshots: usize,
    pub duplicates: usize,
    /// (事件標識, 錯誤)
    #[serde(skip)]
    pub failed: Vec<(String, LedgerError)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.duplicates + self.failed.len()
    }

    /// 失敗事件中可由重送恢復的數量
    pub fn retryable_failures(&self) -> usize {
        self.failed.iter().filter(|(_, e)| e.is_retryable()).count()
    }

    fn record(&mut self, event_id: String, result: LedgerResult<MergeOutcome>) {
        match result {
            Ok(MergeOutcome::Created) => self.created += 1,
            Ok(MergeOutcome::Updated { snapshot_replaced }) => {
                self.updated += 1;
                if !snapshot_replaced {
                    self.stale_snapshots += 1;
                }
            }
            Ok(MergeOutcome::Duplicate) => self.duplicates += 1,
            Err(e) => self.failed.push((event_id, e)),
        }
    }
}

/// 日聚合日誌更新引擎
pub struct DailyLogEngine {
    validator: EventValidator,
    calculator: YieldCalculator,
    store: Arc<dyn LedgerStore>,
    reader: Arc<dyn VaultStateReader>,
    locks: KeyedLocks,
    read_timeout: Duration,
    store_timeout: Duration,
}

impl DailyLogEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn LedgerStore>,
        reader: Arc<dyn VaultStateReader>,
    ) -> Self {
        Self {
            validator: EventValidator::new(config.start_blocks, config.inception_timestamp),
            calculator: YieldCalculator::new(
                config.implied_yield_mode,
                config.inception_timestamp.saturating_mul(1_000),
                config.inception_price,
            ),
            store,
            reader,
            locks: KeyedLocks::new(),
            read_timeout: config.read_timeout,
            store_timeout: config.store_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// 目前持有或等待中的日桶鎖數量
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    /// 處理單一事件
    #[instrument(
        name = "daily_log_update",
        skip_all,
        fields(chain_id = event.chain_id, block = event.block_number, kind = %event.kind, tx = %event.tx_ref)
    )]
    pub async fn process_event(&self, event: &VaultEvent) -> LedgerResult<MergeOutcome> {
        let started = Instant::now();
        let result = self.update_daily_log(event).await;

        match &result {
            Ok(outcome) => {
                LedgerMetrics::record_outcome(event.kind.as_str(), outcome.label());
                if let MergeOutcome::Updated {
                    snapshot_replaced: false,
                } = outcome
                {
                    LedgerMetrics::record_stale_snapshot();
                    debug!("事件早於已存快照，僅累加計數");
                }
            }
            Err(e) if e.is_retryable() => {
                warn!("日誌更新失敗，等待重送: {}", e);
                LedgerMetrics::record_failure(event.kind.as_str(), e.label());
            }
            Err(e) => {
                error!("事件被拒絕: {}", e);
                LedgerMetrics::record_failure(event.kind.as_str(), e.label());
            }
        }
        LedgerMetrics::record_latency("event", started.elapsed());

        result
    }

    async fn update_daily_log(&self, event: &VaultEvent) -> LedgerResult<MergeOutcome> {
        let event_time = self.validator.validate(event)?;
        let key = resolve_bucket_key(event.chain_id, &event_time);
        let event_id = event.event_id();

        let _guard = self.locks.lock(&key.id).await;

        if self
            .with_store_timeout("is_applied", self.store.is_applied(&key.id, &event_id))
            .await?
        {
            debug!(bucket = %key.id, "事件已套用，略過");
            return Ok(MergeOutcome::Duplicate);
        }

        let read_started = Instant::now();
        let (snapshot, previous) = tokio::try_join!(
            read_snapshot(
                self.reader.as_ref(),
                event.chain_id,
                event.block_number,
                self.read_timeout
            ),
            self.with_store_timeout(
                "find_previous_bucket",
                self.store.find_previous_bucket(event.chain_id, key.timestamp_ms)
            ),
        )?;
        LedgerMetrics::record_latency("snapshot", read_started.elapsed());

        let yields = self.calculator.compute(
            &snapshot,
            key.timestamp_ms,
            datetime_to_timestamp_ms(&event_time),
            previous.as_ref().map(PreviousPrice::from),
        );

        let update = BucketUpdate::new(key, event, snapshot, yields);

        let merge_started = Instant::now();
        let outcome = self
            .with_store_timeout("apply_merge", self.store.apply_merge(&update))
            .await?;
        LedgerMetrics::record_latency("apply_merge", merge_started.elapsed());

        debug!(
            bucket = %update.key.id,
            outcome = outcome.label(),
            implied_yield = update.yields.implied_yield,
            accumulative_yield = update.yields.accumulative_yield,
            "日桶已更新"
        );

        Ok(outcome)
    }

    async fn process_chain(&self, events: Vec<VaultEvent>) -> Vec<(String, LedgerResult<MergeOutcome>)> {
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            let result = self.process_event(&event).await;
            results.push((event.event_id(), result));
        }
        results
    }

    async fn with_store_timeout<T, F>(&self, stage: &'static str, op: F) -> LedgerResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result.map_err(LedgerError::store),
            Err(_) => Err(LedgerError::Timeout {
                stage,
                after: self.store_timeout,
            }),
        }
    }

    /// 以有限並行度處理一批事件
    ///
    /// 每條鏈單一寫入者：同鏈事件依 (timestamp, block, log_index) 順序逐一套用，
    /// 前一日桶在下一日讀取前已寫入；不同鏈並行處理。單一事件失敗不影響其他事件。
    pub async fn process_batch(&self, events: Vec<VaultEvent>, concurrency: usize) -> BatchSummary {
        let started = Instant::now();
        let size = events.len();
        let lanes = partition_by_chain(events);
        debug!("批次共 {} 個事件，分為 {} 條鏈", size, lanes.len());

        let results: Vec<_> = stream::iter(lanes)
            .map(|lane| self.process_chain(lane))
            .buffer_unordered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        let mut summary = BatchSummary::default();
        for (event_id, result) in results {
            summary.record(event_id, result);
        }

        LedgerMetrics::record_batch(size, started.elapsed());
        info!(
            "批次處理完成: 建立 {}, 更新 {}, 重複 {}, 失敗 {}",
            summary.created,
            summary.updated,
            summary.duplicates,
            summary.failed.len()
        );

        summary
    }
}

/// 依鏈分組，組內依鏈上先後排序
fn partition_by_chain(events: Vec<VaultEvent>) -> Vec<Vec<VaultEvent>> {
    let mut lanes: BTreeMap<u64, Vec<VaultEvent>> = BTreeMap::new();
    for event in events {
        lanes.entry(event.chain_id).or_default().push(event);
    }

    lanes
        .into_values()
        .map(|mut lane| {
            lane.sort_by_key(|e| (e.timestamp_sec, e.block_number, e.log_index));
            lane
        })
        .collect()
}

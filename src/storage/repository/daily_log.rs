use crate::domain_types::DayBucket;
use crate::ledger::merge::{BucketUpdate, MergeOutcome};
use crate::storage::models::daily_log::{DailyAggregatedLogRow, DAILY_LOG_COLUMNS};
use crate::storage::repository::{DbExecutor, TimeRange};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

/// 日聚合日誌儲存特徵
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// 依 ID 查找日桶
    async fn find_bucket(&self, id: &str) -> Result<Option<DayBucket>>;

    /// 同一條鏈上時間戳嚴格早於 `before_ms` 的最近日桶
    async fn find_previous_bucket(&self, chain_id: u64, before_ms: i64) -> Result<Option<DayBucket>>;

    /// 依時間範圍列出日桶，按時間戳升序
    async fn list_buckets(&self, chain_id: u64, range: TimeRange) -> Result<Vec<DayBucket>>;

    /// 事件是否已套用到該日桶
    async fn is_applied(&self, bucket_id: &str, event_id: &str) -> Result<bool>;

    /// 以單一原子操作完成去重標記與插入或合併
    async fn apply_merge(&self, update: &BucketUpdate) -> Result<MergeOutcome>;
}

/// PostgreSQL 日聚合日誌儲存庫實現
#[derive(Clone)]
pub struct PgDailyLogRepository {
    pool: PgPool,
}

impl PgDailyLogRepository {
    /// 創建新的日聚合日誌儲存庫
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DbExecutor for PgDailyLogRepository {
    fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_i64(field: &str, value: u64) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{} 超出 BIGINT 範圍: {}", field, value))
}

/// 合併寫入：計數與金額累加，快照欄位僅在事件不早於已存快照時覆寫
const UPSERT_SQL: &str = r#"
    INSERT INTO daily_aggregated_log (
        id, chain_id, date, "timestamp",
        deposit_count, withdraw_count, deposits, withdrawals,
        svzchf_price, total_assets, total_shares,
        native_yield, implied_yield, accumulative_yield,
        snapshot_block, snapshot_timestamp
    ) VALUES (
        $1, $2, $3, $4,
        $5, $6, $7::numeric, $8::numeric,
        $9::numeric, $10::numeric, $11::numeric,
        $12, $13, $14,
        $15, $16
    )
    ON CONFLICT (id) DO UPDATE SET
        deposit_count = daily_aggregated_log.deposit_count + EXCLUDED.deposit_count,
        withdraw_count = daily_aggregated_log.withdraw_count + EXCLUDED.withdraw_count,
        deposits = daily_aggregated_log.deposits + EXCLUDED.deposits,
        withdrawals = daily_aggregated_log.withdrawals + EXCLUDED.withdrawals,
        svzchf_price = CASE WHEN (EXCLUDED.snapshot_block, EXCLUDED.snapshot_timestamp)
                >= (daily_aggregated_log.snapshot_block, daily_aggregated_log.snapshot_timestamp)
            THEN EXCLUDED.svzchf_price ELSE daily_aggregated_log.svzchf_price END,
        total_assets = CASE WHEN (EXCLUDED.snapshot_block, EXCLUDED.snapshot_timestamp)
                >= (daily_aggregated_log.snapshot_block, daily_aggregated_log.snapshot_timestamp)
            THEN EXCLUDED.total_assets ELSE daily_aggregated_log.total_assets END,
        total_shares = CASE WHEN (EXCLUDED.snapshot_block, EXCLUDED.snapshot_timestamp)
                >= (daily_aggregated_log.snapshot_block, daily_aggregated_log.snapshot_timestamp)
            THEN EXCLUDED.total_shares ELSE daily_aggregated_log.total_shares END,
        native_yield = CASE WHEN (EXCLUDED.snapshot_block, EXCLUDED.snapshot_timestamp)
                >= (daily_aggregated_log.snapshot_block, daily_aggregated_log.snapshot_timestamp)
            THEN EXCLUDED.native_yield ELSE daily_aggregated_log.native_yield END,
        implied_yield = CASE WHEN (EXCLUDED.snapshot_block, EXCLUDED.snapshot_timestamp)
                >= (daily_aggregated_log.snapshot_block, daily_aggregated_log.snapshot_timestamp)
            THEN EXCLUDED.implied_yield ELSE daily_aggregated_log.implied_yield END,
        accumulative_yield = CASE WHEN (EXCLUDED.snapshot_block, EXCLUDED.snapshot_timestamp)
                >= (daily_aggregated_log.snapshot_block, daily_aggregated_log.snapshot_timestamp)
            THEN EXCLUDED.accumulative_yield ELSE daily_aggregated_log.accumulative_yield END,
        snapshot_block = GREATEST(daily_aggregated_log.snapshot_block, EXCLUDED.snapshot_block),
        snapshot_timestamp = CASE WHEN (EXCLUDED.snapshot_block, EXCLUDED.snapshot_timestamp)
                >= (daily_aggregated_log.snapshot_block, daily_aggregated_log.snapshot_timestamp)
            THEN EXCLUDED.snapshot_timestamp ELSE daily_aggregated_log.snapshot_timestamp END
    RETURNING (xmax = 0) AS inserted, snapshot_block, snapshot_timestamp
"#;

#[async_trait]
impl LedgerStore for PgDailyLogRepository {
    async fn find_bucket(&self, id: &str) -> Result<Option<DayBucket>> {
        let sql = format!(
            "SELECT {} FROM daily_aggregated_log WHERE id = $1",
            DAILY_LOG_COLUMNS
        );
        let row = sqlx::query_as::<_, DailyAggregatedLogRow>(&sql)
            .bind(id)
            .fetch_optional(DbExecutor::get_pool(self))
            .await?;

        row.map(DayBucket::try_from).transpose()
    }

    async fn find_previous_bucket(&self, chain_id: u64, before_ms: i64) -> Result<Option<DayBucket>> {
        let sql = format!(
            r#"SELECT {} FROM daily_aggregated_log
               WHERE chain_id = $1 AND "timestamp" < $2
               ORDER BY "timestamp" DESC
               LIMIT 1"#,
            DAILY_LOG_COLUMNS
        );
        let row = sqlx::query_as::<_, DailyAggregatedLogRow>(&sql)
            .bind(to_i64("chain_id", chain_id)?)
            .bind(before_ms)
            .fetch_optional(DbExecutor::get_pool(self))
            .await?;

        row.map(DayBucket::try_from).transpose()
    }

    async fn list_buckets(&self, chain_id: u64, range: TimeRange) -> Result<Vec<DayBucket>> {
        let (start_ms, end_ms) = range.to_timestamps();
        let sql = format!(
            r#"SELECT {} FROM daily_aggregated_log
               WHERE chain_id = $1 AND "timestamp" BETWEEN $2 AND $3
               ORDER BY "timestamp" ASC"#,
            DAILY_LOG_COLUMNS
        );
        let rows = sqlx::query_as::<_, DailyAggregatedLogRow>(&sql)
            .bind(to_i64("chain_id", chain_id)?)
            .bind(start_ms)
            .bind(end_ms)
            .fetch_all(DbExecutor::get_pool(self))
            .await?;

        rows.into_iter().map(DayBucket::try_from).collect()
    }

    async fn is_applied(&self, bucket_id: &str, event_id: &str) -> Result<bool> {
        let applied: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(
                   SELECT 1 FROM daily_log_applied_event
                   WHERE bucket_id = $1 AND event_id = $2
               )"#,
        )
        .bind(bucket_id)
        .bind(event_id)
        .fetch_one(DbExecutor::get_pool(self))
        .await?;

        Ok(applied)
    }

    async fn apply_merge(&self, update: &BucketUpdate) -> Result<MergeOutcome> {
        let mut tx = DbExecutor::get_pool(self).begin().await?;

        let marked = sqlx::query(
            r#"INSERT INTO daily_log_applied_event (bucket_id, event_id)
               VALUES ($1, $2)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(&update.key.id)
        .bind(&update.event_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if marked == 0 {
            tx.rollback().await?;
            debug!("事件 {} 已套用到 {}，略過", update.event_id, update.key.id);
            return Ok(MergeOutcome::Duplicate);
        }

        let (deposit_count, withdraw_count, deposits, withdrawals) = update.deltas();
        let (inserted, snapshot_block, snapshot_timestamp): (bool, i64, i64) =
            sqlx::query_as(UPSERT_SQL)
                .bind(&update.key.id)
                .bind(to_i64("chain_id", update.key.chain_id)?)
                .bind(&update.key.date)
                .bind(update.key.timestamp_ms)
                .bind(to_i64("deposit_count", deposit_count)?)
                .bind(to_i64("withdraw_count", withdraw_count)?)
                .bind(deposits.to_string())
                .bind(withdrawals.to_string())
                .bind(update.snapshot.price.to_string())
                .bind(update.snapshot.total_assets.to_string())
                .bind(update.snapshot.total_shares.to_string())
                .bind(i64::from(update.yields.native_yield))
                .bind(update.yields.implied_yield)
                .bind(update.yields.accumulative_yield)
                .bind(to_i64("snapshot_block", update.position.block_number)?)
                .bind(update.position.timestamp_sec)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        if inserted {
            return Ok(MergeOutcome::Created);
        }

        let snapshot_replaced = snapshot_block == to_i64("snapshot_block", update.position.block_number)?
            && snapshot_timestamp == update.position.timestamp_sec;
        Ok(MergeOutcome::Updated { snapshot_replaced })
    }
}

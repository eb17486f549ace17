use crate::domain_types::DayBucket;
use crate::utils::serde_helpers::parse_u256;
use alloy_primitives::U256;
use anyhow::{anyhow, Context, Result};

/// 日聚合日誌資料列
///
/// NUMERIC(78,0) 欄位以 `::text` 取出，再解析為 U256。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyAggregatedLogRow {
    pub id: String,
    pub chain_id: i64,
    pub date: String,
    pub timestamp: i64,
    pub deposit_count: i64,
    pub withdraw_count: i64,
    pub deposits: String,
    pub withdrawals: String,
    pub svzchf_price: String,
    pub total_assets: String,
    pub total_shares: String,
    pub native_yield: i64,
    pub implied_yield: i64,
    pub accumulative_yield: i64,
    pub snapshot_block: i64,
    pub snapshot_timestamp: i64,
}

/// 查詢日桶時使用的欄位清單
pub const DAILY_LOG_COLUMNS: &str = r#"
    id, chain_id, date, "timestamp",
    deposit_count, withdraw_count,
    deposits::text AS deposits, withdrawals::text AS withdrawals,
    svzchf_price::text AS svzchf_price, total_assets::text AS total_assets,
    total_shares::text AS total_shares,
    native_yield, implied_yield, accumulative_yield,
    snapshot_block, snapshot_timestamp
"#;

fn numeric(field: &str, value: &str) -> Result<U256> {
    parse_u256(value).map_err(|e| anyhow!("欄位 {} 無法解析: {}", field, e))
}

fn unsigned(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value).with_context(|| format!("欄位 {} 為負數: {}", field, value))
}

impl TryFrom<DailyAggregatedLogRow> for DayBucket {
    type Error = anyhow::Error;

    fn try_from(row: DailyAggregatedLogRow) -> Result<Self> {
        Ok(DayBucket {
            chain_id: unsigned("chain_id", row.chain_id)?,
            date: row.date,
            timestamp: row.timestamp,
            deposit_count: unsigned("deposit_count", row.deposit_count)?,
            withdraw_count: unsigned("withdraw_count", row.withdraw_count)?,
            deposits: numeric("deposits", &row.deposits)?,
            withdrawals: numeric("withdrawals", &row.withdrawals)?,
            svzchf_price: numeric("svzchf_price", &row.svzchf_price)?,
            total_assets: numeric("total_assets", &row.total_assets)?,
            total_shares: numeric("total_shares", &row.total_shares)?,
            native_yield: u32::try_from(row.native_yield)
                .with_context(|| format!("欄位 native_yield 超出範圍: {}", row.native_yield))?,
            implied_yield: row.implied_yield,
            accumulative_yield: row.accumulative_yield,
            snapshot_block: unsigned("snapshot_block", row.snapshot_block)?,
            snapshot_timestamp: row.snapshot_timestamp,
            id: row.id,
        })
    }
}

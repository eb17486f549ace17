//! 日桶合併規則
//!
//! 狀態：不存在 -> 建立（首個事件）-> 更新（後續事件，自迴圈）。
//! 計數與金額只累加事件對應類型；快照與收益率欄位以較新的事件為準覆寫。

use crate::domain_types::{BucketKey, DayBucket, DerivedYields, EventKind, EventPosition, VaultEvent, VaultSnapshot};
use alloy_primitives::U256;
use serde::Serialize;

/// 一次合併所需的完整輸入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketUpdate {
    pub key: BucketKey,
    /// 冪等去重用的事件標識
    pub event_id: String,
    pub kind: EventKind,
    pub amount: U256,
    pub position: EventPosition,
    pub snapshot: VaultSnapshot,
    pub yields: DerivedYields,
}

impl BucketUpdate {
    pub fn new(
        key: BucketKey,
        event: &VaultEvent,
        snapshot: VaultSnapshot,
        yields: DerivedYields,
    ) -> Self {
        Self {
            key,
            event_id: event.event_id(),
            kind: event.kind,
            amount: event.asset_amount,
            position: event.position(),
            snapshot,
            yields,
        }
    }

    /// 本事件對 (存款次數, 提款次數, 存款金額, 提款金額) 的增量
    pub fn deltas(&self) -> (u64, u64, U256, U256) {
        match self.kind {
            EventKind::Deposit => (1, 0, self.amount, U256::ZERO),
            EventKind::Withdraw => (0, 1, U256::ZERO, self.amount),
        }
    }
}

/// 合併結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// 該日桶的首個事件
    Created,
    /// 累加到既有日桶；`snapshot_replaced` 為 false 表示事件早於已存快照
    Updated { snapshot_replaced: bool },
    /// 事件已套用過，未做任何變更
    Duplicate,
}

impl MergeOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MergeOutcome::Created => "created",
            MergeOutcome::Updated { .. } => "updated",
            MergeOutcome::Duplicate => "duplicate",
        }
    }
}

/// 將更新合併到既有日桶（或建立新日桶）
///
/// 純函數，冪等去重由儲存層負責。返回新日桶與合併結果。
pub fn merge_bucket(existing: Option<&DayBucket>, update: &BucketUpdate) -> (DayBucket, MergeOutcome) {
    let (deposit_delta, withdraw_delta, deposit_amount, withdraw_amount) = update.deltas();

    match existing {
        None => {
            let mut bucket = DayBucket {
                id: update.key.id.clone(),
                chain_id: update.key.chain_id,
                date: update.key.date.clone(),
                timestamp: update.key.timestamp_ms,
                deposit_count: deposit_delta,
                withdraw_count: withdraw_delta,
                deposits: deposit_amount,
                withdrawals: withdraw_amount,
                svzchf_price: U256::ZERO,
                total_assets: U256::ZERO,
                total_shares: U256::ZERO,
                native_yield: 0,
                implied_yield: 0,
                accumulative_yield: 0,
                snapshot_block: 0,
                snapshot_timestamp: 0,
            };
            replace_snapshot(&mut bucket, update);
            (bucket, MergeOutcome::Created)
        }
        Some(current) => {
            let mut bucket = current.clone();
            bucket.deposit_count = bucket.deposit_count.saturating_add(deposit_delta);
            bucket.withdraw_count = bucket.withdraw_count.saturating_add(withdraw_delta);
            bucket.deposits = bucket.deposits.saturating_add(deposit_amount);
            bucket.withdrawals = bucket.withdrawals.saturating_add(withdraw_amount);

            let snapshot_replaced = update.position >= current.snapshot_position();
            if snapshot_replaced {
                replace_snapshot(&mut bucket, update);
            }

            (bucket, MergeOutcome::Updated { snapshot_replaced })
        }
    }
}

fn replace_snapshot(bucket: &mut DayBucket, update: &BucketUpdate) {
    bucket.svzchf_price = update.snapshot.price;
    bucket.total_assets = update.snapshot.total_assets;
    bucket.total_shares = update.snapshot.total_shares;
    bucket.native_yield = update.yields.native_yield;
    bucket.implied_yield = update.yields.implied_yield;
    bucket.accumulative_yield = update.yields.accumulative_yield;
    bucket.snapshot_block = update.position.block_number;
    bucket.snapshot_timestamp = update.position.timestamp_sec;
}

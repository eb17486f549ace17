use crate::domain_types::DayBucket;
use crate::ledger::merge::{merge_bucket, BucketUpdate, MergeOutcome};
use crate::storage::repository::{LedgerStore, TimeRange};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    buckets: HashMap<String, DayBucket>,
    applied: HashSet<(String, String)>,
}

/// 記憶體日聚合日誌儲存庫，用於試跑與測試
#[derive(Debug, Default)]
pub struct InMemoryDailyLogRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryDailyLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 目前所有日桶，按 (鏈, 時間戳) 排序
    pub async fn snapshot(&self) -> Vec<DayBucket> {
        let state = self.state.read().await;
        let mut buckets: Vec<_> = state.buckets.values().cloned().collect();
        buckets.sort_by(|a, b| (a.chain_id, a.timestamp).cmp(&(b.chain_id, b.timestamp)));
        buckets
    }

    /// 已套用事件數
    pub async fn applied_count(&self) -> usize {
        self.state.read().await.applied.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryDailyLogRepository {
    async fn find_bucket(&self, id: &str) -> Result<Option<DayBucket>> {
        Ok(self.state.read().await.buckets.get(id).cloned())
    }

    async fn find_previous_bucket(&self, chain_id: u64, before_ms: i64) -> Result<Option<DayBucket>> {
        let state = self.state.read().await;
        Ok(state
            .buckets
            .values()
            .filter(|b| b.chain_id == chain_id && b.timestamp < before_ms)
            .max_by_key(|b| b.timestamp)
            .cloned())
    }

    async fn list_buckets(&self, chain_id: u64, range: TimeRange) -> Result<Vec<DayBucket>> {
        let state = self.state.read().await;
        let mut buckets: Vec<_> = state
            .buckets
            .values()
            .filter(|b| b.chain_id == chain_id && range.contains_ms(b.timestamp))
            .cloned()
            .collect();
        buckets.sort_by_key(|b| b.timestamp);
        Ok(buckets)
    }

    async fn is_applied(&self, bucket_id: &str, event_id: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .applied
            .contains(&(bucket_id.to_string(), event_id.to_string())))
    }

    async fn apply_merge(&self, update: &BucketUpdate) -> Result<MergeOutcome> {
        let mut state = self.state.write().await;

        let marker = (update.key.id.clone(), update.event_id.clone());
        if state.applied.contains(&marker) {
            return Ok(MergeOutcome::Duplicate);
        }

        let (bucket, outcome) = merge_bucket(state.buckets.get(&update.key.id), update);
        state.buckets.insert(bucket.id.clone(), bucket);
        state.applied.insert(marker);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_types::{DerivedYields, EventKind, VaultEvent, VaultSnapshot};
    use crate::ledger::bucket_key::resolve_bucket_key_from_seconds;
    use alloy_primitives::U256;

    const DAY: i64 = 86_400;
    const DAY_ONE: i64 = 1_757_462_400;

    fn update(chain_id: u64, timestamp_sec: i64, tx: &str, price: u64) -> BucketUpdate {
        let event = VaultEvent::new(
            chain_id,
            EventKind::Deposit,
            timestamp_sec,
            42_100_000 + timestamp_sec as u64 % 1_000,
            U256::from(100u64),
            tx,
        );
        BucketUpdate::new(
            resolve_bucket_key_from_seconds(chain_id, timestamp_sec).unwrap(),
            &event,
            VaultSnapshot {
                price: U256::from(price),
                total_assets: U256::from(1u64),
                total_shares: U256::from(1u64),
                rate_ppm: 0,
            },
            DerivedYields::default(),
        )
    }

    #[tokio::test]
    async fn test_apply_merge_is_idempotent() {
        let repo = InMemoryDailyLogRepository::new();
        let first = update(100, DAY_ONE + 10, "0xa", 1);

        assert_eq!(repo.apply_merge(&first).await.unwrap(), MergeOutcome::Created);
        assert_eq!(repo.apply_merge(&first).await.unwrap(), MergeOutcome::Duplicate);
        assert!(repo.is_applied(&first.key.id, &first.event_id).await.unwrap());

        let bucket = repo.find_bucket(&first.key.id).await.unwrap().unwrap();
        assert_eq!(bucket.deposit_count, 1);
        assert_eq!(repo.applied_count().await, 1);
    }

    #[tokio::test]
    async fn test_previous_bucket_is_strictly_older_same_chain() {
        let repo = InMemoryDailyLogRepository::new();
        repo.apply_merge(&update(100, DAY_ONE + 10, "0xa", 1)).await.unwrap();
        repo.apply_merge(&update(100, DAY_ONE + 2 * DAY + 10, "0xb", 2)).await.unwrap();
        repo.apply_merge(&update(1, DAY_ONE + 3 * DAY, "0xc", 3)).await.unwrap();

        let day_three_ms = (DAY_ONE + 2 * DAY) * 1_000;
        let previous = repo.find_previous_bucket(100, day_three_ms).await.unwrap().unwrap();
        assert_eq!(previous.date, "2025-09-10");

        let later = repo
            .find_previous_bucket(100, (DAY_ONE + 5 * DAY) * 1_000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(later.date, "2025-09-12");

        assert!(repo.find_previous_bucket(100, DAY_ONE * 1_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_buckets_in_range() {
        let repo = InMemoryDailyLogRepository::new();
        for day in 0..4 {
            repo.apply_merge(&update(100, DAY_ONE + day * DAY + 5, &format!("0x{day}"), 1))
                .await
                .unwrap();
        }

        let range = TimeRange::from_timestamps((DAY_ONE + DAY) * 1_000, (DAY_ONE + 2 * DAY) * 1_000);
        let buckets = repo.list_buckets(100, range).await.unwrap();
        let dates: Vec<_> = buckets.iter().map(|b| b.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-09-11", "2025-09-12"]);

        assert!(repo.list_buckets(1, TimeRange::all_time()).await.unwrap().is_empty());
    }
}

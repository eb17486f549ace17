use crate::domain_types::VaultSnapshot;
use crate::ledger::error::{LedgerError, LedgerResult, SnapshotField};
use alloy_primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// 金庫狀態讀取接口
///
/// 每個方法讀取指定區塊時點的單一狀態值，彼此獨立、可能各自失敗。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VaultStateReader: Send + Sync {
    /// 每份額資產價格（18 位小數）
    async fn price(&self, chain_id: u64, block: u64) -> Result<U256>;

    async fn total_assets(&self, chain_id: u64, block: u64) -> Result<U256>;

    async fn total_shares(&self, chain_id: u64, block: u64) -> Result<U256>;

    /// 公告年化利率 (ppm)
    async fn rate_ppm(&self, chain_id: u64, block: u64) -> Result<u32>;
}

/// 在逾時限制內執行單項讀取，並把失敗歸類到對應欄位
async fn timed_read<T, F>(field: SnapshotField, timeout: Duration, read: F) -> LedgerResult<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(LedgerError::state_read(field, err)),
        Err(_) => Err(LedgerError::Timeout {
            stage: field.as_str(),
            after: timeout,
        }),
    }
}

/// 讀取完整快照
///
/// 四項讀取並行發出，任一失敗即整體失敗，不會產生部分快照。
/// 四項之間不保證對鏈上狀態原子一致。
pub async fn read_snapshot(
    reader: &dyn VaultStateReader,
    chain_id: u64,
    block: u64,
    timeout: Duration,
) -> LedgerResult<VaultSnapshot> {
    let (price, total_assets, total_shares, rate_ppm) = tokio::try_join!(
        timed_read(SnapshotField::Price, timeout, reader.price(chain_id, block)),
        timed_read(SnapshotField::TotalAssets, timeout, reader.total_assets(chain_id, block)),
        timed_read(SnapshotField::TotalShares, timeout, reader.total_shares(chain_id, block)),
        timed_read(SnapshotField::RatePpm, timeout, reader.rate_ppm(chain_id, block)),
    )?;

    debug!(chain_id, block, %price, %total_assets, %total_shares, rate_ppm, "金庫狀態快照");

    Ok(VaultSnapshot {
        price,
        total_assets,
        total_shares,
        rate_ppm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn healthy_reader() -> MockVaultStateReader {
        let mut reader = MockVaultStateReader::new();
        reader.expect_price().returning(|_, _| Ok(U256::from(2u64)));
        reader.expect_total_assets().returning(|_, _| Ok(U256::from(1_000u64)));
        reader.expect_total_shares().returning(|_, _| Ok(U256::from(500u64)));
        reader.expect_rate_ppm().returning(|_, _| Ok(38_000));
        reader
    }

    #[tokio::test]
    async fn test_read_snapshot_success() {
        let reader = healthy_reader();
        let snapshot = read_snapshot(&reader, 100, 1, Duration::from_secs(1)).await.unwrap();

        assert_eq!(snapshot.price, U256::from(2u64));
        assert_eq!(snapshot.total_assets, U256::from(1_000u64));
        assert_eq!(snapshot.total_shares, U256::from(500u64));
        assert_eq!(snapshot.rate_ppm, 38_000);
    }

    #[tokio::test]
    async fn test_single_failed_read_aborts_snapshot() {
        let mut reader = MockVaultStateReader::new();
        reader.expect_price().returning(|_, _| Ok(U256::from(2u64)));
        reader
            .expect_total_assets()
            .returning(|_, _| Err(anyhow::anyhow!("execution reverted")));
        reader.expect_total_shares().returning(|_, _| Ok(U256::from(500u64)));
        reader.expect_rate_ppm().returning(|_, _| Ok(38_000));

        let err = read_snapshot(&reader, 100, 1, Duration::from_secs(1)).await.unwrap_err();
        assert_matches!(
            err,
            LedgerError::StateRead {
                field: SnapshotField::TotalAssets,
                ..
            }
        );
        assert!(err.is_retryable());
    }

    struct SlowReader;

    #[async_trait]
    impl VaultStateReader for SlowReader {
        async fn price(&self, _: u64, _: u64) -> Result<U256> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(U256::from(1u64))
        }
        async fn total_assets(&self, _: u64, _: u64) -> Result<U256> {
            Ok(U256::from(1u64))
        }
        async fn total_shares(&self, _: u64, _: u64) -> Result<U256> {
            Ok(U256::from(1u64))
        }
        async fn rate_ppm(&self, _: u64, _: u64) -> Result<u32> {
            Ok(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_times_out() {
        let err = read_snapshot(&SlowReader, 100, 1, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_matches!(err, LedgerError::Timeout { stage: "price", .. });
    }
}

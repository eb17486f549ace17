#![allow(dead_code)]

use alloy_primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use savings_ledger::config::ImpliedYieldMode;
use savings_ledger::domain_types::{EventKind, VaultEvent};
use savings_ledger::ledger::{DailyLogEngine, EngineConfig, VaultStateReader};
use savings_ledger::storage::InMemoryDailyLogRepository;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const CHAIN_ID: u64 = 100;
pub const START_BLOCK: u64 = 42_067_509;
/// 2025-09-10 00:00:00 UTC
pub const INCEPTION: i64 = 1_757_462_400;
pub const DAY: i64 = 86_400;

/// 整數單位轉 18 位小數定點數
pub fn units(value: u64) -> U256 {
    U256::from(value) * U256::from(10u64).pow(U256::from(18u64))
}

/// 1 + micros / 1e6 的價格
pub fn price(micros: u64) -> U256 {
    units(1) + U256::from(micros) * U256::from(10u64).pow(U256::from(12u64))
}

pub fn event(kind: EventKind, amount: U256, timestamp_sec: i64, block: u64, tx: &str) -> VaultEvent {
    VaultEvent::new(CHAIN_ID, kind, timestamp_sec, block, amount, tx)
}

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        inception_timestamp: INCEPTION,
        inception_price: units(1),
        implied_yield_mode: ImpliedYieldMode::Daily,
        read_timeout: Duration::from_secs(1),
        store_timeout: Duration::from_secs(1),
        start_blocks: HashMap::from([(CHAIN_ID, START_BLOCK)]),
    }
}

/// 依區塊給出價格的金庫狀態，未指定的區塊價格為 1.0
#[derive(Default)]
pub struct ScriptedVaultReader {
    prices: HashMap<u64, U256>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl ScriptedVaultReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, block: u64, value: U256) -> Self {
        self.prices.insert(block, value);
        self
    }

    /// 每次讀取 price() 前等待，模擬 RPC 延遲
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// price() 被呼叫的次數
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VaultStateReader for ScriptedVaultReader {
    async fn price(&self, _chain_id: u64, block: u64) -> Result<U256> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.prices.get(&block).copied().unwrap_or_else(|| units(1)))
    }

    async fn total_assets(&self, _chain_id: u64, block: u64) -> Result<U256> {
        Ok(units(1_000_000) + U256::from(block))
    }

    async fn total_shares(&self, _chain_id: u64, _block: u64) -> Result<U256> {
        Ok(units(990_000))
    }

    async fn rate_ppm(&self, _chain_id: u64, _block: u64) -> Result<u32> {
        Ok(38_000)
    }
}

pub fn memory_engine(
    reader: ScriptedVaultReader,
) -> (DailyLogEngine, Arc<InMemoryDailyLogRepository>, Arc<ScriptedVaultReader>) {
    let store = Arc::new(InMemoryDailyLogRepository::new());
    let reader = Arc::new(reader);
    let engine = DailyLogEngine::new(engine_config(), store.clone(), reader.clone());
    (engine, store, reader)
}

/// 測試資料庫，未設定 TEST_DATABASE_URL 時返回 None 並略過測試
pub async fn setup_test_db() -> Option<PgPool> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;

    match PgPool::connect(&database_url).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            eprintln!("Failed to connect to test database: {}", e);
            None
        }
    }
}

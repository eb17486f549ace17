use crate::config::validation::{ValidationError, ValidationUtils, Validator};
use crate::utils::serde_helpers::parse_u256;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// 應用程序配置結構
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub database: DatabaseConfig,
    pub log: LogConfig,
    pub ledger: LedgerConfig,
    pub rpc: RpcConfig,
    pub chains: Vec<ChainConfig>,
}

impl ApplicationConfig {
    /// 依鏈 ID 查找鏈配置
    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

impl Validator for ApplicationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證各個部分的配置
        self.database.validate()?;
        self.log.validate()?;
        self.ledger.validate()?;
        self.rpc.validate()?;

        if self.chains.is_empty() {
            return Err(ValidationError::MissingField("chains".to_string()));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            chain.validate()?;
            if !seen.insert(chain.chain_id) {
                return Err(ValidationError::InvalidValue(format!(
                    "重複的鏈配置: chain_id = {}",
                    chain.chain_id
                )));
            }
        }

        Ok(())
    }
}

/// 數據庫配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Validator for DatabaseConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證數據庫配置
        ValidationUtils::not_empty(&self.host, "database.host")?;
        ValidationUtils::not_empty(&self.username, "database.username")?;
        ValidationUtils::not_empty(&self.database, "database.database")?;
        ValidationUtils::in_range(self.port, 1, 65535, "database.port")?;
        ValidationUtils::in_range(
            self.max_connections,
            self.min_connections.max(1),
            1000,
            "database.max_connections",
        )?;

        Ok(())
    }
}

impl DatabaseConfig {
    /// 獲取最大生命週期持續時間
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    /// 獲取獲取連接超時持續時間
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// 獲取閒置超時持續時間
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// 日誌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

impl Validator for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證日誌級別
        ValidationUtils::one_of(
            &self.level.to_lowercase().as_str(),
            &["trace", "debug", "info", "warn", "error"],
            "log.level",
        )?;

        // 驗證日誌格式
        ValidationUtils::one_of(
            &self.format.to_lowercase().as_str(),
            &["pretty", "json"],
            "log.format",
        )?;

        Ok(())
    }
}

/// 隱含收益率的年化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpliedYieldMode {
    /// 不論實際間隔，一律視為相隔一天（與歷史輸出逐位一致）
    #[default]
    Daily,
    /// 依兩個日桶的實際間隔年化
    TimeWeighted,
}

/// 日誌引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// 金庫起始時間（秒），累積收益率以此為基準
    pub inception_timestamp: i64,
    /// 起始價格，18 位小數定點數的十進位字串
    #[serde(default = "default_inception_price")]
    pub inception_price: String,
    #[serde(default)]
    pub implied_yield_mode: ImpliedYieldMode,
    pub read_timeout_ms: u64,
    pub store_timeout_ms: u64,
    pub max_concurrency: usize,
}

fn default_inception_price() -> String {
    "1000000000000000000".to_string()
}

impl LedgerConfig {
    /// 解析起始價格
    pub fn inception_price_value(&self) -> Result<U256, ValidationError> {
        parse_u256(&self.inception_price)
            .map_err(|e| ValidationError::InvalidValue(format!("ledger.inception_price: {}", e)))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Validator for LedgerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.inception_timestamp <= 0 {
            return Err(ValidationError::InvalidValue(
                "ledger.inception_timestamp 必須為正數".to_string(),
            ));
        }

        if self.inception_price_value()?.is_zero() {
            return Err(ValidationError::InvalidValue(
                "ledger.inception_price 不可為零".to_string(),
            ));
        }

        ValidationUtils::in_range(self.read_timeout_ms, 1, 300_000, "ledger.read_timeout_ms")?;
        ValidationUtils::in_range(self.store_timeout_ms, 1, 300_000, "ledger.store_timeout_ms")?;
        ValidationUtils::in_range(self.max_concurrency, 1, 1024, "ledger.max_concurrency")?;

        Ok(())
    }
}

/// JSON-RPC 客戶端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Validator for RpcConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::in_range(self.timeout_secs, 1, 300, "rpc.timeout_secs")?;
        ValidationUtils::in_range(self.max_retries, 0, 10, "rpc.max_retries")?;
        Ok(())
    }
}

/// 單條鏈的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    /// svZCHF 金庫合約地址
    pub vault_address: String,
    /// 金庫部署區塊，早於此區塊的事件視為無效
    pub start_block: u64,
}

impl ChainConfig {
    /// 解析金庫地址
    pub fn vault(&self) -> Result<Address, ValidationError> {
        self.vault_address.parse::<Address>().map_err(|e| {
            ValidationError::InvalidValue(format!(
                "chains[{}].vault_address '{}': {}",
                self.chain_id, self.vault_address, e
            ))
        })
    }
}

impl Validator for ChainConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.chain_id == 0 {
            return Err(ValidationError::InvalidValue(
                "chains.chain_id 不可為 0".to_string(),
            ));
        }
        ValidationUtils::not_empty(&self.name, "chains.name")?;
        ValidationUtils::not_empty(&self.rpc_url, "chains.rpc_url")?;
        self.vault()?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// 測試用的完整配置
    pub fn sample_config() -> ApplicationConfig {
        ApplicationConfig {
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                username: "ledger".to_string(),
                password: "ledger".to_string(),
                database: "ledger".to_string(),
                max_connections: 10,
                min_connections: 1,
                max_lifetime_secs: 1800,
                acquire_timeout_secs: 5,
                idle_timeout_secs: 600,
            },
            log: LogConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            ledger: LedgerConfig {
                inception_timestamp: 1_700_000_000,
                inception_price: default_inception_price(),
                implied_yield_mode: ImpliedYieldMode::Daily,
                read_timeout_ms: 5_000,
                store_timeout_ms: 5_000,
                max_concurrency: 8,
            },
            rpc: RpcConfig {
                timeout_secs: 10,
                max_retries: 3,
                retry_delay_ms: 200,
            },
            chains: vec![ChainConfig {
                chain_id: 100,
                name: "gnosis".to_string(),
                rpc_url: "http://localhost:8545".to_string(),
                vault_address: "0x6165946250dd04740ab1409217e95a4f38374fe9".to_string(),
                start_block: 42_067_509,
            }],
        }
    }
}

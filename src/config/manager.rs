use crate::config::loader::{ConfigLoader, Environment};
use crate::config::types::ApplicationConfig;
use crate::config::validation::validate_config;
use config::ConfigError;
use std::path::Path;
use tracing::debug;

/// 加載並驗證當前環境的應用程序配置（在應用程序啟動時調用）
pub fn load_config() -> Result<ApplicationConfig, ConfigError> {
    let config = ApplicationConfig::load_from_env()?;
    debug!("配置初始化成功，環境：{:?}", Environment::from_env());
    Ok(config)
}

/// ApplicationConfig 加載方法實現
impl ApplicationConfig {
    /// 從環境變數指定的環境加載配置
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let env = Environment::from_env();
        debug!("從環境加載配置: {:?}", env);
        Self::load(env)
    }

    /// 從指定環境加載配置
    pub fn load(env: Environment) -> Result<Self, ConfigError> {
        Self::finish(ConfigLoader::load(env)?)
    }

    /// 從指定目錄與環境加載配置
    pub fn load_from(config_dir: &Path, env: Environment) -> Result<Self, ConfigError> {
        Self::finish(ConfigLoader::load_from(config_dir, env)?)
    }

    fn finish(source: config::Config) -> Result<Self, ConfigError> {
        // 使用 serde 反序列化配置
        let app_config: ApplicationConfig = source.try_deserialize()?;

        // 引擎依賴配置的正確性，驗證失敗即視為加載失敗
        validate_config(&app_config)
            .map_err(|err| ConfigError::Message(format!("配置驗證失敗: {}", err)))?;
        debug!("配置驗證通過");

        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ImpliedYieldMode;
    use crate::config::validation::Validator;
    use serial_test::serial;
    use std::env;
    use std::fs;

    const DEVELOPMENT_TOML: &str = r#"
[database]
host = "localhost"
port = 5432
username = "ledger"
password = "ledger"
database = "ledger"
max_connections = 10
min_connections = 1
max_lifetime_secs = 1800
acquire_timeout_secs = 5
idle_timeout_secs = 600

[log]
level = "debug"
format = "pretty"

[ledger]
inception_timestamp = 1700000000
implied_yield_mode = "daily"
read_timeout_ms = 5000
store_timeout_ms = 5000
max_concurrency = 4

[rpc]
timeout_secs = 10
max_retries = 3
retry_delay_ms = 200

[[chains]]
chain_id = 100
name = "gnosis"
rpc_url = "http://localhost:8545"
vault_address = "0x6165946250dd04740ab1409217e95a4f38374fe9"
start_block = 42067509
"#;

    #[test]
    #[serial]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("development.toml"), DEVELOPMENT_TOML).unwrap();

        let config = ApplicationConfig::load_from(dir.path(), Environment::Development)
            .expect("無法加載測試配置");

        assert_eq!(config.ledger.max_concurrency, 4);
        assert_eq!(config.ledger.implied_yield_mode, ImpliedYieldMode::Daily);
        assert_eq!(config.ledger.inception_price, "1000000000000000000");
        assert_eq!(config.chains.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("development.toml"), DEVELOPMENT_TOML).unwrap();

        env::set_var("LEDGER__LEDGER__MAX_CONCURRENCY", "16");
        let config = ApplicationConfig::load_from(dir.path(), Environment::Development);
        env::remove_var("LEDGER__LEDGER__MAX_CONCURRENCY");

        assert_eq!(config.unwrap().ledger.max_concurrency, 16);
    }

    #[test]
    #[serial]
    fn test_invalid_config_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let broken = DEVELOPMENT_TOML.replace("level = \"debug\"", "level = \"loud\"");
        fs::write(dir.path().join("development.toml"), broken).unwrap();

        assert!(ApplicationConfig::load_from(dir.path(), Environment::Development).is_err());
    }
}

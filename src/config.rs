/// 配置管理模組
///
/// 本模組負責加載、驗證和管理系統配置。
/// 配置以顯式結構傳入各元件的建構函數，不提供全局實例。
// 宣告子模組
pub mod loader;
pub mod manager;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use loader::{ConfigLoader, Environment};
pub use manager::load_config;
pub use types::*;
pub use validation::{validate_config, ValidationError, ValidationUtils, Validator};

#[cfg(test)]
mod tests {
    #[test]
    fn test_module_exports() {
        // 確保重要的導出可用
        let _ = super::Environment::Development;
        let _ = super::ValidationUtils::not_empty("test", "field");

        // 類型檢查
        fn _ensure_config_works(cfg: &super::ApplicationConfig) {
            let _ = &cfg.database;
            let _ = &cfg.log;
            let _ = &cfg.ledger;
            let _ = &cfg.rpc;
            let _ = &cfg.chains;
        }
    }
}

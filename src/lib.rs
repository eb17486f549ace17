// 模組定義
pub mod config;
pub mod data_ingestion;
pub mod domain_types;
pub mod ledger;
pub mod rpc;
pub mod storage;
pub mod utils;

pub mod daily_log;

// 重新匯出常用模型類型
pub use daily_log::*;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use savings_ledger::config::load_config;
use savings_ledger::storage;
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "migrate", about = "savings-ledger 數據庫遷移工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 運行所有未應用的遷移
    Run,

    /// 檢查遷移狀態
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日誌系統
    tracing_subscriber::fmt()
        .with_env_filter("savings_ledger=info")
        .with_span_events(FmtSpan::CLOSE)
        .init();

    // 解析命令行參數
    let cli = Cli::parse();

    let config = load_config().context("無法載入配置")?;
    let pool = storage::database::init_pool(&config.database)
        .await
        .context("無法初始化日誌資料庫連接池")?;

    match cli.command {
        Commands::Run => {
            info!("開始運行日誌資料庫遷移...");
            storage::run_migrations(&pool)
                .await
                .context("日誌資料庫遷移執行失敗")?;
            info!("日誌資料庫遷移完成！");
        }
        Commands::Status => {
            info!("檢查日誌資料庫遷移狀態...");
            let statuses = storage::migration_status(&pool)
                .await
                .context("無法讀取遷移狀態")?;
            for status in statuses {
                println!(
                    "{:>16}  {:<8}  {}",
                    status.version,
                    if status.applied { "applied" } else { "pending" },
                    status.description
                );
            }
        }
    }

    Ok(())
}

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use savings_ledger::config::{load_config, LogConfig};
use savings_ledger::data_ingestion::{EventReader, EventSource};
use savings_ledger::ledger::{BatchSummary, DailyLogEngine, EngineConfig};
use savings_ledger::rpc::RpcVaultStateReader;
use savings_ledger::storage::{
    database, run_migrations, InMemoryDailyLogRepository, LedgerStore, PgDailyLogRepository,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "savings_ledger", about = "svZCHF 金庫日聚合日誌更新工具")]
struct Cli {
    /// 事件來源：NDJSON 檔案路徑，`-` 代表標準輸入
    #[arg(short, long, default_value = "-")]
    events: String,

    /// 使用記憶體儲存，不寫入資料庫
    #[arg(long)]
    dry_run: bool,

    /// 同時處理的鏈數上限，預設取 ledger.max_concurrency
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// 處理前先執行資料庫遷移
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化配置
    let app_config = load_config().context("無法載入配置")?;

    // 初始化日誌系統
    init_logging(&app_config.log)?;

    let engine_config = EngineConfig::from_app_config(&app_config)?;
    let reader = Arc::new(RpcVaultStateReader::from_config(&app_config)?);

    let memory_store = Arc::new(InMemoryDailyLogRepository::new());
    let store: Arc<dyn LedgerStore> = if cli.dry_run {
        info!("試跑模式：結果只保存在記憶體");
        memory_store.clone()
    } else {
        let pool = database::init_pool(&app_config.database).await?;
        if cli.migrate {
            run_migrations(&pool).await.context("資料庫遷移執行失敗")?;
        }
        Arc::new(PgDailyLogRepository::new(pool))
    };

    let source = EventSource::from_arg(&cli.events);
    let report = EventReader::read(&source)
        .await
        .with_context(|| format!("無法讀取事件來源 {}", source))?;
    if !report.rejected.is_empty() {
        warn!("{} 行事件無法解析，已略過", report.rejected.len());
    }
    info!("從 {} 讀取 {} 筆事件", source, report.events.len());

    let concurrency = cli.concurrency.unwrap_or(app_config.ledger.max_concurrency);
    let engine = DailyLogEngine::new(engine_config, store, reader);

    // 中斷時放棄尚未完成的事件；已提交的合併不受影響，重送即可補齊
    let summary = tokio::select! {
        summary = engine.process_batch(report.events, concurrency) => summary,
        _ = signal::ctrl_c() => {
            warn!("接收到中斷信號，停止處理");
            return Err(anyhow!("處理被中斷"));
        }
    };

    print_summary(&summary)?;

    if cli.dry_run {
        for bucket in memory_store.snapshot().await {
            println!("{}", serde_json::to_string(&bucket)?);
        }
    }

    if !summary.failed.is_empty() {
        return Err(anyhow!(
            "{} 筆事件處理失敗（其中 {} 筆可重送）",
            summary.failed.len(),
            summary.retryable_failures()
        ));
    }

    Ok(())
}

fn print_summary(summary: &BatchSummary) -> Result<()> {
    for (event_id, err) in &summary.failed {
        error!("事件 {} 失敗 [{}]: {}", event_id, err.label(), err);
    }
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

// 初始化日誌系統
fn init_logging(log_config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,savings_ledger={}",
            log_config.level.to_lowercase()
        ))
    });

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if log_config.format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;

    info!("日誌系統初始化完成");
    Ok(())
}

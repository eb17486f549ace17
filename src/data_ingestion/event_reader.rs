//! NDJSON 事件讀取器
//!
//! 每行一個 JSON 物件，空行與 `#` 開頭的註解行會被略過。
//! 單行解析失敗不會中斷讀取，錯誤連同行號一併收集。

use crate::domain_types::VaultEvent;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// 事件讀取錯誤
#[derive(Debug, Error)]
pub enum EventReadError {
    #[error("檔案讀取錯誤: {0}")]
    IoError(#[from] std::io::Error),

    #[error("第 {line} 行解析失敗: {message}")]
    ParseError { line: usize, message: String },
}

/// 事件來源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    Stdin,
    File(PathBuf),
}

impl EventSource {
    /// `-` 代表標準輸入
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            EventSource::Stdin
        } else {
            EventSource::File(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Stdin => f.write_str("<stdin>"),
            EventSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 讀取結果
#[derive(Debug, Default)]
pub struct ReadReport {
    pub events: Vec<VaultEvent>,
    /// 解析失敗的行
    pub rejected: Vec<EventReadError>,
}

impl ReadReport {
    pub fn total_lines(&self) -> usize {
        self.events.len() + self.rejected.len()
    }
}

/// 解析單行；空行與註解行返回 `Ok(None)`
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<VaultEvent>, EventReadError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    serde_json::from_str::<VaultEvent>(trimmed)
        .map(Some)
        .map_err(|e| EventReadError::ParseError {
            line: line_no,
            message: e.to_string(),
        })
}

/// NDJSON 事件讀取器
pub struct EventReader;

impl EventReader {
    /// 從指定來源讀取全部事件
    pub async fn read(source: &EventSource) -> Result<ReadReport, EventReadError> {
        match source {
            EventSource::Stdin => Self::read_from(BufReader::new(tokio::io::stdin())).await,
            EventSource::File(path) => Self::read_file(path).await,
        }
    }

    pub async fn read_file<P: AsRef<Path>>(path: P) -> Result<ReadReport, EventReadError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            EventReadError::IoError(std::io::Error::new(
                e.kind(),
                format!("無法開啟事件檔案 {}: {}", path.display(), e),
            ))
        })?;
        Self::read_from(BufReader::new(file)).await
    }

    /// 從任意非同步緩衝讀取器讀取
    pub async fn read_from<R>(reader: R) -> Result<ReadReport, EventReadError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut report = ReadReport::default();
        let mut lines = reader.lines();
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            match parse_line(line_no, &line) {
                Ok(Some(event)) => report.events.push(event),
                Ok(None) => {}
                Err(e) => {
                    warn!("略過無效事件: {}", e);
                    report.rejected.push(e);
                }
            }
        }

        debug!(
            "事件讀取完成: {} 筆有效, {} 筆無效",
            report.events.len(),
            report.rejected.len()
        );
        Ok(report)
    }
}

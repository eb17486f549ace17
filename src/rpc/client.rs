//! JSON-RPC 客戶端
//!
//! 只涵蓋讀取金庫狀態所需的 `eth_call`；失敗的請求依配置重試，
//! 每次重試的等待時間隨嘗試次數線性增加。

use crate::config::RpcConfig;
use alloy_primitives::{hex, Address, Bytes};
use anyhow::{anyhow, Context, Result};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// JSON-RPC 請求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: &str, params: Vec<Value>, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }
}

/// JSON-RPC 回應
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
    pub id: u64,
}

/// 節點回報的 JSON-RPC 錯誤
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("RPC 錯誤 {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// 區塊高度轉十六進位區塊標籤
pub fn block_tag(block: u64) -> String {
    format!("0x{:x}", block)
}

/// 單一端點的 JSON-RPC 客戶端
pub struct JsonRpcClient {
    client: HttpClient,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>, config: &RpcConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(config.timeout())
            .user_agent(concat!("savings-ledger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow!("無法建立 HTTP 客戶端: {}", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 發送請求並取出 `result`
    ///
    /// 節點回報的 RPC 錯誤（如 revert）不重試；傳輸層錯誤依配置重試。
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let request = RpcRequest::new(method, params, self.next_id.fetch_add(1, Ordering::Relaxed));
        let attempts = self.max_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!("第 {}/{} 次呼叫 {} ({})", attempt, attempts, method, self.endpoint);

            match self.send(&request).await {
                Ok(response) => {
                    if let Some(error) = response.error {
                        return Err(anyhow::Error::new(error)
                            .context(format!("{} 被節點拒絕", method)));
                    }
                    return response
                        .result
                        .ok_or_else(|| anyhow!("{} 回應缺少 result 欄位", method));
                }
                Err(e) => {
                    warn!(
                        "RPC 呼叫 {} 失敗 (第 {}/{} 次): {}",
                        self.endpoint, attempt, attempts, e
                    );
                    last_error = Some(e);

                    if attempt < attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("所有 RPC 嘗試皆失敗")))
    }

    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP 請求失敗: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP 錯誤: 狀態碼 {}", response.status()));
        }

        response
            .json::<RpcResponse>()
            .await
            .map_err(|e| anyhow!("無法解析 RPC 回應: {}", e))
    }

    /// 在指定區塊執行唯讀合約呼叫
    pub async fn eth_call(&self, to: Address, data: &[u8], block: u64) -> Result<Bytes> {
        let params = vec![
            json!({
                "to": to.to_string(),
                "data": hex::encode_prefixed(data),
            }),
            Value::String(block_tag(block)),
        ];

        let result = self.call("eth_call", params).await?;
        let encoded = result
            .as_str()
            .ok_or_else(|| anyhow!("eth_call 回應不是字串: {}", result))?;

        hex::decode(encoded)
            .map(Bytes::from)
            .with_context(|| format!("eth_call 回應不是有效的十六進位: {}", encoded))
    }
}

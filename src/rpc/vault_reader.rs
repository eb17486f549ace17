use crate::config::ApplicationConfig;
use crate::ledger::snapshot::VaultStateReader;
use crate::rpc::client::JsonRpcClient;
use alloy_primitives::{keccak256, Address, U256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

/// 四字節函數選擇器
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// 解碼單一 ABI 字（前 32 字節）為 U256
pub fn decode_word(data: &[u8]) -> Result<U256> {
    if data.len() < 32 {
        return Err(anyhow!("回傳資料長度不足: {} 字節", data.len()));
    }
    U256::try_from_be_slice(&data[..32]).ok_or_else(|| anyhow!("無法解碼 uint256"))
}

struct ChainVault {
    client: JsonRpcClient,
    vault: Address,
}

/// 經由 JSON-RPC 讀取 svZCHF 金庫狀態
pub struct RpcVaultStateReader {
    chains: HashMap<u64, ChainVault>,
    price_selector: [u8; 4],
    total_assets_selector: [u8; 4],
    total_supply_selector: [u8; 4],
    rate_selector: [u8; 4],
}

impl RpcVaultStateReader {
    pub fn from_config(config: &ApplicationConfig) -> Result<Self> {
        let mut chains = HashMap::new();
        for chain in &config.chains {
            let vault = chain.vault().map_err(|e| anyhow!("{}", e))?;
            let client = JsonRpcClient::new(chain.rpc_url.clone(), &config.rpc)
                .with_context(|| format!("鏈 {} 的 RPC 客戶端建立失敗", chain.name))?;
            info!("鏈 {} ({}) 金庫 {} 經由 {}", chain.name, chain.chain_id, vault, chain.rpc_url);
            chains.insert(chain.chain_id, ChainVault { client, vault });
        }

        Ok(Self {
            chains,
            price_selector: selector("price()"),
            total_assets_selector: selector("totalAssets()"),
            total_supply_selector: selector("totalSupply()"),
            rate_selector: selector("currentRatePPM()"),
        })
    }

    async fn call_word(&self, chain_id: u64, block: u64, selector: [u8; 4], name: &str) -> Result<U256> {
        let chain = self
            .chains
            .get(&chain_id)
            .ok_or_else(|| anyhow!("未配置鏈 {} 的 RPC", chain_id))?;

        let data = chain
            .client
            .eth_call(chain.vault, &selector, block)
            .await
            .with_context(|| format!("{} @ {} 讀取失敗", name, block))?;

        decode_word(&data).with_context(|| format!("{} 回傳值無效", name))
    }
}

#[async_trait]
impl VaultStateReader for RpcVaultStateReader {
    async fn price(&self, chain_id: u64, block: u64) -> Result<U256> {
        self.call_word(chain_id, block, self.price_selector, "price()").await
    }

    async fn total_assets(&self, chain_id: u64, block: u64) -> Result<U256> {
        self.call_word(chain_id, block, self.total_assets_selector, "totalAssets()")
            .await
    }

    async fn total_shares(&self, chain_id: u64, block: u64) -> Result<U256> {
        self.call_word(chain_id, block, self.total_supply_selector, "totalSupply()")
            .await
    }

    async fn rate_ppm(&self, chain_id: u64, block: u64) -> Result<u32> {
        let value = self
            .call_word(chain_id, block, self.rate_selector, "currentRatePPM()")
            .await?;
        u32::try_from(value).map_err(|_| anyhow!("currentRatePPM() 超出 uint24 範圍: {}", value))
    }
}

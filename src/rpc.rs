// 鏈上金庫狀態讀取
//
// JSON-RPC `eth_call` 客戶端，以及基於它的 VaultStateReader 實現。

pub mod client;
pub mod vault_reader;

pub use client::{block_tag, JsonRpcClient, RpcError, RpcRequest, RpcResponse};
pub use vault_reader::{decode_word, selector, RpcVaultStateReader};

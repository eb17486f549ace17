// utils/serde_helpers.rs - 序列化與反序列化輔助函數
use alloy_primitives::U256;
use serde::{de, Deserialize, Deserializer, Serializer};

/// 鏈上金額接受的輸入形式
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Text(String),
    Number(u64),
}

/// 將 U256 序列化為十進位字串
///
/// 18 位小數的定點數常超過 JSON 數字的安全精度，因此一律以字串輸出。
pub fn serialize_u256<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// 從十進位字串、`0x` 十六進位字串或 JSON 整數反序列化 U256
///
/// # 使用範例
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Transfer {
///     #[serde(deserialize_with = "deserialize_u256")]
///     amount: U256,
/// }
/// ```
pub fn deserialize_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    match AmountRepr::deserialize(deserializer)? {
        AmountRepr::Number(n) => Ok(U256::from(n)),
        AmountRepr::Text(s) => parse_u256(&s).map_err(de::Error::custom),
    }
}

/// 解析十進位或 `0x` 前綴的十六進位字串
pub fn parse_u256(s: &str) -> Result<U256, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("金額不可為空字串".to_string());
    }

    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(trimmed, 10),
    };

    parsed.map_err(|e| format!("無效的金額 '{}': {}", trimmed, e))
}

use crate::utils::serde_helpers::{deserialize_u256, serialize_u256};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// 某區塊時點的金庫狀態（四個獨立讀取組成的邏輯快照）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    /// 每份額資產價格，18 位小數定點數
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub price: U256,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub total_assets: U256,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub total_shares: U256,
    /// 目前公告的年化利率 (ppm)
    pub rate_ppm: u32,
}

/// 衍生收益率，單位皆為 ppm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivedYields {
    pub native_yield: u32,
    pub implied_yield: i64,
    pub accumulative_yield: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_amounts_serialize_as_decimal_strings() {
        let snapshot = VaultSnapshot {
            price: U256::from(1_000_100_000_000_000_000u64),
            total_assets: U256::from(5_000u64),
            total_shares: U256::from(4_999u64),
            rate_ppm: 38_000,
        };

        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["price"], "1000100000000000000");
        assert_eq!(json["total_assets"], "5000");
        assert_eq!(json["rate_ppm"], 38_000);

        let back: VaultSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}

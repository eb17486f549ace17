use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 以鍵區分的非同步鎖集合
///
/// 同一鍵的持有者互斥，不同鍵互不影響。沒有持有者也沒有等待者時，
/// 鎖條目會在守衛釋放時移除，集合大小只與進行中的鍵數量相關。
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得指定鍵的鎖，必要時等待
    pub async fn lock(&self, key: &str) -> KeyedLockGuard<'_> {
        // 取出 Arc 後立即釋放 DashMap 分片鎖，再進行等待
        let mutex = Arc::clone(
            self.locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = mutex.lock_owned().await;

        KeyedLockGuard {
            owner: self,
            key: key.to_owned(),
            guard: Some(guard),
        }
    }

    /// 目前存在的鎖條目數
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// 鍵鎖守衛，釋放時清理無人使用的條目
pub struct KeyedLockGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLockGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedLockGuard<'_> {
    fn drop(&mut self) {
        // 先釋放互斥鎖，守衛內持有的 Arc 也隨之釋放
        drop(self.guard.take());
        self.owner
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

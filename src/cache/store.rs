use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::error::StoreError;

/// 共享计数/缓存存储的统一抽象
///
/// 限流器与缓存层共用同一个存储实例。实现者通过构造函数显式注入，
/// 不依赖任何全局单例，测试可以替换为 [`MemoryStore`]。
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// 记录一次准入事件并返回窗口内的当前计数
    ///
    /// 四个步骤必须作为同一个原子批次执行，保证返回的计数
    /// 恰好反映本次调用写入与清理之后的状态：
    /// 1. 以 `now_ms` 为分值和成员写入有序集合
    /// 2. 删除分值严格小于 `now_ms - window_ms` 的过期事件
    /// 3. 统计剩余事件数
    /// 4. 将键的过期时间刷新为 `expire_secs`，避免闲置键无限堆积
    async fn record_admission(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        expire_secs: i64,
    ) -> Result<u64, StoreError>;

    /// 读取字符串键
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 写入字符串键并设置 TTL
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// 按模式删除键，返回删除数量
    async fn del_matching(&self, pattern: &str) -> Result<u64, StoreError>;
}

/// 基于 Redis 的共享存储实现
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn record_admission(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        expire_secs: i64,
    ) -> Result<u64, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let cutoff = now_ms - window_ms;

        // MULTI/EXEC 保证四条命令之间不会插入其他调用方的命令，
        // ZCARD 读到的就是本次 ZADD + 清理之后的结果
        let mut pipe = redis::pipe();
        pipe.atomic()
            .zadd(key, now_ms.to_string(), now_ms)
            .ignore()
            .zrembyscore(key, "-inf", format!("({}", cutoff))
            .ignore()
            .zcard(key)
            .expire(key, expire_secs)
            .ignore();

        let (count,): (u64,) = pipe.query_async(&mut conn).await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del_matching(&self, pattern: &str) -> Result<u64, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // KEYS 会阻塞整个实例，这里用 SCAN 分批删除
        let mut removed: u64 = 0;
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(&keys).await?;
                removed += deleted;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(removed)
    }
}

/// 内存版共享存储
///
/// 测试用的注入替身，也可以在单机开发环境里顶替 Redis。
/// `set_unavailable` 用于模拟存储断连，验证各处的 fail-open 分支。
#[derive(Default)]
pub struct MemoryStore {
    kv: Mutex<HashMap<String, (String, Instant)>>,
    sets: Mutex<HashMap<String, BTreeSet<i64>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn record_admission(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        _expire_secs: i64,
    ) -> Result<u64, StoreError> {
        self.check_available()?;

        let mut sets = self.sets.lock().unwrap();
        let events = sets.entry(key.to_string()).or_default();
        // 成员就是毫秒时间戳本身，同一毫秒的事件自然合并
        events.insert(now_ms);

        let cutoff = now_ms - window_ms;
        events.retain(|&ts| ts >= cutoff);

        Ok(events.len() as u64)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;

        let mut kv = self.kv.lock().unwrap();
        match kv.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                kv.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        self.check_available()?;

        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        self.kv
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn del_matching(&self, pattern: &str) -> Result<u64, StoreError> {
        self.check_available()?;

        let mut kv = self.kv.lock().unwrap();
        let before = kv.len();
        match pattern.strip_suffix('*') {
            Some(prefix) => kv.retain(|key, _| !key.starts_with(prefix)),
            None => {
                kv.remove(pattern);
            }
        }
        Ok((before - kv.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_admission_prunes_events_outside_window() {
        let store = MemoryStore::new();

        assert_eq!(
            store.record_admission("rl:a", 1_000, 60_000, 61).await.unwrap(),
            1
        );
        assert_eq!(
            store.record_admission("rl:a", 2_000, 60_000, 61).await.unwrap(),
            2
        );
        // 第一条事件(1_000)已滑出窗口，第二条(2_000)恰好在窗口边界上保留
        assert_eq!(
            store.record_admission("rl:a", 62_000, 60_000, 61).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn record_admission_collapses_same_millisecond_events() {
        let store = MemoryStore::new();

        store.record_admission("rl:b", 5_000, 60_000, 61).await.unwrap();
        let count = store.record_admission("rl:b", 5_000, 60_000, 61).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn del_matching_removes_prefixed_keys_only() {
        let store = MemoryStore::new();

        store.set_ex("chapters:a", "1", 60).await.unwrap();
        store.set_ex("chapters:b", "2", 60).await.unwrap();
        store.set_ex("users:c", "3", 60).await.unwrap();

        let removed = store.del_matching("chapters:*").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.get("chapters:a").await.unwrap(), None);
        assert_eq!(store.get("users:c").await.unwrap(), Some("3".to_string()));
    }

    #[tokio::test]
    async fn unavailable_store_returns_explicit_error() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        assert!(matches!(
            store.get("chapters:a").await,
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(
            store.record_admission("rl:c", 1, 60_000, 61).await,
            Err(StoreError::Unavailable)
        ));
    }
}

/// 缓存操作模块

// 章节缓存操作模块
pub mod chapter;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::store::SharedStore;

/// 旁路缓存读路径
///
/// 命中直接反序列化返回，不触发 `loader`；未命中时回源加载，
/// 加载成功则以 `ttl_secs` 写回缓存并返回。
///
/// 存储读取失败按未命中处理（降级回源），写回失败只记录日志：
/// 缓存是尽力而为的，数据源才是权威。`loader` 的失败原样向上传播，
/// 此时不写缓存。
pub async fn read_through<T, E, F, Fut>(
    store: &Arc<dyn SharedStore>,
    key: &str,
    ttl_secs: u64,
    loader: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match store.get(key).await {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => return Ok(value),
            Err(e) => {
                // 缓存内容损坏时按未命中回源，下次写回会覆盖掉坏数据
                tracing::error!("Corrupt cache entry for key {}: {}", key, e);
            }
        },
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Cache read failed for key {}: {}", key, e);
        }
    }

    let value = loader().await?;

    match serde_json::to_string(&value) {
        Ok(json) => {
            if let Err(e) = store.set_ex(key, &json, ttl_secs).await {
                tracing::error!("Cache write failed for key {}: {}", key, e);
            }
        }
        Err(e) => {
            tracing::error!("Failed to serialize cache value for key {}: {}", key, e);
        }
    }

    Ok(value)
}

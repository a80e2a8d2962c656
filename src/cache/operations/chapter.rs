use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::keys::chapter_keys;
use crate::cache::store::SharedStore;

/// 章节缓存写路径操作
///
/// 上传产生了写入就整族失效，零写入则先查回显缓存、未命中才播种，
/// 所有路径都是尽力而为：存储故障只记日志，不影响上传结果。
pub struct ChapterCacheOperations;

impl ChapterCacheOperations {
    /// 批量上传成功后，删除所有章节相关缓存
    pub async fn invalidate_chapters(store: &Arc<dyn SharedStore>) {
        match store.del_matching(chapter_keys::CHAPTER_KEY_PATTERN).await {
            Ok(removed) => {
                tracing::info!("Invalidated {} chapter cache entries", removed);
            }
            Err(e) => {
                tracing::error!("Failed to invalidate chapter cache: {}", e);
            }
        }
    }

    /// 读取上传结果的回显缓存
    ///
    /// 键由结果本身序列化而来，同一批失败数据重复上传会算出同一个键，
    /// 命中时调用方直接返回缓存的结果，不再重复序列化与播种。
    /// 损坏的缓存内容和存储故障都按未命中处理。
    pub async fn get_upload_echo<T: Serialize + DeserializeOwned>(
        store: &Arc<dyn SharedStore>,
        result: &T,
    ) -> Option<T> {
        let key = chapter_keys::upload_echo_key(result);
        match store.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("Corrupt upload echo entry for key {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to read upload echo cache: {}", e);
                None
            }
        }
    }

    /// 上传未产生任何写入时，以上传结果为键播种回显缓存
    pub async fn seed_upload_echo<T: Serialize>(
        store: &Arc<dyn SharedStore>,
        result: &T,
        ttl_secs: u64,
    ) {
        let key = chapter_keys::upload_echo_key(result);
        let json = match serde_json::to_string(result) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize upload echo entry: {}", e);
                return;
            }
        };

        if let Err(e) = store.set_ex(&key, &json, ttl_secs).await {
            tracing::error!("Failed to seed upload echo cache: {}", e);
        }
    }
}

use thiserror::Error;

/// 共享存储访问的统一错误类型
///
/// 限流与缓存对存储故障都采取 fail-open 策略，
/// 调用方必须显式地对 `Err` 分支做出降级决策，而不是让异常向上冒泡。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 存储不可用（测试替身用其模拟断连场景）
    #[error("store unavailable")]
    Unavailable,
}

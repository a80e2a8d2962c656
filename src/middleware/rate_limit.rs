use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    cache::store::SharedStore,
    config::Config,
    error::StoreError,
    utils::{error_codes, error_to_api_response},
};

const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// 一次准入判定的结果
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub allowed: bool,
    /// 本次事件写入并清理过期事件之后，窗口内的计数
    pub current: u64,
    /// 窗口重置时刻，epoch 秒
    pub reset_at: i64,
}

/// 滑动窗口限流器
///
/// 每个请求对共享存储发起一次原子批次（写入事件、清理窗口外事件、
/// 计数、刷新过期时间），以计数结果决定是否放行。
///
/// 判定是"先记录后拒绝"：被拒绝的请求也已经写入了事件，仍然占用
/// 一个窗口名额。这是有意保留的取舍，换取单次往返的简单实现。
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn SharedStore>,
    config: Arc<Config>,
    exempt_paths: Vec<String>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn SharedStore>, config: Config) -> Self {
        // 注册和登录不限流，精确匹配
        let exempt_paths = vec![
            format!("{}/auth/signup", config.api_base_uri),
            format!("{}/auth/login", config.api_base_uri),
        ];
        Self {
            store,
            config: Arc::new(config),
            exempt_paths,
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    pub fn ceiling(&self) -> u32 {
        self.config.rate_limit_requests
    }

    /// 判定 `rate_key` 在 `now_ms` 时刻的请求是否准入
    ///
    /// 存储故障以 `Err` 显式返回，由调用方决定降级策略（中间件选择放行）。
    pub async fn admit(&self, rate_key: &str, now_ms: i64) -> Result<Admission, StoreError> {
        let key = format!("rate_limit:ip:{}", rate_key);
        let window = self.config.rate_limit_window();
        let window_ms = window.as_millis() as i64;

        let current = self
            .store
            .record_admission(&key, now_ms, window_ms, window.as_secs() as i64 + 1)
            .await?;

        Ok(Admission {
            allowed: current <= self.config.rate_limit_requests as u64,
            current,
            reset_at: ((now_ms + window_ms) as u64).div_ceil(1000) as i64,
        })
    }
}

/// 从请求中解析限流身份（客户端 IP）
///
/// 优先级：x-real-ip、x-forwarded-for 的第一个非空项、连接信息。
fn resolve_client_ip(req: &Request<Body>) -> Option<String> {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    req.headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .map(|s| s.trim().to_string())
        .or(remote_ip)
        .filter(|s| !s.is_empty())
}

/// 限流中间件
///
/// 豁免路径直接放行；解析不出客户端 IP 或存储故障时同样放行（fail-open），
/// 服务可用性优先于限流的严格性。被拒绝的请求以 429 短路，不再进入下游。
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if limiter.is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let ip = match resolve_client_ip(&req) {
        Some(ip) => ip,
        None => {
            tracing::warn!("Rate limiter: could not determine client IP, failing open");
            return next.run(req).await;
        }
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    let admission = match limiter.admit(&ip, now_ms).await {
        Ok(admission) => admission,
        Err(e) => {
            tracing::error!("Rate limiter store error for IP {}: {}", ip, e);
            return next.run(req).await;
        }
    };

    if !admission.allowed {
        tracing::warn!(
            "Rate limit exceeded for IP {}: {} requests in window",
            ip,
            admission.current
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            error_to_api_response::<()>(error_codes::RATE_LIMIT, "Too Many Requests".to_string()),
        )
            .into_response();
    }

    let ceiling = limiter.ceiling();
    let remaining = (ceiling as u64).saturating_sub(admission.current) as u32;

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, HeaderValue::from(ceiling));
    headers.insert(HEADER_REMAINING, HeaderValue::from(remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(admission.reset_at));
    response
}

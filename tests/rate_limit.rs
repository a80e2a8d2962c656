use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use chapters_backend::{
    cache::store::{MemoryStore, SharedStore},
    config::Config,
    middleware::{RateLimiter, rate_limit},
};
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        redis_host: "localhost".to_string(),
        redis_port: 6379,
        redis_username: None,
        redis_password: None,
        redis_tls: false,
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_secs: 3600,
        rate_limit_window_secs: 60,
        rate_limit_requests: 30,
        cache_ttl_secs: 3600,
        server_host: "127.0.0.1".to_string(),
        server_port: 3000,
        api_base_uri: "/api/v1".to_string(),
    }
}

fn test_app(store: Arc<dyn SharedStore>) -> Router {
    let limiter = Arc::new(RateLimiter::new(store, test_config()));
    Router::new()
        .route("/api/v1/chapters", get(|| async { "ok" }))
        .route("/api/v1/auth/login", post(|| async { "ok" }))
        .layer(from_fn_with_state(limiter, rate_limit))
}

fn chapters_request(ip: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/v1/chapters")
        .header("x-real-ip", ip)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// 同一毫秒的准入事件会合并为一条（成员就是毫秒时间戳），
// 计数类测试在请求之间隔开 2ms，保证每次请求都是独立事件
async fn spaced() {
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
}

#[tokio::test]
async fn thirty_admitted_then_429_with_decreasing_remaining() {
    let app = test_app(Arc::new(MemoryStore::new()));

    for i in 1..=30u32 {
        spaced().await;
        let response = app.clone().oneshot(chapters_request("1.2.3.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {} admitted", i);

        let headers = response.headers();
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "30");
        assert_eq!(
            headers.get("x-ratelimit-remaining").unwrap().to_str().unwrap(),
            (30 - i).to_string(),
            "remaining decreases strictly on request {}",
            i
        );
        assert!(headers.contains_key("x-ratelimit-reset"));
    }

    spaced().await;
    let response = app.clone().oneshot(chapters_request("1.2.3.4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let body = body_json(response).await;
    assert_eq!(body["msg"], "Too Many Requests");
}

#[tokio::test]
async fn rejection_does_not_leak_rate_limit_headers() {
    let app = test_app(Arc::new(MemoryStore::new()));

    for _ in 0..30 {
        spaced().await;
        app.clone().oneshot(chapters_request("5.6.7.8")).await.unwrap();
    }

    spaced().await;
    let rejected = app.clone().oneshot(chapters_request("5.6.7.8")).await.unwrap();
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(!rejected.headers().contains_key("x-ratelimit-remaining"));
}

#[tokio::test]
async fn different_ips_do_not_share_a_window() {
    let app = test_app(Arc::new(MemoryStore::new()));

    for _ in 0..30 {
        spaced().await;
        app.clone().oneshot(chapters_request("10.0.0.1")).await.unwrap();
    }
    spaced().await;
    assert_eq!(
        app.clone().oneshot(chapters_request("10.0.0.1")).await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    let other = app.clone().oneshot(chapters_request("10.0.0.2")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn exempt_paths_are_never_rejected() {
    let app = test_app(Arc::new(MemoryStore::new()));

    for _ in 0..40 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header("x-real-ip", "1.2.3.4")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn store_outage_fails_open() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);
    let app = test_app(store);

    // 存储完全不可用时请求照常放行，没有限流头，也没有任何错误冒出中间件
    for _ in 0..35 {
        let response = app.clone().oneshot(chapters_request("1.2.3.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn unresolvable_client_ip_fails_open() {
    let app = test_app(Arc::new(MemoryStore::new()));

    // 既没有代理头也没有连接信息，无法得出限流身份，放行且不限量
    for _ in 0..35 {
        let request = Request::builder()
            .uri("/api/v1/chapters")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn forwarded_for_header_is_used_when_real_ip_missing() {
    let app = test_app(Arc::new(MemoryStore::new()));

    for _ in 0..30 {
        spaced().await;
        let request = Request::builder()
            .uri("/api/v1/chapters")
            .header("x-forwarded-for", "7.7.7.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap();
    }

    // 第一个非空转发项作为限流身份
    spaced().await;
    let request = Request::builder()
        .uri("/api/v1/chapters")
        .header("x-forwarded-for", "7.7.7.7, 192.168.0.9")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

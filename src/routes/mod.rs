use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
};

pub mod chapter;
pub mod user;

/// 组装完整路由
///
/// 限流中间件在最外层，除豁免路径外所有请求先过准入判定；
/// 管理员校验在上传处理器内完成。
pub fn create_router(state: AppState, rate_limiter: Arc<RateLimiter>) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(user::signup))
        .route("/auth/login", post(user::login))
        .route(
            "/chapters",
            get(chapter::get_chapters).post(chapter::upload_chapters),
        )
        .route("/chapters/{id}", get(chapter::get_chapter_by_id));

    let protected_routes = Router::new()
        .route("/users/me", get(user::get_me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_base = state.config.api_base_uri.clone();

    Router::new()
        .nest(
            &api_base,
            Router::new().merge(public_routes).merge(protected_routes),
        )
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            rate_limit,
        ))
        .with_state(state)
}

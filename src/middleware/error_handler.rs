use axum::{
    body::{Body, to_bytes},
    http::{Request, header},
    middleware::Next,
    response::Response,
};

// 信封错误体很小，超过这个上限说明响应不是我们自己的信封
const MAX_LOGGED_BODY_BYTES: usize = 1024;

/// 把 5xx 响应连同请求方法和路径记入日志，便于排查
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_LOGGED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(
                "Server error on {} {} - Status: {}, body unreadable: {}",
                method,
                path,
                parts.status,
                e
            );
            return Response::from_parts(parts, Body::empty());
        }
    };

    tracing::error!(
        "Server error on {} {} - Status: {}, Body: {}",
        method,
        path,
        parts.status,
        String::from_utf8_lossy(&bytes)
    );

    // body 已被读出，重建响应并清掉原先的长度头
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}

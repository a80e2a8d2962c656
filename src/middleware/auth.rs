use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    config::Config,
    utils::{ApiResponse, Claims, error_codes, error_to_api_response, verify_token},
};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// 认证中间件
///
/// 校验 Bearer 令牌，并把解析出的用户声明写入请求扩展供下游处理器使用。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(req.headers()) {
        Some(token) => token.to_string(),
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response::<()>(
                    error_codes::AUTH_FAILED,
                    "Unauthorized: No token provided".to_string(),
                ),
            )
                .into_response();
        }
    };

    match verify_token(&token, &state.config) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!("Token verification failed: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                error_to_api_response::<()>(
                    error_codes::AUTH_FAILED,
                    "Unauthorized: Invalid token".to_string(),
                ),
            )
                .into_response()
        }
    }
}

/// 校验请求携带管理员令牌，上传等特权操作使用
pub fn authorize_admin<T>(
    headers: &HeaderMap,
    config: &Config,
) -> Result<Claims, (StatusCode, Json<ApiResponse<T>>)> {
    let token = bearer_token(headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(
                error_codes::AUTH_FAILED,
                "Unauthorized: No token provided".to_string(),
            ),
        )
    })?;

    let claims = verify_token(token, config).map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(
                error_codes::AUTH_FAILED,
                "Unauthorized: Invalid token".to_string(),
            ),
        )
    })?;

    if claims.role != "admin" {
        tracing::error!("Access denied: user {} is not an admin", claims.sub);
        return Err((
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "Forbidden: Admin access required".to_string(),
            ),
        ));
    }

    Ok(claims)
}

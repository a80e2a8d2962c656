use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    database::repositories::user::UserRepository,
    utils::{
        Claims, error_codes, error_to_api_response, generate_token, success_to_api_response,
        verify_password,
    },
};

use super::model::{AuthResponse, LoginRequest, SignupRequest, UserDetails};

/// 用户注册
#[axum::debug_handler]
pub async fn signup(State(state): State<AppState>, Json(req): Json<SignupRequest>) -> Response {
    if !req.email.contains('@') || req.password.len() < 8 {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response::<AuthResponse>(
                error_codes::VALIDATION_ERROR,
                "Email must be valid and password at least 8 characters".to_string(),
            ),
        )
            .into_response();
    }

    match UserRepository::create(
        &state.pool,
        &req.email,
        &req.password,
        &req.first_name,
        &req.last_name,
    )
    .await
    {
        Ok(user) => match generate_token(&user.user_pid, &user.role, &state.config) {
            Ok((token, expires_at)) => (
                StatusCode::CREATED,
                success_to_api_response(AuthResponse {
                    user_pid: user.user_pid,
                    email: user.email,
                    token,
                    expires_at,
                }),
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Failed to generate token: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_to_api_response::<AuthResponse>(
                        error_codes::INTERNAL_ERROR,
                        "Failed to generate token".to_string(),
                    ),
                )
                    .into_response()
            }
        },
        Err(e) => {
            if e.to_string().contains("unique constraint") {
                (
                    StatusCode::CONFLICT,
                    error_to_api_response::<AuthResponse>(
                        error_codes::USER_EXISTS,
                        "User already exists".to_string(),
                    ),
                )
                    .into_response()
            } else {
                tracing::error!("Failed to create user: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_to_api_response::<AuthResponse>(
                        error_codes::INTERNAL_ERROR,
                        "Failed to create user".to_string(),
                    ),
                )
                    .into_response()
            }
        }
    }
}

/// 用户登录
#[axum::debug_handler]
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let user = match UserRepository::find_by_email(&state.pool, &req.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response::<AuthResponse>(
                    error_codes::AUTH_FAILED,
                    "Invalid email or password".to_string(),
                ),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to look up user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<AuthResponse>(
                    error_codes::INTERNAL_ERROR,
                    "Database error".to_string(),
                ),
            )
                .into_response();
        }
    };

    match verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response::<AuthResponse>(
                    error_codes::AUTH_FAILED,
                    "Invalid email or password".to_string(),
                ),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Password verification error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<AuthResponse>(
                    error_codes::INTERNAL_ERROR,
                    "Internal server error".to_string(),
                ),
            )
                .into_response();
        }
    }

    match generate_token(&user.user_pid, &user.role, &state.config) {
        Ok((token, expires_at)) => (
            StatusCode::OK,
            success_to_api_response(AuthResponse {
                user_pid: user.user_pid,
                email: user.email,
                token,
                expires_at,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to generate token: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<AuthResponse>(
                    error_codes::INTERNAL_ERROR,
                    "Failed to generate token".to_string(),
                ),
            )
                .into_response()
        }
    }
}

/// 当前用户信息（需要认证）
#[axum::debug_handler]
pub async fn get_me(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> Response {
    match UserRepository::find_by_pid(&state.pool, &claims.sub).await {
        Ok(Some(user)) => {
            (StatusCode::OK, success_to_api_response(UserDetails::from(user))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response::<UserDetails>(
                error_codes::NOT_FOUND,
                "User not found".to_string(),
            ),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch user {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<UserDetails>(
                    error_codes::INTERNAL_ERROR,
                    "Database error".to_string(),
                ),
            )
                .into_response()
        }
    }
}

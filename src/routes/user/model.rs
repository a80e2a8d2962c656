use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::entities::user::UserEntity;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_pid: String,
    pub email: String,
    pub token: String,
    pub expires_at: i64,
}

/// 当前用户详情响应
#[derive(Debug, Serialize)]
pub struct UserDetails {
    pub user_pid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for UserDetails {
    fn from(entity: UserEntity) -> Self {
        UserDetails {
            user_pid: entity.user_pid,
            email: entity.email,
            first_name: entity.first_name,
            last_name: entity.last_name,
            role: entity.role,
            created_at: entity.created_at,
        }
    }
}

use chrono::{DateTime, Utc};

/// 用户数据库实体
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserEntity {
    pub user_pid: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use sqlx::PgPool;

use crate::database::entities::user::UserEntity;
use crate::utils::{generate_public_id, hash_password, id_prefixes};

const USER_COLUMNS: &str =
    "user_pid, email, password_hash, first_name, last_name, role, created_at, updated_at";

/// 用户存储库实现
pub struct UserRepository;

impl UserRepository {
    /// 创建普通用户
    pub async fn create(
        pool: &PgPool,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserEntity, sqlx::Error> {
        let password_hash = hash_password(password)
            .map_err(|e| sqlx::Error::Protocol(format!("Failed to hash password: {}", e)))?;
        let user_pid = generate_public_id(id_prefixes::USER);

        let user = sqlx::query_as::<_, UserEntity>(&format!(
            "INSERT INTO users (user_pid, email, password_hash, first_name, last_name, role) \
             VALUES ($1, $2, $3, $4, $5, 'user') RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user_pid)
        .bind(email)
        .bind(&password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// 根据邮箱查找用户
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// 根据公开ID查找用户
    pub async fn find_by_pid(
        pool: &PgPool,
        user_pid: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {} FROM users WHERE user_pid = $1",
            USER_COLUMNS
        ))
        .bind(user_pid)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}

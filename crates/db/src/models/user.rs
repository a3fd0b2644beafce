use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: i64,
    pub user_name: Option<String>,
    pub user_email: String,
    #[serde(skip)]
    #[ts(skip)]
    pub user_password: String,
    pub user_telephone: Option<String>,
    pub user_fk_company_id: i64, // Foreign key to Company
    pub user_fk_role_id: Option<i64>, // Foreign key to Role
    pub user_is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub user_name: Option<String>,
    pub user_email: String,
    /// Already hashed
    pub user_password: String,
    pub user_fk_company_id: i64,
    pub user_fk_role_id: Option<i64>,
}

const USER_COLUMNS: &str = "id, user_name, user_email, user_password, user_telephone, \
    user_fk_company_id, user_fk_role_id, user_is_active, created_at, updated_at";

impl User {
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Like `find_by_id`, but only within `company_id` when one is given
    pub async fn find_in_company(
        pool: &SqlitePool,
        id: i64,
        company_id: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND (? IS NULL OR user_fk_company_id = ?)"
        ))
        .bind(id)
        .bind(company_id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Whether another user (other than `exclude_id`) already owns `email`
    pub async fn email_taken(
        pool: &SqlitePool,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let taken: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM users WHERE user_email = ? COLLATE NOCASE AND (? IS NULL OR id <> ?) LIMIT 1",
        )
        .bind(email)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_optional(pool)
        .await?;
        Ok(taken.is_some())
    }

    pub async fn create(pool: &SqlitePool, data: &CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (user_name, user_email, user_password, user_fk_company_id, user_fk_role_id)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&data.user_name)
        .bind(&data.user_email)
        .bind(&data.user_password)
        .bind(data.user_fk_company_id)
        .bind(data.user_fk_role_id)
        .fetch_one(pool)
        .await
    }

    pub async fn set_role<'e, E>(
        executor: E,
        user_id: i64,
        role_id: Option<i64>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE users SET user_fk_role_id = ?, updated_at = datetime('now', 'subsec') WHERE id = ?",
        )
        .bind(role_id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Company {
    pub id: i64,
    pub company_name: String,
    pub company_email: Option<String>,
    pub company_is_active: bool,
    pub created_at: DateTime<Utc>,
}

const COMPANY_COLUMNS: &str = "id, company_name, company_email, company_is_active, created_at";

impl Company {
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE company_email = ?"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Whether a company other than `exclude_id` already has `cnpj`
    pub async fn cnpj_taken(
        pool: &SqlitePool,
        cnpj: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let taken: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM companies WHERE company_cnpj = ? AND (? IS NULL OR id <> ?) LIMIT 1",
        )
        .bind(cnpj)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_optional(pool)
        .await?;
        Ok(taken.is_some())
    }

    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        email: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO companies (company_name, company_email) VALUES (?, ?)
             RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .fetch_one(pool)
        .await
    }
}

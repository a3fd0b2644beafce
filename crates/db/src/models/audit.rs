use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type, types::Json};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "audit_action", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Audit {
    pub id: i64,
    pub audit_entity_name: String,
    pub audit_entity_id: Option<i64>,
    pub audit_action: AuditAction,
    #[ts(type = "unknown")]
    pub audit_old_values: Option<Json<Value>>,
    #[ts(type = "unknown")]
    pub audit_new_values: Option<Json<Value>>,
    pub audit_observation: Option<String>,
    pub audit_fk_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAudit {
    pub entity_name: String,
    pub entity_id: Option<i64>,
    pub action: AuditAction,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub observation: Option<String>,
    pub user_id: Option<i64>,
}

const AUDIT_COLUMNS: &str = "id, audit_entity_name, audit_entity_id, audit_action, \
    audit_old_values, audit_new_values, audit_observation, audit_fk_user_id, created_at";

impl Audit {
    pub async fn create<'e, E>(executor: E, data: &CreateAudit) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            "INSERT INTO audits (audit_entity_name, audit_entity_id, audit_action,
                audit_old_values, audit_new_values, audit_observation, audit_fk_user_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&data.entity_name)
        .bind(data.entity_id)
        .bind(data.action)
        .bind(data.old_values.as_ref().map(Json))
        .bind(data.new_values.as_ref().map(Json))
        .bind(&data.observation)
        .bind(data.user_id)
        .fetch_one(executor)
        .await
    }

    /// Entries for one entity, newest first
    pub async fn find_by_entity(
        pool: &SqlitePool,
        entity_name: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Audit>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audits
             WHERE audit_entity_name = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(entity_name)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_entity(pool: &SqlitePool, entity_name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM audits WHERE audit_entity_name = ?")
            .bind(entity_name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_record(
        pool: &SqlitePool,
        entity_name: &str,
        entity_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Audit>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audits
             WHERE audit_entity_name = ? AND audit_entity_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(entity_name)
        .bind(entity_id)
        .fetch_all(pool)
        .await
    }
}

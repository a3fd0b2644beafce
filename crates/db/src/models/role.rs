use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;

pub const ACTIONS: [&str; 4] = ["create", "read", "update", "delete"];

/// `{ "<resource>": { "<action>": bool } }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
pub struct RolePermissions(pub BTreeMap<String, BTreeMap<String, bool>>);

impl RolePermissions {
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.0
            .get(resource)
            .and_then(|actions| actions.get(action))
            .copied()
            .unwrap_or(false)
    }

    /// Every action granted on every given resource
    pub fn full_access<'a>(resources: impl IntoIterator<Item = &'a str>) -> Self {
        let actions: BTreeMap<String, bool> =
            ACTIONS.iter().map(|a| (a.to_string(), true)).collect();
        Self(
            resources
                .into_iter()
                .map(|resource| (resource.to_string(), actions.clone()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Role {
    pub id: i64,
    pub role_name: String,
    pub role_description: Option<String>,
    #[ts(type = "Record<string, Record<string, boolean>>")]
    pub role_permissions: Json<RolePermissions>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ROLE_COLUMNS: &str =
    "id, role_name, role_description, role_permissions, created_at, updated_at";

impl Role {
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE role_name = ?"
        ))
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        description: Option<&str>,
        permissions: &RolePermissions,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Role>(&format!(
            "INSERT INTO roles (role_name, role_description, role_permissions)
             VALUES (?, ?, ?)
             RETURNING {ROLE_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .bind(Json(permissions))
        .fetch_one(pool)
        .await
    }

    pub async fn set_permissions(
        pool: &SqlitePool,
        id: i64,
        permissions: &RolePermissions,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE roles SET role_permissions = ?, updated_at = datetime('now', 'subsec') WHERE id = ?",
        )
        .bind(Json(permissions))
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

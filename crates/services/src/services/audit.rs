//! Change log written alongside every entity write.

use db::{
    entities,
    metadata::EntityDef,
    models::{
        audit::{Audit, AuditAction, CreateAudit},
        record::{Record, record_id},
    },
};
use serde_json::{Map, Value};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use utils::response::PaginationMeta;

/// One change about to be written to the audit log
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub def: &'static EntityDef,
    pub action: AuditAction,
    pub old: Option<&'a Record>,
    pub new: Option<&'a Record>,
    pub observation: Option<String>,
    pub user_id: Option<i64>,
}

pub struct AuditService;

impl AuditService {
    pub async fn log_change<'e, E>(executor: E, entry: AuditEntry<'_>) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let entity_id = entry
            .new
            .and_then(record_id)
            .or_else(|| entry.old.and_then(record_id));
        debug!(
            entity = entry.def.name,
            action = %entry.action,
            entity_id = ?entity_id,
            "Recording audit entry"
        );
        Audit::create(
            executor,
            &CreateAudit {
                entity_name: entry.def.name.to_string(),
                entity_id,
                action: entry.action,
                old_values: entry.old.map(|r| snapshot(entry.def, r)),
                new_values: entry.new.map(|r| snapshot(entry.def, r)),
                observation: entry.observation,
                user_id: entry.user_id,
            },
        )
        .await
    }

    /// Paged history for one entity, newest first.
    ///
    /// `entity` may be a slug (`projects`) or a model name (`Project`).
    pub async fn entity_history(
        pool: &SqlitePool,
        entity: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Audit>, PaginationMeta), sqlx::Error> {
        let entity_name = entities::find(entity).map(|def| def.name).unwrap_or(entity);
        let page = page.max(1);
        let limit = limit.clamp(1, 1000);
        let offset = i64::from(page - 1) * i64::from(limit);
        let total = Audit::count_by_entity(pool, entity_name).await?;
        let entries = Audit::find_by_entity(pool, entity_name, i64::from(limit), offset).await?;
        Ok((entries, PaginationMeta::new(total, page, limit)))
    }
}

/// Column values of `record` safe to persist: no hidden columns, no embedded relations
pub fn snapshot(def: &'static EntityDef, record: &Record) -> Value {
    let values: Map<String, Value> = def
        .visible_columns()
        .filter_map(|column| {
            record
                .get(column.name)
                .map(|value| (column.name.to_string(), value.clone()))
        })
        .collect();
    Value::Object(values)
}

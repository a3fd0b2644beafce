//! Generic CRUD over any registered entity.
//!
//! An [`EntityService`] is bound to one [`EntityDef`] and is shared by every
//! request touching that entity. Per-request state (who is acting, on behalf of
//! which company) travels in an explicit [`ServiceContext`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use db::{
    DBService,
    metadata::{ColumnDef, EntityDef, FieldConfig, FormMetadata},
    models::{
        audit::AuditAction,
        record::{self, Criteria, OrderBy, Predicate, Record},
    },
    value::{SqlValue, ValueError},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::error::ErrorKind;
use thiserror::Error;
use tracing::{debug, info};
use utils::{i18n::Message, response::PaginationMeta};

use super::{
    audit::{AuditEntry, AuditService},
    company::CompanyHooks,
    config::ServiceConfig,
    user::UserHooks,
};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 1000;
pub const DEFAULT_DELIMITER: &str = " - ";

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} records are read-only")]
    ReadOnly(&'static str),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<sqlx::Error> for EntityError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    return EntityError::Conflict(Message::DuplicateValue.to_string());
                }
                ErrorKind::ForeignKeyViolation => {
                    return EntityError::Conflict(Message::RelatedRecords.to_string());
                }
                ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    return EntityError::Validation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        EntityError::Database(e)
    }
}

/// Who is acting, and for which company
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceContext {
    pub user_id: Option<i64>,
    pub company_id: Option<i64>,
}

impl ServiceContext {
    pub fn new(user_id: i64, company_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            company_id: Some(company_id),
        }
    }
}

/// Extension points around writes. Every method defaults to a no-op.
#[async_trait]
pub trait EntityHooks: Send + Sync {
    async fn before_create(
        &self,
        _ctx: &ServiceContext,
        _data: &mut Record,
    ) -> Result<(), EntityError> {
        Ok(())
    }

    async fn after_create(&self, _ctx: &ServiceContext, _record: &Record) -> Result<(), EntityError> {
        Ok(())
    }

    async fn before_update(
        &self,
        _ctx: &ServiceContext,
        _id: i64,
        _data: &mut Record,
    ) -> Result<(), EntityError> {
        Ok(())
    }

    async fn after_update(&self, _ctx: &ServiceContext, _record: &Record) -> Result<(), EntityError> {
        Ok(())
    }

    async fn before_delete(&self, _ctx: &ServiceContext, _id: i64) -> Result<(), EntityError> {
        Ok(())
    }

    async fn after_delete(&self, _ctx: &ServiceContext, _id: i64) -> Result<(), EntityError> {
        Ok(())
    }
}

pub struct NoHooks;

impl EntityHooks for NoHooks {}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `column:asc,other:desc`
    pub order: Option<String>,
}

impl PageRequest {
    fn resolve(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub records: Vec<Record>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub fields: Vec<String>,
    pub term: String,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct SelectRequest {
    pub label_fields: Option<Vec<String>>,
    pub delimiter: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(flatten)]
    pub config: FieldConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityFields {
    pub entity: &'static str,
    pub form: Option<FormMetadata>,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Clone)]
pub struct EntityService {
    def: &'static EntityDef,
    db: DBService,
    hooks: Arc<dyn EntityHooks>,
}

impl EntityService {
    pub fn new(db: DBService, def: &'static EntityDef, hooks: Arc<dyn EntityHooks>) -> Self {
        Self { def, db, hooks }
    }

    /// Service for `def` wired with the hooks that entity needs
    pub fn for_entity(db: DBService, def: &'static EntityDef, config: &ServiceConfig) -> Self {
        let hooks: Arc<dyn EntityHooks> = match def.slug {
            "users" => Arc::new(UserHooks::new(db.clone(), config.password_cost)),
            "companies" => Arc::new(CompanyHooks::new(db.clone())),
            _ => Arc::new(NoHooks),
        };
        Self::new(db, def, hooks)
    }

    pub fn def(&self) -> &'static EntityDef {
        self.def
    }

    pub async fn find_all(
        &self,
        ctx: &ServiceContext,
        page: &PageRequest,
    ) -> Result<Page, EntityError> {
        self.find_page(ctx, Criteria::new(), page).await
    }

    pub async fn find_by_id(
        &self,
        ctx: &ServiceContext,
        id: i64,
    ) -> Result<Option<Record>, EntityError> {
        let Some(found) = self.find_scoped(ctx, id).await? else {
            return Ok(None);
        };
        let mut records = vec![found];
        record::load_relations(&self.db.pool, self.def, &mut records).await?;
        Ok(records.pop())
    }

    /// AND-ed equality on known columns
    pub async fn find_by_conditions(
        &self,
        ctx: &ServiceContext,
        conditions: &Record,
        page: &PageRequest,
    ) -> Result<Page, EntityError> {
        let criteria = self.conditions(conditions)?;
        self.find_page(ctx, criteria, page).await
    }

    /// OR of substring matches over `fields`; an empty term or field list lists everything
    pub async fn search(
        &self,
        ctx: &ServiceContext,
        request: &SearchRequest,
    ) -> Result<Page, EntityError> {
        let term = request.term.trim();
        if term.is_empty() || request.fields.is_empty() {
            return self.find_all(ctx, &request.page).await;
        }
        let mut criteria = Criteria::new();
        for field in &request.fields {
            let column = self.visible_column(field.trim())?;
            criteria.any.push(Predicate::Like(column, term.to_string()));
        }
        self.find_page(ctx, criteria, &request.page).await
    }

    pub async fn count(
        &self,
        ctx: &ServiceContext,
        conditions: &Record,
    ) -> Result<i64, EntityError> {
        let criteria = self.scoped(ctx, self.conditions(conditions)?);
        Ok(record::count(&self.db.pool, self.def, &criteria).await?)
    }

    pub async fn create(&self, ctx: &ServiceContext, data: Record) -> Result<Record, EntityError> {
        self.create_with_observation(ctx, data, None).await
    }

    pub async fn update(
        &self,
        ctx: &ServiceContext,
        id: i64,
        mut data: Record,
    ) -> Result<Option<Record>, EntityError> {
        self.ensure_writable()?;
        if self.find_scoped(ctx, id).await?.is_none() {
            return Ok(None);
        }
        if let (Some(tenant), Some(_)) = (self.def.tenant_column, ctx.company_id) {
            data.remove(tenant);
        }
        self.hooks.before_update(ctx, id, &mut data).await?;

        let mut values = self.writable_values(&data)?;
        if let Some(column) = self.def.column("updated_at") {
            values.push((column, SqlValue::Datetime(Utc::now())));
        }
        if let (Some(column), Some(user_id)) =
            (self.def.column("updated_by_fk_user_id"), ctx.user_id)
        {
            values.push((column, SqlValue::Integer(user_id)));
        }

        let mut tx = self.db.pool.begin().await?;
        let Some(old) = record::find_by_id(&mut *tx, self.def, id).await? else {
            return Ok(None);
        };
        record::update(&mut *tx, self.def, id, values).await?;
        let updated = record::find_by_id(&mut *tx, self.def, id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        AuditService::log_change(
            &mut *tx,
            AuditEntry {
                def: self.def,
                action: AuditAction::Update,
                old: Some(&old),
                new: Some(&updated),
                observation: None,
                user_id: ctx.user_id,
            },
        )
        .await?;
        tx.commit().await?;
        info!(entity = self.def.slug, id, "Record updated");

        self.hooks.after_update(ctx, &updated).await?;
        let mut records = vec![updated];
        record::load_relations(&self.db.pool, self.def, &mut records).await?;
        Ok(records.pop())
    }

    /// Returns `false` when there was nothing to delete
    pub async fn delete(&self, ctx: &ServiceContext, id: i64) -> Result<bool, EntityError> {
        self.ensure_writable()?;
        if self.find_scoped(ctx, id).await?.is_none() {
            return Ok(false);
        }
        self.hooks.before_delete(ctx, id).await?;

        let mut tx = self.db.pool.begin().await?;
        let Some(old) = record::find_by_id(&mut *tx, self.def, id).await? else {
            return Ok(false);
        };
        record::delete(&mut *tx, self.def, id).await?;
        AuditService::log_change(
            &mut *tx,
            AuditEntry {
                def: self.def,
                action: AuditAction::Delete,
                old: Some(&old),
                new: None,
                observation: None,
                user_id: ctx.user_id,
            },
        )
        .await?;
        tx.commit().await?;
        info!(entity = self.def.slug, id, "Record deleted");

        self.hooks.after_delete(ctx, id).await?;
        Ok(true)
    }

    /// Copy the writable columns of record `id`, apply `overrides` and create the copy.
    ///
    /// Hidden columns are never read back, so required ones (a user's
    /// password) must come in `overrides`.
    pub async fn clone_record(
        &self,
        ctx: &ServiceContext,
        id: i64,
        overrides: Record,
    ) -> Result<Record, EntityError> {
        self.ensure_writable()?;
        let source = self
            .find_scoped(ctx, id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        let mut data: Record = self
            .def
            .writable_columns()
            .filter_map(|column| {
                source
                    .get(column.name)
                    .map(|value| (column.name.to_string(), value.clone()))
            })
            .collect();
        data.extend(overrides);
        let missing: Vec<&str> = self
            .def
            .writable_columns()
            .filter(|column| column.hidden && !column.nullable && !data.contains_key(column.name))
            .map(|column| column.name)
            .collect();
        if !missing.is_empty() {
            return Err(EntityError::Validation(
                Message::CloneRequires {
                    model: self.def.name.to_string(),
                    fields: missing.join(", "),
                }
                .to_string(),
            ));
        }
        let observation = format!("Cloned from {} ID: {}", self.def.name, id);
        self.create_with_observation(ctx, data, Some(observation)).await
    }

    pub async fn select_options(
        &self,
        ctx: &ServiceContext,
        request: &SelectRequest,
    ) -> Result<Vec<SelectOption>, EntityError> {
        let label_columns = match &request.label_fields {
            Some(fields) if !fields.is_empty() => fields
                .iter()
                .map(|field| self.visible_column(field.trim()))
                .collect::<Result<Vec<_>, _>>()?,
            _ => self
                .def
                .label_fields
                .iter()
                .map(|field| self.visible_column(field))
                .collect::<Result<Vec<_>, _>>()?,
        };
        let delimiter = request.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER);

        let mut criteria = Criteria::new();
        if let Some(search) = request.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            for column in &label_columns {
                criteria.any.push(Predicate::Like(*column, search.to_string()));
            }
        }
        let criteria = self.scoped(ctx, criteria);
        let order: Vec<OrderBy> = label_columns
            .iter()
            .map(|column| OrderBy {
                column: *column,
                descending: false,
            })
            .collect();
        let rows = record::find_page(
            &self.db.pool,
            self.def,
            &criteria,
            &order,
            i64::from(MAX_LIMIT),
            0,
        )
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let value = record::record_id(row)?;
                let label = label_columns
                    .iter()
                    .filter_map(|column| label_part(row.get(column.name)?))
                    .collect::<Vec<_>>()
                    .join(delimiter);
                Some(SelectOption { value, label })
            })
            .collect())
    }

    pub fn fields(&self) -> EntityFields {
        EntityFields {
            entity: self.def.name,
            form: self.def.form,
            fields: self
                .def
                .field_configs()
                .into_iter()
                .map(|(column, config)| FieldDescriptor {
                    name: column.name,
                    config: *config,
                })
                .collect(),
        }
    }

    async fn create_with_observation(
        &self,
        ctx: &ServiceContext,
        mut data: Record,
        observation: Option<String>,
    ) -> Result<Record, EntityError> {
        self.ensure_writable()?;
        self.apply_tenant(ctx, &mut data);
        self.hooks.before_create(ctx, &mut data).await?;

        let mut values = self.writable_values(&data)?;
        if let (Some(column), Some(user_id)) =
            (self.def.column("created_by_fk_user_id"), ctx.user_id)
        {
            values.push((column, SqlValue::Integer(user_id)));
        }

        let mut tx = self.db.pool.begin().await?;
        let id = record::insert(&mut *tx, self.def, values).await?;
        let created = record::find_by_id(&mut *tx, self.def, id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        AuditService::log_change(
            &mut *tx,
            AuditEntry {
                def: self.def,
                action: AuditAction::Create,
                old: None,
                new: Some(&created),
                observation,
                user_id: ctx.user_id,
            },
        )
        .await?;
        tx.commit().await?;
        info!(entity = self.def.slug, id, "Record created");

        self.hooks.after_create(ctx, &created).await?;
        let mut records = vec![created];
        record::load_relations(&self.db.pool, self.def, &mut records).await?;
        records.pop().ok_or_else(|| self.not_found(id))
    }

    /// Point new data at the acting company when the entity is tenant scoped
    pub fn apply_tenant(&self, ctx: &ServiceContext, data: &mut Record) {
        if let (Some(tenant), Some(company_id)) = (self.def.tenant_column, ctx.company_id) {
            data.insert(tenant.to_string(), Value::from(company_id));
        }
    }

    async fn find_page(
        &self,
        ctx: &ServiceContext,
        criteria: Criteria,
        page: &PageRequest,
    ) -> Result<Page, EntityError> {
        let criteria = self.scoped(ctx, criteria);
        let order = self.parse_order(page.order.as_deref())?;
        let (page_no, limit) = page.resolve();
        let offset = i64::from(page_no - 1) * i64::from(limit);
        debug!(entity = self.def.slug, page = page_no, limit, "Listing records");

        let total = record::count(&self.db.pool, self.def, &criteria).await?;
        let mut records = record::find_page(
            &self.db.pool,
            self.def,
            &criteria,
            &order,
            i64::from(limit),
            offset,
        )
        .await?;
        record::load_relations(&self.db.pool, self.def, &mut records).await?;
        Ok(Page {
            records,
            meta: PaginationMeta::new(total, page_no, limit),
        })
    }

    async fn find_scoped(&self, ctx: &ServiceContext, id: i64) -> Result<Option<Record>, EntityError> {
        let criteria = self.scoped(
            ctx,
            Criteria::new().eq(self.def.id_column(), SqlValue::Integer(id)),
        );
        Ok(record::find_one(&self.db.pool, self.def, &criteria).await?)
    }

    /// Restrict `criteria` to the acting company when the entity is tenant scoped
    fn scoped(&self, ctx: &ServiceContext, criteria: Criteria) -> Criteria {
        match (
            self.def.tenant_column.and_then(|name| self.def.column(name)),
            ctx.company_id,
        ) {
            (Some(column), Some(company_id)) => criteria.eq(column, SqlValue::Integer(company_id)),
            _ => criteria,
        }
    }

    fn conditions(&self, conditions: &Record) -> Result<Criteria, EntityError> {
        let mut criteria = Criteria::new();
        for (name, value) in conditions {
            let column = self.visible_column(name)?;
            criteria = criteria.eq(column, column.coerce(value)?);
        }
        Ok(criteria)
    }

    fn parse_order(&self, order: Option<&str>) -> Result<Vec<OrderBy>, EntityError> {
        let mut parsed = Vec::new();
        for part in order.unwrap_or_default().split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, direction) = part.split_once(':').unwrap_or((part, "asc"));
            let descending = match direction.trim().to_ascii_lowercase().as_str() {
                "asc" => false,
                "desc" => true,
                other => {
                    return Err(EntityError::Validation(format!(
                        "Invalid order direction: {other}"
                    )));
                }
            };
            parsed.push(OrderBy {
                column: self.visible_column(name.trim())?,
                descending,
            });
        }
        if parsed.is_empty() {
            let (column, descending) = self.def.default_order();
            parsed.push(OrderBy { column, descending });
        }
        let id = self.def.id_column();
        if parsed.iter().all(|by| by.column.name != id.name) {
            parsed.push(OrderBy {
                column: id,
                descending: true,
            });
        }
        Ok(parsed)
    }

    fn visible_column(&self, name: &str) -> Result<&'static ColumnDef, EntityError> {
        self.def
            .column(name)
            .filter(|column| !column.hidden)
            .ok_or_else(|| EntityError::Validation(format!("Unknown field: {name}")))
    }

    fn writable_values(
        &self,
        data: &Record,
    ) -> Result<Vec<(&'static ColumnDef, SqlValue)>, EntityError> {
        self.def
            .writable_columns()
            .filter_map(|column| data.get(column.name).map(|value| (column, value)))
            .map(|(column, value)| Ok((column, column.coerce(value)?)))
            .collect()
    }

    fn ensure_writable(&self) -> Result<(), EntityError> {
        if self.def.read_only {
            Err(EntityError::ReadOnly(self.def.name))
        } else {
            Ok(())
        }
    }

    fn not_found(&self, id: i64) -> EntityError {
        EntityError::NotFound(
            Message::ItemNotFound {
                model: self.def.name.to_string(),
                id,
            }
            .to_string(),
        )
    }
}

fn label_part(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

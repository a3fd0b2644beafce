//! Metadata-driven queries over any registered entity.
//!
//! Records are plain JSON objects keyed by column name. Only column names taken
//! from the static [`EntityDef`] ever reach the SQL text; everything coming from
//! a client is bound as a parameter.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use sqlx::{
    Decode, Executor, QueryBuilder, Row, Sqlite, SqlitePool, ValueRef,
    sqlite::{SqliteRow, SqliteValueRef},
};

use crate::{
    entities,
    metadata::{ColumnDef, ColumnKind, EntityDef},
    value::{SqlValue, parse_datetime},
};

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(&'static ColumnDef, SqlValue),
    /// Case-insensitive substring match; wildcards in the needle are escaped
    Like(&'static ColumnDef, String),
}

impl Predicate {
    fn push_sql(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Predicate::Eq(column, SqlValue::Null) => {
                builder.push(quoted(column)).push(" IS NULL");
            }
            Predicate::Eq(column, value) => {
                builder.push(quoted(column)).push(" = ");
                value.clone().push_bind(builder);
            }
            Predicate::Like(column, needle) => {
                builder
                    .push("LOWER(")
                    .push(quoted(column))
                    .push(") LIKE ")
                    .push_bind(format!("%{}%", escape_like(&needle.to_lowercase())))
                    .push(" ESCAPE '\\'");
            }
        }
    }
}

/// `all` predicates are AND-ed; when `any` is non-empty one of them must hold too
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub all: Vec<Predicate>,
    pub any: Vec<Predicate>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static ColumnDef, value: SqlValue) -> Self {
        self.all.push(Predicate::Eq(column, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        if self.is_empty() {
            return;
        }
        builder.push(" WHERE ");
        for (i, predicate) in self.all.iter().enumerate() {
            if i > 0 {
                builder.push(" AND ");
            }
            predicate.push_sql(builder);
        }
        if !self.any.is_empty() {
            if !self.all.is_empty() {
                builder.push(" AND ");
            }
            builder.push("(");
            for (i, predicate) in self.any.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                predicate.push_sql(builder);
            }
            builder.push(")");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBy {
    pub column: &'static ColumnDef,
    pub descending: bool,
}

fn quoted(column: &ColumnDef) -> String {
    format!("\"{}\"", column.name)
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn select_from(def: &'static EntityDef) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new("SELECT ");
    let mut columns = builder.separated(", ");
    for column in def.visible_columns() {
        columns.push(quoted(column));
    }
    builder.push(format!(" FROM \"{}\"", def.table));
    builder
}

pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

pub async fn find_page<'e, E>(
    executor: E,
    def: &'static EntityDef,
    criteria: &Criteria,
    order: &[OrderBy],
    limit: i64,
    offset: i64,
) -> Result<Vec<Record>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder = select_from(def);
    criteria.push_where(&mut builder);
    if !order.is_empty() {
        builder.push(" ORDER BY ");
        for (i, by) in order.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder
                .push(quoted(by.column))
                .push(if by.descending { " DESC" } else { " ASC" });
        }
    }
    builder.push(" LIMIT ").push_bind(limit);
    builder.push(" OFFSET ").push_bind(offset);

    let rows = builder.build().fetch_all(executor).await?;
    rows.iter().map(|row| decode_row(def, row)).collect()
}

pub async fn count<'e, E>(
    executor: E,
    def: &'static EntityDef,
    criteria: &Criteria,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM \"{}\"", def.table));
    criteria.push_where(&mut builder);
    let row = builder.build().fetch_one(executor).await?;
    row.try_get::<i64, _>(0)
}

pub async fn find_one<'e, E>(
    executor: E,
    def: &'static EntityDef,
    criteria: &Criteria,
) -> Result<Option<Record>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder = select_from(def);
    criteria.push_where(&mut builder);
    builder.push(" LIMIT 1");
    match builder.build().fetch_optional(executor).await? {
        Some(row) => decode_row(def, &row).map(Some),
        None => Ok(None),
    }
}

pub async fn find_by_id<'e, E>(
    executor: E,
    def: &'static EntityDef,
    id: i64,
) -> Result<Option<Record>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let criteria = Criteria::new().eq(def.id_column(), SqlValue::Integer(id));
    find_one(executor, def, &criteria).await
}

/// Insert a row and return its id
pub async fn insert<'e, E>(
    executor: E,
    def: &'static EntityDef,
    values: Vec<(&'static ColumnDef, SqlValue)>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder = QueryBuilder::new(format!("INSERT INTO \"{}\"", def.table));
    if values.is_empty() {
        builder.push(" DEFAULT VALUES");
    } else {
        builder.push(" (");
        let mut columns = builder.separated(", ");
        for (column, _) in &values {
            columns.push(quoted(column));
        }
        builder.push(") VALUES (");
        for (i, (_, value)) in values.into_iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            value.push_bind(&mut builder);
        }
        builder.push(")");
    }
    builder.push(" RETURNING \"id\"");
    let row = builder.build().fetch_one(executor).await?;
    row.try_get::<i64, _>(0)
}

/// Apply `values` to one row; returns the number of rows touched
pub async fn update<'e, E>(
    executor: E,
    def: &'static EntityDef,
    id: i64,
    values: Vec<(&'static ColumnDef, SqlValue)>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    if values.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::new(format!("UPDATE \"{}\" SET ", def.table));
    for (i, (column, value)) in values.into_iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(quoted(column)).push(" = ");
        value.push_bind(&mut builder);
    }
    builder.push(" WHERE \"id\" = ").push_bind(id);
    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

pub async fn delete<'e, E>(executor: E, def: &'static EntityDef, id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder = QueryBuilder::new(format!("DELETE FROM \"{}\" WHERE \"id\" = ", def.table));
    builder.push_bind(id);
    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

/// Embed every discovered relation of `def` into `records`.
///
/// Targets are fetched with one query per relation. A null or dangling foreign
/// key embeds `null`.
pub async fn load_relations(
    pool: &SqlitePool,
    def: &'static EntityDef,
    records: &mut [Record],
) -> Result<(), sqlx::Error> {
    if records.is_empty() {
        return Ok(());
    }
    for relation in def.relation_fields() {
        let Some(target) = entities::find(relation.target) else {
            continue;
        };
        let ids: HashSet<i64> = records
            .iter()
            .filter_map(|r| r.get(relation.column).and_then(Value::as_i64))
            .collect();

        let mut by_id = HashMap::new();
        if !ids.is_empty() {
            let mut builder = select_from(target);
            builder.push(" WHERE \"id\" IN (");
            let mut list = builder.separated(", ");
            for id in &ids {
                list.push_bind(*id);
            }
            builder.push(")");
            for row in builder.build().fetch_all(pool).await? {
                let related = decode_row(target, &row)?;
                if let Some(id) = record_id(&related) {
                    by_id.insert(id, related);
                }
            }
        }

        for record in records.iter_mut() {
            let embedded = record
                .get(relation.column)
                .and_then(Value::as_i64)
                .and_then(|id| by_id.get(&id).cloned())
                .map(Value::Object)
                .unwrap_or(Value::Null);
            record.insert(relation.name.to_string(), embedded);
        }
    }
    Ok(())
}

fn decode<'r, T: Decode<'r, Sqlite>>(
    raw: SqliteValueRef<'r>,
    column: &str,
) -> Result<T, sqlx::Error> {
    T::decode(raw).map_err(|source| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source,
    })
}

fn decode_row(def: &'static EntityDef, row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in def.visible_columns() {
        let raw = row.try_get_raw(column.name)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match column.kind {
                ColumnKind::Integer => Value::from(decode::<i64>(raw, column.name)?),
                ColumnKind::Real => Value::from(decode::<f64>(raw, column.name)?),
                ColumnKind::Boolean => Value::Bool(decode::<bool>(raw, column.name)?),
                ColumnKind::Text => Value::String(decode::<String>(raw, column.name)?),
                ColumnKind::Datetime => {
                    let text = decode::<String>(raw, column.name)?;
                    match parse_datetime(&text) {
                        Some(dt) => Value::String(
                            dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                        ),
                        None => Value::String(text),
                    }
                }
                ColumnKind::Json => {
                    let text = decode::<String>(raw, column.name)?;
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                }
            }
        };
        record.insert(column.name.to_string(), value);
    }
    Ok(record)
}

//! JSON report documents built from an entity listing.

pub mod filters;

use std::path::PathBuf;

use chrono::Local;
use db::metadata::{FieldConfig, FieldType, NumberType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use super::entity::{EntityError, EntityService, MAX_LIMIT, PageRequest, ServiceContext};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Entity(#[from] EntityError),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportOptions {
    pub title: Option<String>,
    pub orientation: Option<Orientation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportField {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: String,
    pub orientation: Orientation,
    pub fields: Vec<ReportField>,
    pub rows: Vec<Map<String, Value>>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub path: PathBuf,
    pub total: i64,
}

/// Render one cell according to the field's type
pub fn format_cell(field: &FieldConfig, value: &Value) -> String {
    let number = value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()));
    match (value, field.field_type) {
        (Value::Null, _) => String::new(),
        (_, FieldType::Boolean | FieldType::Checkbox) => {
            let truthy = match value {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_i64() == Some(1),
                Value::String(s) => matches!(s.as_str(), "true" | "1"),
                _ => false,
            };
            if truthy { "Sim" } else { "Não" }.to_string()
        }
        (Value::String(s), FieldType::Date) => filters::date(s),
        (Value::String(s), FieldType::Datetime) => filters::datetime(s),
        _ if field.field_type == FieldType::Currency || field.currency.is_some() => {
            number.map(filters::currency).unwrap_or_else(|| plain(value))
        }
        _ if field.number.is_some_and(|n| n.kind == NumberType::Percent) => number
            .map(|n| filters::percentage(n, 2))
            .unwrap_or_else(|| plain(value)),
        (Value::Number(_), FieldType::Number) => {
            number.map(filters::number).unwrap_or_else(|| plain(value))
        }
        _ => plain(value),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ReportService {
    output_dir: PathBuf,
}

impl ReportService {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Build the report for up to the first thousand records and write it to disk
    pub async fn generate_report(
        &self,
        ctx: &ServiceContext,
        entity: &EntityService,
        options: &ReportOptions,
    ) -> Result<ReportOutput, ReportError> {
        let def = entity.def();
        let page = entity
            .find_all(
                ctx,
                &PageRequest {
                    page: Some(1),
                    limit: Some(MAX_LIMIT),
                    order: None,
                },
            )
            .await?;

        let columns: Vec<_> = def
            .field_configs()
            .into_iter()
            .filter(|(_, field)| field.can_browse && field.field_type != FieldType::File)
            .filter(|(column, _)| !column.hidden)
            .collect();

        let rows: Vec<Map<String, Value>> = page
            .records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|(column, field)| {
                        let cell = record.get(column.name).unwrap_or(&Value::Null);
                        (column.name.to_string(), Value::String(format_cell(field, cell)))
                    })
                    .collect()
            })
            .collect();

        let now = Local::now();
        let document = ReportDocument {
            title: options
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("{} Report", def.name)),
            generated_at: now.format("%d/%m/%Y %H:%M").to_string(),
            orientation: options.orientation.unwrap_or_default(),
            fields: columns
                .iter()
                .map(|(column, field)| ReportField {
                    name: column.name.to_string(),
                    label: field.label.to_string(),
                })
                .collect(),
            rows,
            total: page.meta.total_items,
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let file_name = format!("{}_{}.json", def.name, now.format("%Y%m%d_%H%M%S"));
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, serde_json::to_vec_pretty(&document)?).await?;
        info!(entity = def.slug, path = %path.display(), "Report generated");

        Ok(ReportOutput {
            path,
            total: document.total,
        })
    }
}

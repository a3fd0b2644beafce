//! Static entity metadata: columns, per-field form configuration and relations.
//!
//! Every managed table is described once by an [`EntityDef`]. The generic
//! record queries and the entity service read these definitions to decide which
//! columns exist, how values are decoded, which relations get embedded and how
//! each field is presented to the admin UI.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    Text,
    Checkbox,
    Richtext,
    Textarea,
    Number,
    Date,
    Datetime,
    Time,
    Email,
    Url,
    Phone,
    File,
    Boolean,
    Select,
    Multiselect,
    Color,
    Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum DateType {
    Date,
    Datetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub enum CurrencyType {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "BRL")]
    Brl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum NumberType {
    Integer,
    Decimal,
    Percent,
    Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum SelectType {
    Single,
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberConfig {
    pub kind: NumberType,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectConfig {
    pub kind: SelectType,
    pub options: &'static [&'static str],
    /// Endpoint (relative to `/api/v1/`) serving the options, e.g. `situations/select-options`
    pub url: Option<&'static str>,
}

/// Presentation and permission flags for one column.
///
/// The `can_*` flags default to `true`; a field is only hidden from a view
/// when its flag is explicitly turned off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldConfig {
    pub label: &'static str,
    pub order: Option<i32>,
    pub width: Option<u8>,
    pub browser_order: Option<i32>,
    pub browser_width: Option<u8>,
    pub field_type: FieldType,
    pub can_browse: bool,
    pub can_read: bool,
    pub can_edit: bool,
    pub can_add: bool,
    pub required: bool,
    pub tabs: &'static [&'static str],
    pub date: Option<DateType>,
    pub currency: Option<CurrencyType>,
    pub number: Option<NumberConfig>,
    pub select: Option<SelectConfig>,
}

impl FieldConfig {
    pub const fn new(label: &'static str, field_type: FieldType) -> Self {
        Self {
            label,
            order: None,
            width: None,
            browser_order: None,
            browser_width: None,
            field_type,
            can_browse: true,
            can_read: true,
            can_edit: true,
            can_add: true,
            required: false,
            tabs: &[],
            date: None,
            currency: None,
            number: None,
            select: None,
        }
    }

    pub const fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub const fn width(mut self, width: u8) -> Self {
        self.width = Some(width);
        self
    }

    pub const fn browser(mut self, order: i32, width: u8) -> Self {
        self.browser_order = Some(order);
        self.browser_width = Some(width);
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn tabs(mut self, tabs: &'static [&'static str]) -> Self {
        self.tabs = tabs;
        self
    }

    pub const fn no_browse(mut self) -> Self {
        self.can_browse = false;
        self
    }

    pub const fn no_read(mut self) -> Self {
        self.can_read = false;
        self
    }

    pub const fn no_edit(mut self) -> Self {
        self.can_edit = false;
        self
    }

    pub const fn no_add(mut self) -> Self {
        self.can_add = false;
        self
    }

    pub const fn date(mut self, date: DateType) -> Self {
        self.date = Some(date);
        self
    }

    pub const fn currency(mut self, currency: CurrencyType) -> Self {
        self.currency = Some(currency);
        self
    }

    pub const fn number(mut self, kind: NumberType, min: Option<f64>, max: Option<f64>) -> Self {
        self.number = Some(NumberConfig { kind, min, max });
        self
    }

    pub const fn select_url(mut self, url: &'static str) -> Self {
        self.select = Some(SelectConfig {
            kind: SelectType::Single,
            options: &[],
            url: Some(url),
        });
        self
    }

    pub const fn select_options(mut self, kind: SelectType, options: &'static [&'static str]) -> Self {
        self.select = Some(SelectConfig {
            kind,
            options,
            url: None,
        });
        self
    }
}

/// Form-level metadata shown by the admin UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadata {
    pub prefix: &'static str,
    pub table: &'static str,
    pub singular_name: &'static str,
    pub plural_name: &'static str,
    pub icon: &'static str,
    pub version: &'static str,
}

/// Storage type of a column, drives decoding and input coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Boolean,
    Datetime,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    /// Never selected into records nor written to audit values
    pub hidden: bool,
    pub field: Option<FieldConfig>,
}

impl ColumnDef {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            hidden: false,
            field: None,
        }
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub const fn field(mut self, field: FieldConfig) -> Self {
        self.field = Some(field);
        self
    }

    /// Columns managed by the service layer rather than by client input
    pub fn is_system(&self) -> bool {
        SYSTEM_COLUMNS.contains(&self.name)
    }
}

pub const SYSTEM_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "created_by_fk_user_id",
    "updated_by_fk_user_id",
];

/// Many-to-one relation embedded under `name` when discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub column: &'static str,
    pub target: &'static str,
}

#[derive(Debug, PartialEq)]
pub struct EntityDef {
    /// URL segment and permission resource
    pub slug: &'static str,
    /// Model name used in messages, audit entries and report file names
    pub name: &'static str,
    pub table: &'static str,
    pub form: Option<FormMetadata>,
    pub columns: &'static [ColumnDef],
    pub relations: &'static [RelationDef],
    pub label_fields: &'static [&'static str],
    pub tenant_column: Option<&'static str>,
    pub read_only: bool,
}

impl EntityDef {
    pub fn column(&'static self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Columns that may appear in records returned to callers
    pub fn visible_columns(&'static self) -> impl Iterator<Item = &'static ColumnDef> {
        self.columns.iter().filter(|c| !c.hidden)
    }

    /// Columns a client may write: everything except system columns
    pub fn writable_columns(&'static self) -> impl Iterator<Item = &'static ColumnDef> {
        self.columns.iter().filter(|c| !c.is_system())
    }

    /// Relations backed by a foreign-key column carrying the relation name.
    ///
    /// `created_by` is discovered through `created_by_fk_user_id`, `situation`
    /// through `project_fk_situation_id`.
    pub fn relation_fields(&self) -> Vec<&'static RelationDef> {
        self.relations
            .iter()
            .filter(|relation| {
                self.columns
                    .iter()
                    .any(|c| c.name.contains("_fk_") && c.name.contains(relation.name))
            })
            .collect()
    }

    /// Configured fields ordered by `order`, then by column name
    pub fn field_configs(&'static self) -> Vec<(&'static ColumnDef, &'static FieldConfig)> {
        let mut fields: Vec<_> = self
            .columns
            .iter()
            .filter_map(|c| c.field.as_ref().map(|f| (c, f)))
            .collect();
        fields.sort_by(|(a_col, a), (b_col, b)| {
            let a_order = a.order.unwrap_or(i32::MAX);
            let b_order = b.order.unwrap_or(i32::MAX);
            a_order.cmp(&b_order).then_with(|| a_col.name.cmp(&b_col.name))
        });
        fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldConfig> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.field.as_ref())
    }

    pub fn default_order(&'static self) -> (&'static ColumnDef, bool) {
        match self.column("created_at") {
            Some(column) => (column, true),
            None => (self.id_column(), true),
        }
    }

    pub fn id_column(&'static self) -> &'static ColumnDef {
        self.column("id").unwrap_or(&ID_COLUMN)
    }
}

static ID_COLUMN: ColumnDef = ColumnDef::new("id", ColumnKind::Integer).not_null();

//! Per-view field visibility and required-field validation driven by `FieldConfig`.

use db::{
    metadata::{EntityDef, FieldConfig},
    models::record::Record,
};
use serde_json::Value;
use utils::i18n::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

fn retain(def: &EntityDef, record: &mut Record, allowed: impl Fn(&FieldConfig) -> bool) {
    record.retain(|key, _| def.field(key).is_none_or(|field| allowed(field)));
}

pub fn filter_browsable(def: &EntityDef, records: &mut [Record]) {
    for record in records {
        retain(def, record, |field| field.can_browse);
    }
}

pub fn filter_readable(def: &EntityDef, record: &mut Record) {
    retain(def, record, |field| field.can_read);
}

pub fn filter_addable(def: &EntityDef, data: &mut Record) {
    retain(def, data, |field| field.can_add);
}

pub fn filter_editable(def: &EntityDef, data: &mut Record) {
    retain(def, data, |field| field.can_edit);
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Labels of required fields missing from `data`.
///
/// On create every required field must be present and non-empty; on update
/// only the fields being sent are checked. Empty means `null` or `""`;
/// whitespace is a value.
pub fn missing_required(
    def: &'static EntityDef,
    data: &Record,
    mode: ValidationMode,
) -> Vec<&'static str> {
    def.field_configs()
        .into_iter()
        .filter(|(_, field)| field.required)
        .filter(|(column, _)| match (data.get(column.name), mode) {
            (None, ValidationMode::Create) => true,
            (None, ValidationMode::Update) => false,
            (Some(value), _) => is_empty(value),
        })
        .map(|(_, field)| field.label)
        .collect()
}

pub fn validate_required(
    def: &'static EntityDef,
    data: &Record,
    mode: ValidationMode,
) -> Result<(), String> {
    let missing = missing_required(def, data, mode);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Message::RequiredFields(missing.join(", ")).to_string())
    }
}

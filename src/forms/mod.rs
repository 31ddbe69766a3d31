//! Per-entity input forms: building display forms with the dynamic extra
//! columns appended, and validating submissions into typed row values.
//!
//! Validation runs in a fixed order: per-field type checks, uniqueness
//! scoped to everything but the record being edited, cross-entity rules
//! for the handful of types that have them, then the hidden status
//! backfill. All field errors are collected into one map rather than
//! failing on the first.

pub mod normalize;
pub mod render;

pub use render::{FragmentCache, render_form};

use crate::columns::{ColumnDef, ColumnSet};
use crate::core::error::{EngineError, FieldErrors, Result};
use crate::core::field::{FieldDef, FieldKind, FieldRole};
use crate::core::value::FieldValue;
use crate::registry::{EntityDescriptor, REGISTRY, normalize_entity};
use crate::store::{Record, Store};
use normalize::{AADHAAR_RE, PHONE_RE, is_date_key, normalize_date_input, parse_date};
use std::collections::BTreeMap;

// ============================================================================
// Form model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Text,
    Number,
    Date,
    Checkbox,
    Select,
    Password,
    Hidden,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(u64),
}

/// One rendered input. `input_name` is the submission key, which differs
/// from `name` only for dynamic columns (`extra__<name>`).
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub input_name: String,
    pub label: String,
    pub widget: Widget,
    pub required: bool,
    pub read_only: bool,
    pub pattern: Option<&'static str>,
    pub placeholder: Option<&'static str>,
    pub value: String,
    pub choices: Vec<String>,
    pub is_extra: bool,
}

#[derive(Debug, Clone)]
pub struct Form {
    pub entity: &'static str,
    pub title: String,
    pub mode: FormMode,
    pub fields: Vec<FormField>,
    pub warning: Option<String>,
}

fn widget_for(field: &FieldDef) -> Widget {
    if field.role == FieldRole::Password {
        return Widget::Password;
    }
    if field.hidden || field.is_status_like() {
        return Widget::Hidden;
    }
    if field.choices.is_some() {
        return Widget::Select;
    }
    match field.kind {
        FieldKind::Text => Widget::Text,
        FieldKind::Number => Widget::Number,
        FieldKind::Bool => Widget::Checkbox,
        FieldKind::Date => Widget::Date,
    }
}

fn pattern_for(field: &FieldDef) -> Option<&'static str> {
    match field.role {
        FieldRole::Phone => Some("[0-9]{10}"),
        FieldRole::Aadhaar => Some("[0-9]{4} [0-9]{4} [0-9]{4}"),
        _ => None,
    }
}

/// Value shown in an input: dates go back out in entry format, nulls as
/// empty strings.
fn display_value(value: Option<&FieldValue>) -> String {
    match value {
        Some(FieldValue::Date(date)) => normalize::format_date_display(*date),
        Some(v) if !v.is_null() => v.to_string(),
        _ => String::new(),
    }
}

/// Build the display form for an entity: declared fields in registry
/// order (passwords blanked, codes read-only and previewed for new
/// records), then the administrator-defined extra columns.
pub fn build_form(
    descriptor: &EntityDescriptor,
    columns: &ColumnSet,
    instance: Option<&Record>,
    code_preview: Option<&str>,
) -> Form {
    let mode = match instance {
        Some(record) => FormMode::Edit(record.id),
        None => FormMode::Create,
    };
    let mut fields = Vec::with_capacity(descriptor.fields.len() + columns.fields.len());

    for (idx, field) in descriptor.fields.iter().enumerate() {
        let widget = widget_for(field);
        let value = match (widget, instance) {
            (Widget::Password, _) => String::new(),
            (_, Some(record)) => display_value(record.values.get(idx)),
            (_, None) if field.role == FieldRole::Code => {
                code_preview.unwrap_or_default().to_string()
            }
            (Widget::Checkbox, None) => "false".to_string(),
            (_, None) => field.default.unwrap_or_default().to_string(),
        };
        fields.push(FormField {
            name: field.name.to_string(),
            input_name: field.name.to_string(),
            label: field.label(),
            widget,
            required: field.required,
            read_only: field.role == FieldRole::Code,
            pattern: pattern_for(field),
            placeholder: match field.kind {
                FieldKind::Date => Some("dd/mm/yyyy"),
                _ => None,
            },
            value,
            choices: field
                .choices
                .map(|c| c.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
            is_extra: false,
        });
    }

    for col in &columns.fields {
        let value = instance
            .map(|record| display_value(record.extra_data.get(&col.field_name)))
            .unwrap_or_default();
        fields.push(FormField {
            name: col.field_name.clone(),
            input_name: col.input_name(),
            label: col.label.clone(),
            widget: if col.is_file {
                Widget::File
            } else {
                match col.kind {
                    FieldKind::Date => Widget::Date,
                    FieldKind::Number => Widget::Number,
                    FieldKind::Bool => Widget::Checkbox,
                    FieldKind::Text => Widget::Text,
                }
            },
            required: col.required,
            read_only: false,
            pattern: None,
            placeholder: match col.kind {
                FieldKind::Date => Some("dd/mm/yyyy"),
                _ => None,
            },
            value,
            choices: Vec::new(),
            is_extra: true,
        });
    }

    Form {
        entity: descriptor.name,
        title: match mode {
            FormMode::Create => format!("New {}", descriptor.pretty),
            FormMode::Edit(_) => format!("Edit {}", descriptor.pretty),
        },
        mode,
        fields,
        warning: columns.warning.clone(),
    }
}

// ============================================================================
// Validation
// ============================================================================

/// A validated submission ready for storage: declared values positionally
/// aligned with the descriptor, the extra bag, and a raw password when
/// one was entered (never stored in the row itself).
#[derive(Debug, Clone)]
pub struct Submission {
    pub values: Vec<FieldValue>,
    pub extra: BTreeMap<String, FieldValue>,
    pub password: Option<String>,
}

type JsonMap = serde_json::Map<String, serde_json::Value>;

fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Read a submitted value as trimmed text. JSON scalars are stringified;
/// null and absent both come back as `None`.
fn raw_text(payload: &JsonMap, key: &str) -> Option<String> {
    match payload.get(key)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Checkbox semantics: explicit negative markers are false, anything
/// else that was submitted is true.
fn parse_bool_input(text: &str) -> bool {
    !matches!(
        text.to_ascii_lowercase().as_str(),
        "" | "false" | "0" | "no" | "n" | "off" | "f"
    )
}

fn default_for(field: &FieldDef) -> FieldValue {
    match field.default {
        Some(text) => match field.kind {
            FieldKind::Text => FieldValue::Text(text.to_string()),
            FieldKind::Number => text
                .parse::<f64>()
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Null),
            FieldKind::Bool => FieldValue::Bool(parse_bool_input(text)),
            FieldKind::Date => parse_date(text).map(FieldValue::Date).unwrap_or(FieldValue::Null),
        },
        None if field.is_status_like() => FieldValue::Text("active".to_string()),
        None if field.kind == FieldKind::Bool => FieldValue::Bool(false),
        None => FieldValue::Null,
    }
}

fn parse_scalar(field: &FieldDef, text: &str, errors: &mut FieldErrors) -> FieldValue {
    match field.kind {
        FieldKind::Text => {
            let text = if is_date_key(field.name) {
                normalize_date_input(text)
            } else {
                text.to_string()
            };
            match field.role {
                FieldRole::Phone if !PHONE_RE.is_match(&text) => {
                    push_error(errors, field.name, "Enter exactly 10 digits.");
                }
                FieldRole::Aadhaar if !AADHAAR_RE.is_match(&text) => {
                    push_error(errors, field.name, "Enter Aadhaar as 0000 0000 0000.");
                }
                _ => {}
            }
            if let Some(choices) = field.choices {
                if !choices.contains(&text.as_str()) {
                    push_error(
                        errors,
                        field.name,
                        format!("Select a valid choice: '{}' is not one of them.", text),
                    );
                }
            }
            FieldValue::Text(text)
        }
        FieldKind::Number => match text.parse::<f64>() {
            Ok(n) => FieldValue::Number(n),
            Err(_) => {
                push_error(errors, field.name, "Enter a number.");
                FieldValue::Null
            }
        },
        FieldKind::Bool => FieldValue::Bool(parse_bool_input(text)),
        FieldKind::Date => {
            let normalized = normalize_date_input(text);
            match parse_date(&normalized) {
                Some(date) => FieldValue::Date(date),
                None => {
                    push_error(errors, field.name, "Enter a valid date (dd/mm/yyyy).");
                    FieldValue::Null
                }
            }
        }
    }
}

fn parse_extra(col: &ColumnDef, text: &str) -> std::result::Result<FieldValue, String> {
    if col.is_file {
        return Ok(FieldValue::Text(text.to_string()));
    }
    match col.kind {
        FieldKind::Date => {
            let normalized = normalize_date_input(text);
            parse_date(&normalized)
                .map(FieldValue::Date)
                .ok_or_else(|| "Enter a valid date (dd/mm/yyyy).".to_string())
        }
        FieldKind::Number => text
            .parse::<f64>()
            .map(FieldValue::Number)
            .map_err(|_| "Enter a number.".to_string()),
        FieldKind::Bool => Ok(FieldValue::Bool(parse_bool_input(text))),
        FieldKind::Text => {
            let text = if is_date_key(&col.field_name) {
                normalize_date_input(text)
            } else {
                text.to_string()
            };
            Ok(FieldValue::Text(text))
        }
    }
}

/// Values stashed verbatim keep the date rewrite so legacy callers that
/// post `dd/mm/yyyy` under ad-hoc keys still sort correctly later.
fn stash_value(key: &str, value: &serde_json::Value) -> FieldValue {
    let parsed = FieldValue::from_json(value);
    match parsed {
        FieldValue::Text(text) if is_date_key(key) => {
            FieldValue::Text(normalize_date_input(&text))
        }
        other => other,
    }
}

/// Validate a submission against the descriptor, the dynamic columns and
/// the current table contents. Returns every field error at once; a
/// success carries the typed values ready to store.
pub async fn validate_submission(
    descriptor: &EntityDescriptor,
    columns: &ColumnSet,
    payload: &JsonMap,
    instance: Option<&Record>,
    store: &Store,
) -> Result<Submission> {
    let mut errors: FieldErrors = FieldErrors::new();
    let mut values: Vec<FieldValue> = Vec::with_capacity(descriptor.fields.len());
    let mut password: Option<String> = None;
    // (field name, target entity, id) checked against the store afterwards
    let mut pending_refs: Vec<(&'static str, &'static str, u64)> = Vec::new();

    for (idx, field) in descriptor.fields.iter().enumerate() {
        if field.role == FieldRole::Password {
            if let Some(text) = raw_text(payload, field.name).filter(|t| !t.is_empty()) {
                password = Some(text);
            }
            values.push(FieldValue::Null);
            continue;
        }
        if field.role == FieldRole::Code {
            // read-only once assigned; blank on create means auto-generate
            let value = match instance {
                Some(record) => record.values.get(idx).cloned().unwrap_or(FieldValue::Null),
                None => raw_text(payload, field.name)
                    .filter(|t| !t.is_empty())
                    .map(FieldValue::Text)
                    .unwrap_or(FieldValue::Null),
            };
            values.push(value);
            continue;
        }

        let raw = raw_text(payload, field.name).filter(|t| !t.is_empty());
        let value = match raw {
            Some(text) => parse_scalar(field, &text, &mut errors),
            None => {
                let fallback = default_for(field);
                if fallback.is_null() && field.required {
                    push_error(&mut errors, field.name, "This field is required.");
                }
                fallback
            }
        };

        if let (Some(reference), FieldValue::Number(n)) = (&field.reference, &value) {
            if n.fract() != 0.0 || *n < 1.0 {
                push_error(&mut errors, field.name, "Enter a valid id.");
            } else {
                pending_refs.push((field.name, reference.entity, *n as u64));
            }
        }
        values.push(value);
    }

    for (field_name, entity, id) in &pending_refs {
        if let Ok(table) = store.table(entity) {
            if table.read().await.get(*id).is_none() {
                push_error(
                    &mut errors,
                    field_name,
                    format!("No {} record with id {}", entity, id),
                );
            }
        }
    }

    if let Ok(table) = store.table(descriptor.name) {
        let collision = table.read().await.find_unique_collision(
            descriptor,
            &values,
            instance.map(|r| r.id),
        );
        if let Some((name, _)) = collision {
            let label = descriptor
                .field(name)
                .map(|f| f.label().to_lowercase())
                .unwrap_or_else(|| name.to_string());
            push_error(
                &mut errors,
                name,
                format!("A record with this {} already exists.", label),
            );
        }
    }

    match descriptor.name {
        "userprofile" => {
            check_profile_staff_link(descriptor, &values, instance, store, &mut errors).await;
        }
        "column" => {
            check_column_pair(descriptor, &values, instance, store, &mut errors).await;
        }
        _ => {}
    }

    let mut extra: BTreeMap<String, FieldValue> = BTreeMap::new();
    if descriptor.has_extra_data {
        for col in &columns.fields {
            let key = col.input_name();
            match raw_text(payload, &key).filter(|t| !t.is_empty()) {
                Some(text) => match parse_extra(col, &text) {
                    Ok(value) => {
                        extra.insert(col.field_name.clone(), value);
                    }
                    Err(message) => push_error(&mut errors, &key, message),
                },
                None => {
                    if col.required {
                        push_error(&mut errors, &key, "This field is required.");
                    }
                }
            }
        }
        // anything else submitted lands in the extra bag rather than
        // being dropped
        for (key, value) in payload {
            if key == "id" || key == "password" {
                continue;
            }
            if let Some(bare) = key.strip_prefix("extra__") {
                if !columns.fields.iter().any(|c| c.field_name == bare) {
                    extra.insert(bare.to_string(), stash_value(bare, value));
                }
            } else if !descriptor.has_field(key) {
                extra.insert(key.clone(), stash_value(key, value));
            }
        }
    }

    if errors.is_empty() {
        Ok(Submission {
            values,
            extra,
            password,
        })
    } else {
        Err(EngineError::Validation(errors))
    }
}

/// A profile must point at an active staff member nobody else holds,
/// unless the edit keeps the staff it already pointed at.
async fn check_profile_staff_link(
    descriptor: &EntityDescriptor,
    values: &[FieldValue],
    instance: Option<&Record>,
    store: &Store,
    errors: &mut FieldErrors,
) {
    let Some(idx) = descriptor.field_index("staff") else {
        return;
    };
    let Some(FieldValue::Number(n)) = values.get(idx) else {
        return;
    };
    let staff_id = *n as u64;

    let previous = instance.and_then(|record| record.values.get(idx));
    if previous == Some(&FieldValue::Number(staff_id as f64)) {
        return;
    }

    if let (Ok(staff_table), Some(staff_desc)) = (store.table("staff"), REGISTRY.get("staff")) {
        if let Some(row) = staff_table.read().await.get(staff_id) {
            if !row.is_active(staff_desc) {
                push_error(errors, "staff", "Select an active staff member.");
            }
        }
    }

    if let Ok(profiles) = store.table("userprofile") {
        let guard = profiles.read().await;
        let taken = guard.rows().any(|row| {
            Some(row.id) != instance.map(|r| r.id)
                && row.values.get(idx) == Some(&FieldValue::Number(staff_id as f64))
        });
        if taken {
            push_error(
                errors,
                "staff",
                "This staff member is already linked to another profile.",
            );
        }
    }
}

/// Dynamic columns are unique per (module, field name) pair, with module
/// names compared the same loose way entity names resolve.
async fn check_column_pair(
    descriptor: &EntityDescriptor,
    values: &[FieldValue],
    instance: Option<&Record>,
    store: &Store,
    errors: &mut FieldErrors,
) {
    let module = descriptor
        .field_index("module")
        .and_then(|idx| values.get(idx))
        .and_then(FieldValue::as_str);
    let field_name = descriptor
        .field_index("field_name")
        .and_then(|idx| values.get(idx))
        .and_then(FieldValue::as_str);
    let (Some(module), Some(field_name)) = (module, field_name) else {
        return;
    };
    let wanted = normalize_entity(module);

    if let Ok(table) = store.table("column") {
        let guard = table.read().await;
        let clash = guard.rows().any(|row| {
            Some(row.id) != instance.map(|r| r.id)
                && row
                    .value(descriptor, "module")
                    .and_then(FieldValue::as_str)
                    .map(|m| normalize_entity(m) == wanted)
                    .unwrap_or(false)
                && row.value(descriptor, "field_name").and_then(FieldValue::as_str)
                    == Some(field_name)
        });
        if clash {
            push_error(
                errors,
                "field_name",
                "A column with this field name already exists for this module.",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::REGISTRY;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> JsonMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    fn staff_payload(name: &str, contact: &str, aadhaar: &str) -> JsonMap {
        payload(json!({
            "name": name,
            "contact1": contact,
            "adharno": aadhaar,
            "joining_date": "15/06/2023",
        }))
    }

    async fn insert_staff(store: &Store, name: &str, contact: &str, aadhaar: &str) -> u64 {
        let descriptor = REGISTRY.get("staff").unwrap();
        let columns = ColumnSet::default();
        let submission = validate_submission(
            descriptor,
            &columns,
            &staff_payload(name, contact, aadhaar),
            None,
            store,
        )
        .await
        .unwrap();
        let table = store.table("staff").unwrap();
        let mut guard = table.write().await;
        guard.insert(submission.values, submission.extra)
    }

    #[tokio::test]
    async fn test_required_and_pattern_errors_collected_together() {
        let store = Store::provision(&REGISTRY, &[]);
        let descriptor = REGISTRY.get("staff").unwrap();
        let data = payload(json!({
            "contact1": "98-76",
            "adharno": "123456789012",
        }));
        let err = validate_submission(descriptor, &ColumnSet::default(), &data, None, &store)
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(errors) => {
                assert!(errors["name"][0].contains("required"));
                assert!(errors["contact1"][0].contains("10 digits"));
                assert!(errors["adharno"][0].contains("0000 0000 0000"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dates_normalize_and_status_backfills() {
        let store = Store::provision(&REGISTRY, &[]);
        let descriptor = REGISTRY.get("staff").unwrap();
        let data = staff_payload("Asha", "9876543210", "1234 5678 9012");
        let submission =
            validate_submission(descriptor, &ColumnSet::default(), &data, None, &store)
                .await
                .unwrap();

        let joining = descriptor.field_index("joining_date").unwrap();
        assert_eq!(
            submission.values[joining].to_string(),
            "2023-06-15",
            "dd/mm/yyyy input becomes a sortable date"
        );
        let status = descriptor.status_index().unwrap();
        assert_eq!(submission.values[status], FieldValue::Text("active".into()));
    }

    #[tokio::test]
    async fn test_uniqueness_skips_the_record_being_edited() {
        let store = Store::provision(&REGISTRY, &[]);
        let descriptor = REGISTRY.get("staff").unwrap();
        let id = insert_staff(&store, "Asha", "9876543210", "1234 5678 9012").await;

        // another record with the same phone collides
        let data = staff_payload("Banu", "9876543210", "2222 3333 4444");
        let err = validate_submission(descriptor, &ColumnSet::default(), &data, None, &store)
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(errors) => {
                assert!(errors["contact1"][0].contains("already exists"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        // editing the owner with its own phone passes
        let table = store.table("staff").unwrap();
        let instance = table.read().await.get(id).cloned().unwrap();
        let data = staff_payload("Asha Updated", "9876543210", "1234 5678 9012");
        let submission =
            validate_submission(descriptor, &ColumnSet::default(), &data, Some(&instance), &store)
                .await;
        assert!(submission.is_ok());
    }

    #[tokio::test]
    async fn test_profile_requires_active_unlinked_staff() {
        let store = Store::provision(&REGISTRY, &[]);
        let profile_desc = REGISTRY.get("userprofile").unwrap();
        let staff_id = insert_staff(&store, "Asha", "9876543210", "1234 5678 9012").await;

        // deactivate the staff row
        {
            let staff_desc = REGISTRY.get("staff").unwrap();
            let table = store.table("staff").unwrap();
            let mut guard = table.write().await;
            let status = staff_desc.status_index().unwrap();
            guard.get_mut(staff_id).unwrap().values[status] = FieldValue::Text("inactive".into());
        }

        let data = payload(json!({ "user": "asha", "staff": staff_id }));
        let err = validate_submission(profile_desc, &ColumnSet::default(), &data, None, &store)
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(errors) => {
                assert!(errors["staff"][0].contains("active staff"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_profile_keeping_its_own_staff_passes() {
        let store = Store::provision(&REGISTRY, &[]);
        let profile_desc = REGISTRY.get("userprofile").unwrap();
        let staff_id = insert_staff(&store, "Asha", "9876543210", "1234 5678 9012").await;

        let data = payload(json!({ "user": "asha", "staff": staff_id }));
        let submission =
            validate_submission(profile_desc, &ColumnSet::default(), &data, None, &store)
                .await
                .unwrap();
        let profile_id = {
            let table = store.table("userprofile").unwrap();
            let mut guard = table.write().await;
            guard.insert(submission.values, submission.extra)
        };

        // deactivating the staff later must not block an unrelated edit
        {
            let staff_desc = REGISTRY.get("staff").unwrap();
            let table = store.table("staff").unwrap();
            let mut guard = table.write().await;
            let status = staff_desc.status_index().unwrap();
            guard.get_mut(staff_id).unwrap().values[status] = FieldValue::Text("inactive".into());
        }
        let instance = {
            let table = store.table("userprofile").unwrap();
            let guard = table.read().await;
            guard.get(profile_id).cloned().unwrap()
        };
        let data = payload(json!({ "user": "asha", "staff": staff_id, "department": "Field" }));
        let result =
            validate_submission(profile_desc, &ColumnSet::default(), &data, Some(&instance), &store)
                .await;
        assert!(result.is_ok());

        // a second profile for the same staff is rejected
        let data = payload(json!({ "user": "other", "staff": staff_id }));
        let err = validate_submission(profile_desc, &ColumnSet::default(), &data, None, &store)
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(errors) => {
                assert!(errors["staff"][0].contains("already linked"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_keys_and_extra_columns_land_in_extra() {
        let store = Store::provision(&REGISTRY, &[]);
        let descriptor = REGISTRY.get("staff").unwrap();
        let columns = ColumnSet {
            fields: vec![ColumnDef {
                field_name: "blood_group".to_string(),
                label: "Blood Group".to_string(),
                kind: FieldKind::Text,
                is_file: false,
                required: false,
                order: 0,
            }],
            warning: None,
        };
        let mut data = staff_payload("Asha", "9876543210", "1234 5678 9012");
        data.insert("extra__blood_group".to_string(), json!("O+"));
        data.insert("old_branch_code".to_string(), json!("BR7"));
        data.insert("transfer_date".to_string(), json!("01/04/2022"));

        let submission = validate_submission(descriptor, &columns, &data, None, &store)
            .await
            .unwrap();
        assert_eq!(
            submission.extra.get("blood_group"),
            Some(&FieldValue::Text("O+".into()))
        );
        assert_eq!(
            submission.extra.get("old_branch_code"),
            Some(&FieldValue::Text("BR7".into()))
        );
        // ad-hoc date keys still get the rewrite
        assert_eq!(
            submission.extra.get("transfer_date"),
            Some(&FieldValue::Text("2022-04-01".into()))
        );
    }

    #[tokio::test]
    async fn test_code_is_immutable_on_edit() {
        let store = Store::provision(&REGISTRY, &[]);
        let descriptor = REGISTRY.get("staff").unwrap();
        let code_idx = descriptor.code_field_index().unwrap();

        let id = {
            let mut submission = validate_submission(
                descriptor,
                &ColumnSet::default(),
                &staff_payload("Asha", "9876543210", "1234 5678 9012"),
                None,
                &store,
            )
            .await
            .unwrap();
            submission.values[code_idx] = FieldValue::Text("STF001".into());
            let table = store.table("staff").unwrap();
            let mut guard = table.write().await;
            guard.insert(submission.values, submission.extra)
        };

        let instance = {
            let table = store.table("staff").unwrap();
            let guard = table.read().await;
            guard.get(id).cloned().unwrap()
        };
        let mut data = staff_payload("Asha", "9876543210", "1234 5678 9012");
        data.insert("staffcode".to_string(), json!("STF999"));
        let submission =
            validate_submission(descriptor, &ColumnSet::default(), &data, Some(&instance), &store)
                .await
                .unwrap();
        assert_eq!(submission.values[code_idx], FieldValue::Text("STF001".into()));
    }

    #[tokio::test]
    async fn test_column_module_field_pair_is_unique() {
        let store = Store::provision(&REGISTRY, &[]);
        let descriptor = REGISTRY.get("column").unwrap();
        let data = payload(json!({
            "module": "Staff",
            "field_name": "id_proof",
            "field_type": "file",
        }));
        let submission =
            validate_submission(descriptor, &ColumnSet::default(), &data, None, &store)
                .await
                .unwrap();
        {
            let table = store.table("column").unwrap();
            let mut guard = table.write().await;
            guard.insert(submission.values, submission.extra);
        }

        // same pair under a loosely-matching module name
        let data = payload(json!({
            "module": "staff",
            "field_name": "id_proof",
        }));
        let err = validate_submission(descriptor, &ColumnSet::default(), &data, None, &store)
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(errors) => {
                assert!(errors["field_name"][0].contains("already exists"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_form_previews_code_and_hides_status() {
        let descriptor = REGISTRY.get("staff").unwrap();
        let form = build_form(descriptor, &ColumnSet::default(), None, Some("STF005"));
        assert_eq!(form.title, "New Staff");
        let code = form.fields.iter().find(|f| f.name == "staffcode").unwrap();
        assert_eq!(code.value, "STF005");
        assert!(code.read_only);
        let status = form.fields.iter().find(|f| f.name == "status").unwrap();
        assert_eq!(status.widget, Widget::Hidden);
        assert_eq!(status.value, "active");
        let phone = form.fields.iter().find(|f| f.name == "contact1").unwrap();
        assert_eq!(phone.pattern, Some("[0-9]{10}"));
    }
}

//! Dynamic column store: administrator-defined extra form fields, stored
//! as ordinary rows of the `column` entity and read back at form-build
//! time for the matching module.

use crate::core::error::EngineError;
use crate::core::field::FieldKind;
use crate::core::value::FieldValue;
use crate::registry::{normalize_entity, REGISTRY};
use crate::store::Store;

/// One administrator-defined extra field.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub field_name: String,
    pub label: String,
    pub kind: FieldKind,
    /// `file` columns carry the uploaded file's name as text.
    pub is_file: bool,
    pub required: bool,
    pub order: i64,
}

impl ColumnDef {
    /// Submission key for this column (`extra__<field_name>`).
    pub fn input_name(&self) -> String {
        format!("extra__{}", self.field_name)
    }
}

/// The columns resolved for one entity, plus the warning carried when the
/// backing table is unavailable.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    pub fields: Vec<ColumnDef>,
    pub warning: Option<String>,
}

fn parse_kind(raw: &str) -> (FieldKind, bool) {
    match raw.trim().to_ascii_lowercase().as_str() {
        "date" => (FieldKind::Date, false),
        "number" => (FieldKind::Number, false),
        "file" => (FieldKind::Text, true),
        // unknown kinds fall back to free text
        _ => (FieldKind::Text, false),
    }
}

/// Read the dynamic columns declared for `entity`, ordered by declared
/// order then id. A missing `column` table degrades to an empty set with
/// a warning; it never fails the request.
pub async fn columns_for(store: &Store, entity: &str) -> ColumnSet {
    let table = match store.table("column") {
        Ok(table) => table,
        Err(EngineError::TableMissing(_)) => {
            tracing::warn!(entity, "column table missing; extra fields skipped");
            return ColumnSet {
                fields: Vec::new(),
                warning: Some(
                    "Custom columns are unavailable: the column table is missing.".to_string(),
                ),
            };
        }
        Err(err) => {
            tracing::warn!(entity, error = %err, "column lookup failed; extra fields skipped");
            return ColumnSet::default();
        }
    };

    let descriptor = match REGISTRY.get("column") {
        Some(d) => d,
        None => return ColumnSet::default(),
    };
    let wanted = normalize_entity(entity);

    let guard = table.read().await;
    let mut rows: Vec<(i64, u64, ColumnDef)> = Vec::new();
    for row in guard.rows() {
        let module = row
            .value(descriptor, "module")
            .and_then(FieldValue::as_str)
            .unwrap_or("");
        if normalize_entity(module) != wanted {
            continue;
        }
        let field_name = row
            .value(descriptor, "field_name")
            .and_then(FieldValue::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        if field_name.is_empty() {
            continue;
        }
        let label = row
            .value(descriptor, "label")
            .and_then(FieldValue::as_str)
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| field_name.clone());
        let (kind, is_file) = parse_kind(
            row.value(descriptor, "field_type")
                .and_then(FieldValue::as_str)
                .unwrap_or("text"),
        );
        let required = row
            .value(descriptor, "required")
            .map(FieldValue::is_truthy)
            .unwrap_or(false);
        let order = row
            .value(descriptor, "order")
            .and_then(FieldValue::as_f64)
            .unwrap_or(0.0) as i64;
        rows.push((
            order,
            row.id,
            ColumnDef {
                field_name,
                label,
                kind,
                is_file,
                required,
                order,
            },
        ));
    }
    rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    ColumnSet {
        fields: rows.into_iter().map(|(_, _, def)| def).collect(),
        warning: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    async fn add_column(store: &Store, module: &str, field: &str, ftype: &str, order: f64) {
        let descriptor = REGISTRY.get("column").unwrap();
        let table = store.table("column").unwrap();
        let mut guard = table.write().await;
        let values = descriptor
            .fields
            .iter()
            .map(|f| match f.name {
                "module" => FieldValue::Text(module.into()),
                "field_name" => FieldValue::Text(field.into()),
                "field_type" => FieldValue::Text(ftype.into()),
                "order" => FieldValue::Number(order),
                _ => FieldValue::Null,
            })
            .collect();
        guard.insert(values, BTreeMap::new());
    }

    #[tokio::test]
    async fn test_columns_filtered_and_ordered() {
        let store = Store::provision(&REGISTRY, &[]);
        add_column(&store, "Staff", "blood_group", "text", 2.0).await;
        add_column(&store, "staff", "id_proof", "file", 1.0).await;
        add_column(&store, "client", "nominee", "text", 1.0).await;

        let set = columns_for(&store, "staff").await;
        assert!(set.warning.is_none());
        let names: Vec<_> = set.fields.iter().map(|c| c.field_name.as_str()).collect();
        assert_eq!(names, vec!["id_proof", "blood_group"]);
        assert!(set.fields[0].is_file);
        assert_eq!(set.fields[0].input_name(), "extra__id_proof");
    }

    #[tokio::test]
    async fn test_unknown_kind_defaults_to_text() {
        let store = Store::provision(&REGISTRY, &[]);
        add_column(&store, "client", "remark", "paragraph", 0.0).await;
        let set = columns_for(&store, "client").await;
        assert_eq!(set.fields[0].kind, FieldKind::Text);
        assert!(!set.fields[0].is_file);
    }

    #[tokio::test]
    async fn test_missing_table_degrades_with_warning() {
        let store = Store::provision(&REGISTRY, &["column".to_string()]);
        let set = columns_for(&store, "staff").await;
        assert!(set.fields.is_empty());
        assert!(set.warning.is_some());
    }
}

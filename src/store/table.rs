use crate::core::value::FieldValue;
use crate::registry::EntityDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored row: declared field values positionally aligned with the
/// descriptor's field list, plus the unstructured bags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub values: Vec<FieldValue>,
    pub extra_data: BTreeMap<String, FieldValue>,
    pub raw_csv_data: Option<BTreeMap<String, FieldValue>>,
}

impl Record {
    pub fn value<'a>(&'a self, descriptor: &EntityDescriptor, name: &str) -> Option<&'a FieldValue> {
        descriptor.field_index(name).and_then(|idx| self.values.get(idx))
    }

    /// Active test across whatever status-like fields the type declares
    /// (`status`, `is_active`, `active`), OR-ed the way legacy data needs:
    /// any one reading as active makes the record active. Types without
    /// such fields are always active.
    pub fn is_active(&self, descriptor: &EntityDescriptor) -> bool {
        let mut saw_flag = false;
        for name in ["status", "is_active", "active"] {
            if let Some(idx) = descriptor.field_index(name) {
                saw_flag = true;
                if let Some(v) = self.values.get(idx) {
                    if v.is_active_sentinel() {
                        return true;
                    }
                }
            }
        }
        !saw_flag
    }

    /// True when the extra-data bag carries `deleted = true`.
    pub fn is_deleted_flagged(&self) -> bool {
        self.extra_data
            .get("deleted")
            .map(|v| v.is_truthy())
            .unwrap_or(false)
    }

    /// JSON object for list/detail payloads: id, every declared field by
    /// name, the extra bag, and the raw CSV snapshot when one exists.
    pub fn to_json(&self, descriptor: &EntityDescriptor) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("id".to_string(), serde_json::Value::from(self.id));
        for (idx, field) in descriptor.fields.iter().enumerate() {
            let value = self
                .values
                .get(idx)
                .map(FieldValue::to_json)
                .unwrap_or(serde_json::Value::Null);
            obj.insert(field.name.to_string(), value);
        }
        if descriptor.has_extra_data && !self.extra_data.is_empty() {
            let extra: serde_json::Map<String, serde_json::Value> = self
                .extra_data
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            obj.insert("extra_data".to_string(), serde_json::Value::Object(extra));
        }
        if let Some(raw) = &self.raw_csv_data {
            if !raw.is_empty() {
                let raw: serde_json::Map<String, serde_json::Value> =
                    raw.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                obj.insert("raw_csv_data".to_string(), serde_json::Value::Object(raw));
            }
        }
        serde_json::Value::Object(obj)
    }
}

/// In-memory table for one record type. Rows are keyed by id in insertion
/// order; ids are never reused within a process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub entity: String,
    next_id: u64,
    rows: BTreeMap<u64, Record>,
}

impl Table {
    pub fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Record> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Record> {
        self.rows.get_mut(&id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.rows.values()
    }

    pub fn max_id(&self) -> u64 {
        self.rows.keys().next_back().copied().unwrap_or(0)
    }

    pub fn insert(
        &mut self,
        values: Vec<FieldValue>,
        extra_data: BTreeMap<String, FieldValue>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(
            id,
            Record {
                id,
                values,
                extra_data,
                raw_csv_data: None,
            },
        );
        id
    }

    pub fn remove(&mut self, id: u64) -> Option<Record> {
        self.rows.remove(&id)
    }

    /// Find the first unique-field collision for a candidate row, ignoring
    /// the record being edited. A unique field collides when another row
    /// holds the same non-empty value either in the declared column or
    /// under the same key in its extra bag (legacy imports stashed a few
    /// identifying numbers there).
    pub fn find_unique_collision(
        &self,
        descriptor: &EntityDescriptor,
        values: &[FieldValue],
        ignore_id: Option<u64>,
    ) -> Option<(&'static str, FieldValue)> {
        for (idx, field) in descriptor.fields.iter().enumerate() {
            if !field.unique {
                continue;
            }
            let candidate = match values.get(idx) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            if let FieldValue::Text(s) = candidate {
                if s.trim().is_empty() {
                    continue;
                }
            }
            for row in self.rows.values() {
                if Some(row.id) == ignore_id {
                    continue;
                }
                let declared_hit = row.values.get(idx).map(|v| v == candidate).unwrap_or(false);
                let extra_hit = row
                    .extra_data
                    .get(field.name)
                    .map(|v| v == candidate)
                    .unwrap_or(false);
                if declared_hit || extra_hit {
                    return Some((field.name, candidate.clone()));
                }
            }
        }
        None
    }

    /// Next auto-code number: strictly greater than every existing row id
    /// and every numeric suffix already present on the code field.
    pub fn next_code_number(&self, descriptor: &EntityDescriptor) -> u64 {
        let mut max = self.max_id();
        if let (Some(spec), Some(idx)) = (descriptor.code, descriptor.code_field_index()) {
            for row in self.rows.values() {
                if let Some(FieldValue::Text(code)) = row.values.get(idx) {
                    if let Some(suffix) = code.strip_prefix(spec.prefix) {
                        if let Ok(n) = suffix.trim().parse::<u64>() {
                            max = max.max(n);
                        }
                    }
                }
            }
        }
        max + 1
    }

    /// Rebuild from snapshot state.
    pub(crate) fn restore(entity: String, next_id: u64, rows: BTreeMap<u64, Record>) -> Self {
        let floor = rows.keys().next_back().copied().unwrap_or(0) + 1;
        Self {
            entity,
            next_id: next_id.max(floor),
            rows,
        }
    }

    pub(crate) fn into_parts(self) -> (String, u64, BTreeMap<u64, Record>) {
        (self.entity, self.next_id, self.rows)
    }
}

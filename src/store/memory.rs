use crate::core::error::{EngineError, Result};
use crate::core::field::OnDelete;
use crate::core::value::FieldValue;
use crate::registry::{normalize_entity, Registry};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store: one table per registered record type, each behind its
/// own `RwLock`. A write section on a table is the engine's transaction
/// boundary.
///
/// Provisioning can skip tables to mirror deployments whose migrations lag
/// the registry; touching a skipped table raises the typed missing-table
/// error the dispatcher knows how to degrade.
pub struct Store {
    tables: HashMap<&'static str, Arc<RwLock<super::table::Table>>>,
}

impl Store {
    pub fn provision(registry: &Registry, skip_tables: &[String]) -> Self {
        let skipped: Vec<String> = skip_tables.iter().map(|s| normalize_entity(s)).collect();
        let mut tables = HashMap::with_capacity(registry.len());
        for desc in registry.descriptors() {
            if skipped.iter().any(|s| s == desc.name) {
                tracing::warn!(entity = desc.name, "table not provisioned");
                continue;
            }
            tables.insert(
                desc.name,
                Arc::new(RwLock::new(super::table::Table::new(desc.name))),
            );
        }
        Self { tables }
    }

    pub fn has_table(&self, entity: &str) -> bool {
        self.tables.contains_key(entity)
    }

    pub fn table(&self, entity: &str) -> Result<Arc<RwLock<super::table::Table>>> {
        self.tables
            .get(entity)
            .cloned()
            .ok_or_else(|| EngineError::TableMissing(entity.to_string()))
    }

    pub(crate) fn tables(&self) -> impl Iterator<Item = (&'static str, &Arc<RwLock<super::table::Table>>)> {
        self.tables.iter().map(|(name, table)| (*name, table))
    }

    /// Entities whose rows point at `entity`/`id` through a `Restrict`
    /// reference. Any such row blocks deletion outright.
    pub async fn restrict_referrers(
        &self,
        registry: &Registry,
        entity: &str,
        id: u64,
    ) -> Vec<(String, String)> {
        let target = FieldValue::Number(id as f64);
        let mut blockers = Vec::new();
        for desc in registry.descriptors() {
            for (idx, field) in desc.fields.iter().enumerate() {
                match field.reference {
                    Some(r) if r.entity == entity && r.on_delete == OnDelete::Restrict => {}
                    _ => continue,
                }
                let table = match self.tables.get(desc.name) {
                    Some(t) => t,
                    None => continue,
                };
                let guard = table.read().await;
                if guard
                    .rows()
                    .any(|row| row.values.get(idx).map(|v| v == &target).unwrap_or(false))
                {
                    blockers.push((desc.name.to_string(), field.name.to_string()));
                }
            }
        }
        blockers
    }

    /// Null out `SetNull` references to a hard-deleted row.
    pub async fn apply_set_null(&self, registry: &Registry, entity: &str, id: u64) {
        let target = FieldValue::Number(id as f64);
        for desc in registry.descriptors() {
            for (idx, field) in desc.fields.iter().enumerate() {
                match field.reference {
                    Some(r) if r.entity == entity && r.on_delete == OnDelete::SetNull => {}
                    _ => continue,
                }
                let table = match self.tables.get(desc.name) {
                    Some(t) => t,
                    None => continue,
                };
                let mut guard = table.write().await;
                let ids: Vec<u64> = guard
                    .rows()
                    .filter(|row| row.values.get(idx).map(|v| v == &target).unwrap_or(false))
                    .map(|row| row.id)
                    .collect();
                for row_id in ids {
                    if let Some(row) = guard.get_mut(row_id) {
                        row.values[idx] = FieldValue::Null;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::REGISTRY;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_provision_covers_registry() {
        let store = Store::provision(&REGISTRY, &[]);
        assert!(store.has_table("staff"));
        assert!(store.has_table("acccashbook"));
        assert!(store.table("staff").is_ok());
    }

    #[tokio::test]
    async fn test_skipped_table_reports_missing() {
        let store = Store::provision(&REGISTRY, &["userprofile".to_string()]);
        assert!(!store.has_table("userprofile"));
        match store.table("userprofile") {
            Err(EngineError::TableMissing(entity)) => assert_eq!(entity, "userprofile"),
            other => panic!("expected missing table, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_restrict_referrers_sees_postings() {
        let store = Store::provision(&REGISTRY, &[]);
        let voucher_desc = REGISTRY.get("voucher").unwrap();
        let voucher_id = {
            let table = store.table("voucher").unwrap();
            let mut guard = table.write().await;
            let values = voucher_desc
                .fields
                .iter()
                .map(|f| match f.name {
                    "voucher_no" => FieldValue::Text("VCH001".into()),
                    "status" => FieldValue::Text("active".into()),
                    _ => FieldValue::Null,
                })
                .collect();
            guard.insert(values, BTreeMap::new())
        };
        let posting_desc = REGISTRY.get("posting").unwrap();
        {
            let table = store.table("posting").unwrap();
            let mut guard = table.write().await;
            let values = posting_desc
                .fields
                .iter()
                .map(|f| match f.name {
                    "voucher" => FieldValue::Number(voucher_id as f64),
                    _ => FieldValue::Null,
                })
                .collect();
            guard.insert(values, BTreeMap::new());
        }

        let blockers = store
            .restrict_referrers(&REGISTRY, "voucher", voucher_id)
            .await;
        assert!(blockers.iter().any(|(entity, field)| {
            entity == "posting" && field == "voucher"
        }));

        let clear = store.restrict_referrers(&REGISTRY, "voucher", 999).await;
        assert!(clear.is_empty());
    }
}

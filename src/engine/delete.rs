use crate::core::error::{EngineError, Result};
use crate::core::value::FieldValue;
use crate::registry::{EntityDescriptor, REGISTRY, SoftDeleteMode};
use crate::store::Store;

/// Entities whose missing table gets the operator-facing migrations
/// note instead of a hard failure.
const MIGRATION_NOTE_ENTITIES: &[&str] = &["userprofile", "appointment", "salarystatement"];

pub const MIGRATION_NOTE: &str = "Table missing. Run migrations, then retry delete.";

/// How a delete resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Status flipped to inactive.
    SoftDeleted,
    /// `deleted = true` written into the extra bag.
    Flagged,
    /// Row removed; `SetNull` references cleared.
    HardDeleted,
    /// Backing table absent; the operator is told to migrate.
    MigrationsNeeded { note: String },
}

impl DeleteOutcome {
    pub fn is_soft(&self) -> bool {
        matches!(self, DeleteOutcome::SoftDeleted | DeleteOutcome::Flagged)
    }
}

/// Run the delete ladder for one record. The referential check comes
/// first and blocks every path, soft ones included; only then does the
/// record's own type decide between status flip, extra-bag flag and
/// hard removal.
pub async fn execute(
    store: &Store,
    descriptor: &EntityDescriptor,
    id: u64,
) -> Result<DeleteOutcome> {
    let blockers = store.restrict_referrers(&REGISTRY, descriptor.name, id).await;
    if !blockers.is_empty() {
        let listing = blockers
            .iter()
            .map(|(entity, field)| format!("{}.{}", entity, field))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(EngineError::Conflict(format!(
            "Cannot delete {} {}: referenced by {}",
            descriptor.pretty, id, listing
        )));
    }

    let table = match store.table(descriptor.name) {
        Ok(table) => table,
        Err(EngineError::TableMissing(_)) if MIGRATION_NOTE_ENTITIES.contains(&descriptor.name) => {
            tracing::warn!(entity = descriptor.name, "delete against a missing table");
            return Ok(DeleteOutcome::MigrationsNeeded {
                note: MIGRATION_NOTE.to_string(),
            });
        }
        Err(err) => return Err(err),
    };

    let mode = descriptor.soft_delete_mode();
    {
        let mut guard = table.write().await;
        if guard.get(id).is_none() {
            return Err(EngineError::record_not_found(descriptor.name, id));
        }
        match mode {
            SoftDeleteMode::Status => {
                if let (Some(idx), Some(record)) = (descriptor.status_index(), guard.get_mut(id)) {
                    record.values[idx] = FieldValue::Text("inactive".to_string());
                }
                return Ok(DeleteOutcome::SoftDeleted);
            }
            SoftDeleteMode::ExtraFlag => {
                if let Some(record) = guard.get_mut(id) {
                    record
                        .extra_data
                        .insert("deleted".to_string(), FieldValue::Bool(true));
                }
                return Ok(DeleteOutcome::Flagged);
            }
            SoftDeleteMode::Hard => {
                guard.remove(id);
            }
        }
    }
    // write lock released before touching the referrers
    store.apply_set_null(&REGISTRY, descriptor.name, id).await;
    Ok(DeleteOutcome::HardDeleted)
}

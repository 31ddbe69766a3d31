//! Whole-store snapshots: every table serialized to MessagePack and
//! written with a temp-file-then-rename so a crash mid-write never leaves
//! a torn snapshot behind.

use crate::core::error::{EngineError, Result};
use crate::store::memory::Store;
use crate::store::table::Table;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub metadata: SnapshotMetadata,
    pub tables: Vec<Table>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: u64,
    pub row_count: usize,
    pub table_count: usize,
}

impl Store {
    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let mut tables = Vec::new();
        for (_, table) in self.tables() {
            tables.push(table.read().await.clone());
        }
        tables.sort_by(|a, b| a.entity.cmp(&b.entity));

        let row_count = tables.iter().map(Table::len).sum();
        let table_count = tables.len();
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let snapshot = StoreSnapshot {
            version: SNAPSHOT_VERSION,
            metadata: SnapshotMetadata {
                created_at,
                row_count,
                table_count,
            },
            tables,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = rmp_serde::to_vec(&snapshot)?;
        let temp_path = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            writer.write_all(&serialized)?;
            writer.flush()?;
            writer.get_mut().sync_all()?;
        }
        fs::rename(&temp_path, path)?;
        tracing::info!(
            path = %path.display(),
            tables = table_count,
            rows = row_count,
            "snapshot saved"
        );
        Ok(())
    }

    /// Restore table contents from a snapshot. Tables present in the file
    /// but absent from the registry are skipped with a warning. Returns
    /// the number of tables restored.
    pub async fn load_snapshot(&self, path: &Path) -> Result<usize> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let mut restored = 0;
        for loaded in snapshot.tables {
            let (entity, next_id, rows) = loaded.into_parts();
            match self.table(&entity) {
                Ok(table) => {
                    *table.write().await = Table::restore(entity, next_id, rows);
                    restored += 1;
                }
                Err(_) => {
                    tracing::warn!(entity = %entity, "snapshot table not in registry, skipped");
                }
            }
        }
        Ok(restored)
    }
}

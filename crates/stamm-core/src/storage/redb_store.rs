//! # redb-backed Store
//!
//! A disk-backed [`Store`] on the redb embedded database.
//!
//! Layout:
//! - one table per entity kind: `u64` id -> postcard bytes
//! - a `metadata` table: table name -> next id to assign
//!
//! Every operation runs in its own transaction, so a write is durable when
//! the call returns. Stages that resolve references by id can therefore run
//! back to back without an explicit flush.
//!
//! [`Store::commit_batch`] writes a whole [`WriteBatch`] in one transaction:
//! one fsync per batch, and an aborted batch leaves no rows behind.

use crate::store::{Store, WriteBatch, decode, encode};
use crate::types::entity::Entity;
use crate::types::{EntityKind, StammError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::fmt;
use std::path::{Path, PathBuf};

/// Table for metadata: table name -> next id
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn entity_table(kind: EntityKind) -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(kind.table_name())
}

fn io<E: fmt::Display>(e: E) -> StammError {
    StammError::Io(e.to_string())
}

/// A disk-backed store using redb.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StammError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(io)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(io)?;
        for kind in EntityKind::ALL {
            let _ = write_txn.open_table(entity_table(kind)).map_err(io)?;
        }
        let _ = write_txn.open_table(METADATA).map_err(io)?;
        write_txn.commit().map_err(io)?;

        Ok(Self { db, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// =============================================================================
// STORE TRAIT IMPLEMENTATION
// =============================================================================

impl Store for RedbStore {
    fn create<E: Entity>(&mut self, mut entity: E) -> Result<E::Id, StammError> {
        let table_name = E::KIND.table_name();
        let write_txn = self.db.begin_write().map_err(io)?;
        let id = {
            let mut meta_table = write_txn.open_table(METADATA).map_err(io)?;
            let raw = meta_table
                .get(table_name)
                .map_err(io)?
                .map(|v| v.value())
                .unwrap_or(1);

            let id = E::Id::from(raw);
            entity.assign_id(id);
            let bytes = encode(&entity)?;

            let mut table = write_txn.open_table(entity_table(E::KIND)).map_err(io)?;
            table.insert(raw, bytes.as_slice()).map_err(io)?;
            meta_table
                .insert(table_name, raw.saturating_add(1))
                .map_err(io)?;
            id
        };
        write_txn.commit().map_err(io)?;
        Ok(id)
    }

    fn get<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StammError> {
        let raw: u64 = id.into();
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(entity_table(E::KIND)).map_err(io)?;
        match table.get(raw).map_err(io)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn filter<E: Entity, F: Fn(&E) -> bool>(&self, predicate: F) -> Result<Vec<E>, StammError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(entity_table(E::KIND)).map_err(io)?;

        let mut matches = Vec::new();
        for entry in table.iter().map_err(io)? {
            let (_, value) = entry.map_err(io)?;
            let entity: E = decode(value.value())?;
            if predicate(&entity) {
                matches.push(entity);
            }
        }
        Ok(matches)
    }

    fn update<E: Entity>(&mut self, entity: &E) -> Result<(), StammError> {
        let raw: u64 = entity.id().into();
        let bytes = encode(entity)?;

        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(entity_table(E::KIND)).map_err(io)?;
            let exists = table.get(raw).map_err(io)?.is_some();
            if !exists {
                return Err(StammError::NotFound {
                    kind: E::KIND,
                    id: raw,
                });
            }
            table.insert(raw, bytes.as_slice()).map_err(io)?;
        }
        write_txn.commit().map_err(io)?;
        Ok(())
    }

    fn delete<E: Entity>(&mut self, id: E::Id) -> Result<bool, StammError> {
        let raw: u64 = id.into();
        let write_txn = self.db.begin_write().map_err(io)?;
        let existed = {
            let mut table = write_txn.open_table(entity_table(E::KIND)).map_err(io)?;
            let removed = table.remove(raw).map_err(io)?;
            removed.is_some()
        };
        write_txn.commit().map_err(io)?;
        Ok(existed)
    }

    fn count<E: Entity>(&self) -> Result<usize, StammError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(entity_table(E::KIND)).map_err(io)?;
        Ok(table.len().map_err(io)? as usize)
    }

    fn next_id(&self, kind: EntityKind) -> Result<u64, StammError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let meta_table = read_txn.open_table(METADATA).map_err(io)?;
        Ok(meta_table
            .get(kind.table_name())
            .map_err(io)?
            .map(|v| v.value())
            .unwrap_or(1))
    }

    fn commit_batch(&mut self, batch: WriteBatch) -> Result<(), StammError> {
        if batch.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on an early return aborts it.
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut meta_table = write_txn.open_table(METADATA).map_err(io)?;
            for (kind, entries) in &batch.staged {
                let current = meta_table
                    .get(kind.table_name())
                    .map_err(io)?
                    .map(|v| v.value())
                    .unwrap_or(1);
                batch.check_base(*kind, current)?;

                let mut table = write_txn.open_table(entity_table(*kind)).map_err(io)?;
                for (raw, bytes) in entries {
                    table.insert(*raw, bytes.as_slice()).map_err(io)?;
                }
                meta_table
                    .insert(kind.table_name(), batch.next_id(*kind))
                    .map_err(io)?;
            }
        }
        write_txn.commit().map_err(io)?;
        Ok(())
    }
}

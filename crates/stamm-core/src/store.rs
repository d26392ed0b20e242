//! # Store Contract
//!
//! Every component reaches entities through an explicit `Store` handle.
//! This module defines the contract and the in-memory backend.
//! The persistent backend lives in [`crate::storage`].
//!
//! Both backends hold postcard-encoded entities in per-kind maps keyed by
//! `u64`, so scans always run in ascending id order.
//!
//! Bulk writers stage creations in a [`WriteBatch`] and commit them at once:
//! either every staged entity lands or none does.

use crate::types::StammError;
use crate::types::entity::Entity;
use crate::types::EntityKind;
use std::collections::BTreeMap;

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Create/read/update/delete and filtered scans over entity kinds.
///
/// Ids are assigned by the store, start at 1 and are never reused.
pub trait Store {
    /// Assign the next id of `E::KIND`, persist, and return the id.
    fn create<E: Entity>(&mut self, entity: E) -> Result<E::Id, StammError>;

    fn get<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StammError>;

    /// Entities matching `predicate`, in ascending id order.
    fn filter<E: Entity, F: Fn(&E) -> bool>(&self, predicate: F) -> Result<Vec<E>, StammError>;

    /// Overwrite an existing entity. Fails with `NotFound` if absent.
    fn update<E: Entity>(&mut self, entity: &E) -> Result<(), StammError>;

    /// Remove an entity. Returns whether it existed.
    fn delete<E: Entity>(&mut self, id: E::Id) -> Result<bool, StammError>;

    fn count<E: Entity>(&self) -> Result<usize, StammError>;

    /// The id the next `create` of `kind` will assign.
    fn next_id(&self, kind: EntityKind) -> Result<u64, StammError>;

    /// Persist every creation staged in `batch` in one atomic write.
    ///
    /// Fails without writing anything if another write moved an id counter
    /// since the batch began.
    fn commit_batch(&mut self, batch: WriteBatch) -> Result<(), StammError>;

    /// Start staging creations against the current id counters.
    fn begin_batch(&self) -> Result<WriteBatch, StammError> {
        let mut base = BTreeMap::new();
        for kind in EntityKind::ALL {
            base.insert(kind, self.next_id(kind)?);
        }
        Ok(WriteBatch::new(base))
    }

    /// Every entity of a kind, in ascending id order.
    fn all<E: Entity>(&self) -> Result<Vec<E>, StammError> {
        self.filter(|_: &E| true)
    }

    /// Like [`Store::get`], but absence is `NotFound`.
    fn fetch<E: Entity>(&self, id: E::Id) -> Result<E, StammError> {
        self.get(id)?.ok_or_else(|| StammError::NotFound {
            kind: E::KIND,
            id: id.into(),
        })
    }
}

pub(crate) fn encode<E: Entity>(entity: &E) -> Result<Vec<u8>, StammError> {
    postcard::to_allocvec(entity).map_err(|e| StammError::Serialization(e.to_string()))
}

pub(crate) fn decode<E: Entity>(bytes: &[u8]) -> Result<E, StammError> {
    postcard::from_bytes(bytes).map_err(|e| StammError::Deserialization(e.to_string()))
}

// =============================================================================
// WRITE BATCH
// =============================================================================

/// Creations staged for a single commit.
///
/// Ids are assigned at staging time from the counters read when the batch
/// began, so staged entities can reference each other before the commit.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    /// Kind -> next id when the batch began
    pub(crate) base: BTreeMap<EntityKind, u64>,
    /// Kind -> next id after the staged creations
    pub(crate) next_ids: BTreeMap<EntityKind, u64>,
    /// Kind -> staged (id, encoded entity), in id order
    pub(crate) staged: BTreeMap<EntityKind, Vec<(u64, Vec<u8>)>>,
}

impl WriteBatch {
    fn new(base: BTreeMap<EntityKind, u64>) -> Self {
        Self {
            next_ids: base.clone(),
            base,
            staged: BTreeMap::new(),
        }
    }

    /// Stage `entity` and return the id it will have once committed.
    pub fn create<E: Entity>(&mut self, mut entity: E) -> Result<E::Id, StammError> {
        let raw = self.next_ids.get(&E::KIND).copied().unwrap_or(1);
        let id = E::Id::from(raw);
        entity.assign_id(id);
        let bytes = encode(&entity)?;

        self.staged.entry(E::KIND).or_default().push((raw, bytes));
        self.next_ids.insert(E::KIND, raw.saturating_add(1));
        Ok(id)
    }

    /// Number of staged entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.values().all(Vec::is_empty)
    }

    pub(crate) fn next_id(&self, kind: EntityKind) -> u64 {
        self.next_ids.get(&kind).copied().unwrap_or(1)
    }

    /// Reject the commit when the store's counter for `kind` has moved.
    pub(crate) fn check_base(&self, kind: EntityKind, current: u64) -> Result<(), StammError> {
        let base = self.base.get(&kind).copied().unwrap_or(1);
        if base != current {
            return Err(StammError::Io(format!(
                "{} changed since the batch began (next id {} -> {})",
                kind.table_name(),
                base,
                current
            )));
        }
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// Flat per-kind arenas held in memory.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Kind -> (id -> encoded entity)
    arenas: BTreeMap<EntityKind, BTreeMap<u64, Vec<u8>>>,
    /// Kind -> next id to assign
    next_ids: BTreeMap<EntityKind, u64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn arena(&self, kind: EntityKind) -> Option<&BTreeMap<u64, Vec<u8>>> {
        self.arenas.get(&kind)
    }
}

impl Store for MemoryStore {
    fn create<E: Entity>(&mut self, mut entity: E) -> Result<E::Id, StammError> {
        let raw = self.next_ids.get(&E::KIND).copied().unwrap_or(1);
        let id = E::Id::from(raw);
        entity.assign_id(id);
        let bytes = encode(&entity)?;

        self.arenas.entry(E::KIND).or_default().insert(raw, bytes);
        self.next_ids.insert(E::KIND, raw.saturating_add(1));
        Ok(id)
    }

    fn get<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StammError> {
        let raw: u64 = id.into();
        self.arena(E::KIND)
            .and_then(|arena| arena.get(&raw))
            .map(|bytes| decode(bytes))
            .transpose()
    }

    fn filter<E: Entity, F: Fn(&E) -> bool>(&self, predicate: F) -> Result<Vec<E>, StammError> {
        let Some(arena) = self.arena(E::KIND) else {
            return Ok(Vec::new());
        };
        let mut matches = Vec::new();
        for bytes in arena.values() {
            let entity: E = decode(bytes)?;
            if predicate(&entity) {
                matches.push(entity);
            }
        }
        Ok(matches)
    }

    fn update<E: Entity>(&mut self, entity: &E) -> Result<(), StammError> {
        let raw: u64 = entity.id().into();
        let bytes = encode(entity)?;
        match self
            .arenas
            .get_mut(&E::KIND)
            .and_then(|arena| arena.get_mut(&raw))
        {
            Some(slot) => {
                *slot = bytes;
                Ok(())
            }
            None => Err(StammError::NotFound {
                kind: E::KIND,
                id: raw,
            }),
        }
    }

    fn delete<E: Entity>(&mut self, id: E::Id) -> Result<bool, StammError> {
        let raw: u64 = id.into();
        Ok(self
            .arenas
            .get_mut(&E::KIND)
            .and_then(|arena| arena.remove(&raw))
            .is_some())
    }

    fn count<E: Entity>(&self) -> Result<usize, StammError> {
        Ok(self.arena(E::KIND).map_or(0, BTreeMap::len))
    }

    fn next_id(&self, kind: EntityKind) -> Result<u64, StammError> {
        Ok(self.next_ids.get(&kind).copied().unwrap_or(1))
    }

    fn commit_batch(&mut self, batch: WriteBatch) -> Result<(), StammError> {
        for kind in batch.staged.keys() {
            batch.check_base(*kind, self.next_id(*kind)?)?;
        }
        for (kind, entries) in &batch.staged {
            self.next_ids.insert(*kind, batch.next_id(*kind));
            let arena = self.arenas.entry(*kind).or_default();
            for (raw, bytes) in entries {
                arena.insert(*raw, bytes.clone());
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::IndividualId;
    use crate::types::entity::{Individual, Union};

    #[test]
    fn ids_start_at_one_per_kind() {
        let mut store = MemoryStore::new();
        let first = store.create(Individual::new("@I1@")).expect("create");
        let second = store.create(Individual::new("@I2@")).expect("create");
        let union = store.create(Union::new("@F1@")).expect("create");
        assert_eq!(first, IndividualId(1));
        assert_eq!(second, IndividualId(2));
        assert_eq!(u64::from(union), 1);
    }

    #[test]
    fn get_returns_stored_entity_with_id() {
        let mut store = MemoryStore::new();
        let id = store.create(Individual::new("@I1@")).expect("create");
        let person: Individual = store.get(id).expect("get").expect("present");
        assert_eq!(person.id, id);
        assert_eq!(person.source_key, "@I1@");
        assert!(store.get::<Individual>(IndividualId(99)).expect("get").is_none());
    }

    #[test]
    fn filter_is_ordered_by_id() {
        let mut store = MemoryStore::new();
        for key in ["@I3@", "@I1@", "@I2@"] {
            store.create(Individual::new(key)).expect("create");
        }
        let keys: Vec<String> = store
            .filter(|p: &Individual| p.source_key != "@I1@")
            .expect("filter")
            .into_iter()
            .map(|p| p.source_key)
            .collect();
        assert_eq!(keys, vec!["@I3@", "@I2@"]);
    }

    #[test]
    fn update_requires_existing_entity() {
        let mut store = MemoryStore::new();
        let id = store.create(Individual::new("@I1@")).expect("create");
        let mut person = store.fetch::<Individual>(id).expect("fetch");
        person.needs_review = true;
        store.update(&person).expect("update");
        assert!(store.fetch::<Individual>(id).expect("fetch").needs_review);

        person.id = IndividualId(42);
        match store.update(&person) {
            Err(StammError::NotFound { kind, id }) => {
                assert_eq!(kind, EntityKind::Individual);
                assert_eq!(id, 42);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn delete_does_not_reuse_ids() {
        let mut store = MemoryStore::new();
        let id = store.create(Individual::new("@I1@")).expect("create");
        assert!(store.delete::<Individual>(id).expect("delete"));
        assert!(!store.delete::<Individual>(id).expect("delete"));
        assert_eq!(store.count::<Individual>().expect("count"), 0);

        let next = store.create(Individual::new("@I2@")).expect("create");
        assert_eq!(next, IndividualId(2));
    }

    #[test]
    fn batch_ids_continue_from_store() {
        let mut store = MemoryStore::new();
        store.create(Individual::new("@I1@")).expect("create");

        let mut batch = store.begin_batch().expect("begin");
        let second = batch.create(Individual::new("@I2@")).expect("stage");
        let union = batch.create(Union::new("@F1@")).expect("stage");
        assert_eq!(second, IndividualId(2));
        assert_eq!(u64::from(union), 1);
        assert_eq!(batch.len(), 2);
        // nothing is visible before the commit
        assert_eq!(store.count::<Individual>().expect("count"), 1);

        store.commit_batch(batch).expect("commit");
        assert_eq!(store.count::<Individual>().expect("count"), 2);
        assert_eq!(
            store.fetch::<Individual>(second).expect("fetch").source_key,
            "@I2@"
        );
        let third = store.create(Individual::new("@I3@")).expect("create");
        assert_eq!(third, IndividualId(3));
    }

    #[test]
    fn stale_batch_is_rejected_whole() {
        let mut store = MemoryStore::new();
        let mut batch = store.begin_batch().expect("begin");
        batch.create(Union::new("@F1@")).expect("stage");
        batch.create(Individual::new("@I1@")).expect("stage");

        store.create(Individual::new("@I9@")).expect("create");
        assert!(matches!(
            store.commit_batch(batch),
            Err(StammError::Io(_))
        ));
        assert_eq!(store.count::<Union>().expect("count"), 0);
        assert_eq!(store.count::<Individual>().expect("count"), 1);
    }
}

//! Identity cache: one change record per entity key for a whole build pass
//!
//! Records live in an arena and are addressed by [`RecordId`], so inverse
//! propagation can update any record while the walk holds only ids.

use super::SyncRecord;
use crate::error::{MissingReason, SyncError};
use crate::graph::ObjectGraph;
use crate::model::EntityKey;
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

/// Stable index of a record inside an [`IdentityCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(usize);

/// Outcome of resolving a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(RecordId),
    Missing(MissingReason),
}

impl Resolution {
    pub fn found(self) -> Option<RecordId> {
        match self {
            Resolution::Found(id) => Some(id),
            Resolution::Missing(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct IdentityCache {
    records: Vec<SyncRecord>,
    index: HashMap<EntityKey, RecordId>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &EntityKey) -> Option<RecordId> {
        self.index.get(key).copied()
    }

    /// Insert a record under `key`. A key that is already cached keeps its
    /// existing record and that id is returned.
    pub fn insert(&mut self, key: EntityKey, record: SyncRecord) -> RecordId {
        if let Some(id) = self.lookup(&key) {
            return id;
        }
        let id = RecordId(self.records.len());
        self.records.push(record);
        self.index.insert(key, id);
        id
    }

    pub fn get(&self, id: RecordId) -> &SyncRecord {
        &self.records[id.0]
    }

    pub fn get_mut(&mut self, id: RecordId) -> &mut SyncRecord {
        &mut self.records[id.0]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn into_records(self) -> Vec<SyncRecord> {
        self.records
    }
}

impl Index<RecordId> for IdentityCache {
    type Output = SyncRecord;

    fn index(&self, id: RecordId) -> &SyncRecord {
        self.get(id)
    }
}

impl IndexMut<RecordId> for IdentityCache {
    fn index_mut(&mut self, id: RecordId) -> &mut SyncRecord {
        self.get_mut(id)
    }
}

/// Resolves entity keys to records across a source and a target graph,
/// caching every record it creates
pub struct Lookup<'a, S: ?Sized, T: ?Sized> {
    source: &'a S,
    target: &'a mut T,
    cache: IdentityCache,
}

impl<'a, S, T> Lookup<'a, S, T>
where
    S: ObjectGraph + ?Sized,
    T: ObjectGraph + ?Sized,
{
    pub fn new(source: &'a S, target: &'a mut T) -> Self {
        Self {
            source,
            target,
            cache: IdentityCache::new(),
        }
    }

    pub fn source(&self) -> &S {
        self.source
    }

    pub fn target(&mut self) -> &mut T {
        &mut *self.target
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut IdentityCache {
        &mut self.cache
    }

    pub fn into_cache(self) -> IdentityCache {
        self.cache
    }

    /// Find or hydrate the record for `key`.
    ///
    /// A miss consults the source tracker, then asks the target graph to
    /// find (or load) the entity. The hydrated record takes its source
    /// state from the source tracker and its target state from the target.
    pub fn resolve(&mut self, key: &EntityKey) -> Result<Resolution, SyncError> {
        if let Some(id) = self.cache.lookup(key) {
            return Ok(Resolution::Found(id));
        }

        let Some(source_entry) = self.source.state_entry(key) else {
            log::debug!("{} is not tracked by source '{}'", key, self.source.name());
            return Ok(Resolution::Missing(MissingReason::UntrackedInSource));
        };

        let Some(target_entry) = self.target.get_or_load(key).map_err(SyncError::Graph)? else {
            log::debug!("{} not found in target '{}'", key, self.target.name());
            return Ok(Resolution::Missing(MissingReason::AbsentInTarget));
        };

        let record = SyncRecord::new(
            target_entry.entity,
            key.clone(),
            source_entry.state,
            target_entry.state,
        );
        log::debug!(
            "Resolved {} (source {}, target {})",
            key,
            record.source_state,
            record.target_state
        );
        Ok(Resolution::Found(self.cache.insert(key.clone(), record)))
    }

    /// Like [`resolve`](Self::resolve), but a missing record is an error
    pub fn get_or_fail(&mut self, key: &EntityKey) -> Result<RecordId, SyncError> {
        match self.resolve(key)? {
            Resolution::Found(id) => Ok(id),
            Resolution::Missing(reason) => Err(SyncError::EntityNotFound {
                key: key.clone(),
                reason,
            }),
        }
    }
}

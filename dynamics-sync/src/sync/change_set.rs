//! Change-set aggregate: finished records grouped by source state
//!
//! Besides read access it offers the three operations that touch the target
//! graph: attaching detached records, refreshing from the store and
//! re-reading target states after a save.

use super::{SyncRecord, SyncReport};
use crate::graph::{EntityHandle, ObjectGraph, RefreshMode};
use crate::model::{EntityKey, EntityState, StateFilter};
use anyhow::Result;

#[derive(Debug, Default)]
pub struct ChangeSet {
    added: Vec<SyncRecord>,
    deleted: Vec<SyncRecord>,
    modified: Vec<SyncRecord>,
    unchanged: Vec<SyncRecord>,
}

impl ChangeSet {
    /// Group records by source state, keeping their order
    pub fn new(records: Vec<SyncRecord>) -> Self {
        let mut change_set = Self::default();
        for record in records {
            match record.source_state {
                EntityState::Added => change_set.added.push(record),
                EntityState::Deleted => change_set.deleted.push(record),
                EntityState::Modified => change_set.modified.push(record),
                EntityState::Unchanged => change_set.unchanged.push(record),
                EntityState::Detached => {
                    log::warn!("Dropping record {} with detached source state", record.target_key);
                }
            }
        }
        change_set
    }

    fn bucket(&self, state: EntityState) -> &[SyncRecord] {
        match state {
            EntityState::Added => &self.added,
            EntityState::Deleted => &self.deleted,
            EntityState::Modified => &self.modified,
            EntityState::Unchanged => &self.unchanged,
            EntityState::Detached => &[],
        }
    }

    /// Records whose source state is in `filter`, bucket by bucket
    pub fn entries(&self, filter: StateFilter) -> impl Iterator<Item = &SyncRecord> {
        filter.states().flat_map(move |state| self.bucket(state).iter())
    }

    fn records_mut(&mut self) -> impl Iterator<Item = &mut SyncRecord> {
        self.added
            .iter_mut()
            .chain(self.deleted.iter_mut())
            .chain(self.modified.iter_mut())
            .chain(self.unchanged.iter_mut())
    }

    /// Record for a target key
    pub fn find(&self, key: &EntityKey) -> Option<&SyncRecord> {
        self.entries(StateFilter::ALL).find(|r| &r.target_key == key)
    }

    pub fn count(&self, filter: StateFilter) -> usize {
        filter.states().map(|state| self.bucket(state).len()).sum()
    }

    pub fn len(&self) -> usize {
        self.count(StateFilter::ALL)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach every added, modified or unchanged record that the target
    /// does not track yet. Returns how many records were attached.
    pub fn sync<T: ObjectGraph + ?Sized>(&mut self, target: &mut T) -> Result<usize> {
        let mut attached = 0;
        for bucket in [&mut self.added, &mut self.modified, &mut self.unchanged] {
            for record in bucket.iter_mut() {
                if record.target_state != EntityState::Detached {
                    continue;
                }
                target.attach(&record.target_key, record.target_entity.clone())?;
                record.target_state = match target.state_entry(&record.target_key) {
                    Some(entry) => entry.state,
                    None => {
                        log::warn!(
                            "'{}' reports no state for {} after attach",
                            target.name(),
                            record.target_key
                        );
                        EntityState::Detached
                    }
                };
                log::debug!("Attached {} to '{}'", record.target_key, target.name());
                attached += 1;
            }
        }
        log::info!("Attached {} records to '{}'", attached, target.name());
        Ok(attached)
    }

    fn refreshable(&self, filter: StateFilter) -> Vec<EntityHandle> {
        self.entries(filter)
            .filter(|r| r.can_refresh())
            .map(|r| r.target_entity.clone())
            .collect()
    }

    /// Reload the filtered records from the store, store wins.
    /// Returns how many entities were handed to the target graph.
    pub fn refresh<T: ObjectGraph + ?Sized>(&self, target: &mut T, filter: StateFilter) -> Result<usize> {
        self.refresh_with(target, RefreshMode::StoreWins, filter)
    }

    pub fn refresh_with<T: ObjectGraph + ?Sized>(
        &self,
        target: &mut T,
        mode: RefreshMode,
        filter: StateFilter,
    ) -> Result<usize> {
        let entities = self.refreshable(filter);
        log::debug!("Refreshing {} entities in '{}' ({:?})", entities.len(), target.name(), mode);
        target.refresh(mode, &entities)?;
        Ok(entities.len())
    }

    /// Asynchronous [`refresh`](Self::refresh)
    pub async fn refresh_async<T: ObjectGraph + ?Sized>(&self, target: &mut T, filter: StateFilter) -> Result<usize> {
        self.refresh_async_with(target, RefreshMode::StoreWins, filter).await
    }

    pub async fn refresh_async_with<T: ObjectGraph + ?Sized>(
        &self,
        target: &mut T,
        mode: RefreshMode,
        filter: StateFilter,
    ) -> Result<usize> {
        let entities = self.refreshable(filter);
        let count = entities.len();
        log::debug!("Refreshing {} entities in '{}' ({:?})", count, target.name(), mode);
        target.refresh_async(mode, entities).await?;
        Ok(count)
    }

    /// Re-read every record's target state, then run the target's change
    /// detection. Call after the target has been saved.
    pub fn flush<T: ObjectGraph + ?Sized>(&mut self, target: &mut T) {
        let mut detached = 0;
        for record in self.records_mut() {
            record.target_state = target
                .state_entry(&record.target_key)
                .map(|e| e.state)
                .unwrap_or(EntityState::Detached);
            if record.target_state == EntityState::Detached {
                detached += 1;
            }
        }
        target.detect_changes();
        log::info!("Flushed change-set against '{}' ({} detached)", target.name(), detached);
    }

    /// Serializable summary of this change-set
    pub fn report(&self) -> SyncReport {
        SyncReport::from_change_set(self)
    }

    pub fn into_records(self) -> Vec<SyncRecord> {
        let mut records = self.added;
        records.extend(self.deleted);
        records.extend(self.modified);
        records.extend(self.unchanged);
        records
    }
}

//! Graph walker turning pending tracker entries into change records
//!
//! Entries are bucketed by state as they are added, then walked exactly once
//! by [`SyncBuilder::build`]. Entity entries hydrate or materialize records
//! and propagate foreign-key changes onto the inverse navigation of the
//! related records; relationship entries update the navigations on both
//! endpoints.

use super::cache::Lookup;
use super::{ChangeSet, SyncRecord, ValueSlot};
use crate::config::ProcessingOrder;
use crate::error::SyncError;
use crate::graph::{ChangeEntry, EntityEntry, ObjectGraph, ReferenceEnd, RelationshipEntry};
use crate::metadata::{Association, AssociationRegistry};
use crate::model::{EntityKey, EntityState};
use std::collections::HashSet;

/// Collects pending entries and builds a [`ChangeSet`] from them
pub struct SyncBuilder<'a, S: ?Sized, T: ?Sized> {
    lookup: Lookup<'a, S, T>,
    registry: &'a AssociationRegistry,
    order: ProcessingOrder,
    added: Vec<ChangeEntry>,
    deleted: Vec<ChangeEntry>,
    modified: Vec<ChangeEntry>,
    seen_entities: HashSet<EntityKey>,
    seen_relationships: HashSet<RelationshipEntry>,
}

impl<'a, S, T> SyncBuilder<'a, S, T>
where
    S: ObjectGraph + ?Sized,
    T: ObjectGraph + ?Sized,
{
    pub fn new(source: &'a S, target: &'a mut T, registry: &'a AssociationRegistry) -> Self {
        Self {
            lookup: Lookup::new(source, target),
            registry,
            order: ProcessingOrder::default(),
            added: Vec::new(),
            deleted: Vec::new(),
            modified: Vec::new(),
            seen_entities: HashSet::new(),
            seen_relationships: HashSet::new(),
        }
    }

    pub fn order(mut self, order: ProcessingOrder) -> Self {
        self.order = order;
        self
    }

    /// Bucket one entry by state. Entries in other states, and entries
    /// already added, are ignored.
    pub fn add(&mut self, entry: impl Into<ChangeEntry>) {
        let entry = entry.into();
        let state = entry.state();
        if !matches!(state, EntityState::Added | EntityState::Deleted | EntityState::Modified) {
            log::trace!("Ignoring entry in state {}", state);
            return;
        }

        let fresh = match &entry {
            ChangeEntry::Entity(e) => self.seen_entities.insert(e.key.clone()),
            ChangeEntry::Relationship(r) => self.seen_relationships.insert(r.clone()),
        };
        if !fresh {
            log::trace!("Ignoring duplicate {} entry", state);
            return;
        }

        match state {
            EntityState::Added => self.added.push(entry),
            EntityState::Deleted => self.deleted.push(entry),
            _ => self.modified.push(entry),
        }
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ChangeEntry>) {
        for entry in entries {
            self.add(entry);
        }
    }

    /// Number of bucketed entries
    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len() + self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walk every bucketed entry once and produce the change-set
    pub fn build(self) -> Result<ChangeSet, SyncError> {
        let SyncBuilder {
            lookup,
            registry,
            order,
            added,
            deleted,
            modified,
            ..
        } = self;

        let (entities, relationships): (Vec<_>, Vec<_>) = added
            .into_iter()
            .chain(deleted)
            .chain(modified)
            .partition(|e| !e.is_relationship());
        log::debug!(
            "Walking {} entity and {} relationship entries ({:?})",
            entities.len(),
            relationships.len(),
            order
        );

        let sequence = match order {
            ProcessingOrder::EntitiesFirst => entities.into_iter().chain(relationships),
            ProcessingOrder::RelationshipsFirst => relationships.into_iter().chain(entities),
        };

        let mut walk = Walk { lookup, registry };
        for entry in sequence {
            match &entry {
                ChangeEntry::Entity(e) => walk.load_entity(e)?,
                ChangeEntry::Relationship(r) => walk.load_relationship(r)?,
            }
        }

        let change_set = ChangeSet::new(walk.lookup.into_cache().into_records());
        log::info!(
            "Built change-set: {} added, {} deleted, {} modified, {} unchanged",
            change_set.count(EntityState::Added.into()),
            change_set.count(EntityState::Deleted.into()),
            change_set.count(EntityState::Modified.into()),
            change_set.count(EntityState::Unchanged.into())
        );
        Ok(change_set)
    }
}

struct Walk<'a, S: ?Sized, T: ?Sized> {
    lookup: Lookup<'a, S, T>,
    registry: &'a AssociationRegistry,
}

impl<'a, S, T> Walk<'a, S, T>
where
    S: ObjectGraph + ?Sized,
    T: ObjectGraph + ?Sized,
{
    fn load_entity(&mut self, entry: &EntityEntry) -> Result<(), SyncError> {
        match entry.state {
            EntityState::Added => self.load_added_entity(entry),
            EntityState::Deleted => self.load_deleted_entity(entry),
            EntityState::Modified => self.load_modified_entity(entry),
            other => {
                log::trace!("Skipping {} in state {}", entry.key, other);
                Ok(())
            }
        }
    }

    fn load_added_entity(&mut self, entry: &EntityEntry) -> Result<(), SyncError> {
        let registry = self.registry;
        let id = match self.lookup.cache().lookup(&entry.key) {
            Some(id) => id,
            None => {
                let record = self.create_added_record(entry)?;
                self.lookup.cache_mut().insert(entry.key.clone(), record)
            }
        };
        let related = self.lookup.cache()[id].as_related();

        for reference in &entry.references {
            let association = registry.require(&reference.association)?;
            if !association.is_dependent(&reference.source_role) {
                continue;
            }
            let Some(inverse) = association.inverse_of(&reference.source_role) else {
                continue;
            };
            let Some(key) = &reference.current_key else {
                continue;
            };
            let Some(current) = self.lookup.resolve(key)?.found() else {
                continue;
            };

            let record = &mut self.lookup.cache_mut()[current];
            if record.source_state == EntityState::Added {
                continue;
            }
            log::debug!("{} gains {} on '{}'", key, entry.key, inverse.navigation);
            record.apply(inverse.navigation, inverse.multiplicity, ValueSlot::Current, related.clone());
        }
        Ok(())
    }

    fn load_deleted_entity(&mut self, entry: &EntityEntry) -> Result<(), SyncError> {
        let registry = self.registry;
        let id = self.lookup.get_or_fail(&entry.key)?;
        let related = self.lookup.cache()[id].as_related();

        for reference in &entry.references {
            let association = registry.require(&reference.association)?;
            if !association.is_dependent(&reference.source_role) {
                continue;
            }
            let Some(inverse) = association.inverse_of(&reference.source_role) else {
                continue;
            };
            let Some(key) = self.original_key(entry, association, reference) else {
                continue;
            };
            let Some(original) = self.lookup.resolve(&key)?.found() else {
                continue;
            };

            let record = &mut self.lookup.cache_mut()[original];
            if record.source_state == EntityState::Deleted {
                continue;
            }
            log::debug!("{} loses {} on '{}'", key, entry.key, inverse.navigation);
            record.apply(inverse.navigation, inverse.multiplicity, ValueSlot::Original, related.clone());
        }
        Ok(())
    }

    fn load_modified_entity(&mut self, entry: &EntityEntry) -> Result<(), SyncError> {
        let registry = self.registry;
        let id = self.lookup.get_or_fail(&entry.key)?;
        let related = self.lookup.cache()[id].as_related();

        let record = &mut self.lookup.cache_mut()[id];
        for name in &entry.modified_properties {
            record.set_property(name.clone(), entry.original_value(name), entry.current_value(name));
        }

        for reference in &entry.references {
            let association = registry.require(&reference.association)?;
            if !association.is_dependent(&reference.source_role)
                || !association.is_reference_changed(&entry.modified_properties)
            {
                continue;
            }

            let original = match self.original_key(entry, association, reference) {
                Some(key) => self.lookup.resolve(&key)?.found(),
                None => None,
            };
            let current = match &reference.current_key {
                Some(key) => self.lookup.resolve(key)?.found(),
                None => None,
            };

            let cache = self.lookup.cache_mut();
            if let Some(navigation) = association
                .end(&reference.source_role)
                .and_then(|end| end.navigation.as_deref())
            {
                let original_entity = original.map(|o| cache[o].as_related());
                let current_entity = current.map(|c| cache[c].as_related());
                cache[id].set_reference(navigation, original_entity, current_entity);
            }

            let Some(inverse) = association.inverse_of(&reference.source_role) else {
                continue;
            };
            if let Some(original) = original {
                let record = &mut cache[original];
                if matches!(record.source_state, EntityState::Modified | EntityState::Unchanged) {
                    log::debug!("{} loses {} on '{}'", record.target_key, entry.key, inverse.navigation);
                    record.apply(inverse.navigation, inverse.multiplicity, ValueSlot::Original, related.clone());
                }
            }
            if let Some(current) = current {
                let record = &mut cache[current];
                if record.source_state != EntityState::Deleted {
                    log::debug!("{} gains {} on '{}'", record.target_key, entry.key, inverse.navigation);
                    record.apply(inverse.navigation, inverse.multiplicity, ValueSlot::Current, related.clone());
                }
            }
        }
        Ok(())
    }

    fn load_relationship(&mut self, entry: &RelationshipEntry) -> Result<(), SyncError> {
        let slot = match entry.state {
            EntityState::Added => ValueSlot::Current,
            EntityState::Deleted => ValueSlot::Original,
            other => {
                log::trace!("Skipping {} relationship '{}'", other, entry.association);
                return Ok(());
            }
        };
        let registry = self.registry;
        let association = registry.require(&entry.association)?;
        let ids = [
            self.lookup.get_or_fail(&entry.ends[0])?,
            self.lookup.get_or_fail(&entry.ends[1])?,
        ];

        let cache = self.lookup.cache_mut();
        let related = [cache[ids[0]].as_related(), cache[ids[1]].as_related()];
        for (i, end) in association.ends.iter().enumerate() {
            let Some(navigation) = end.navigation.as_deref() else {
                continue;
            };
            let other = 1 - i;
            cache[ids[i]].apply(
                navigation,
                association.ends[other].multiplicity,
                slot,
                related[other].clone(),
            );
        }
        log::debug!(
            "{} relationship '{}' between {} and {}",
            entry.state,
            entry.association,
            entry.ends[0],
            entry.ends[1]
        );
        Ok(())
    }

    /// Materialize (or find) the target-side counterpart of an added entity
    fn create_added_record(&mut self, entry: &EntityEntry) -> Result<SyncRecord, SyncError> {
        let target = self.lookup.target();
        if let Some(existing) = target.state_entry(&entry.key) {
            log::debug!("{} already tracked by target as {}", entry.key, existing.state);
            return Ok(SyncRecord::new(
                existing.entity,
                existing.key,
                EntityState::Added,
                existing.state,
            ));
        }

        let target_key = target
            .create_entity_key(&entry.key.entity_set, &entry.entity)
            .map_err(SyncError::Graph)?;
        let target_entity = match entry.entity.duplicate() {
            Some(copy) => {
                log::debug!("Duplicated {} for target", target_key);
                copy
            }
            None => {
                log::debug!("Instantiated bare {} for target", entry.entity.entity_type());
                entry.entity.instantiate()
            }
        };
        Ok(SyncRecord::new(
            target_entity,
            target_key,
            EntityState::Added,
            EntityState::Detached,
        ))
    }

    /// Key of the entity the dependent referenced before its pending change,
    /// rebuilt from original foreign-key values. Only keys the source tracks
    /// are returned.
    fn original_key(
        &self,
        entry: &EntityEntry,
        association: &Association,
        reference: &ReferenceEnd,
    ) -> Option<EntityKey> {
        if matches!(entry.state, EntityState::Added | EntityState::Detached) {
            return None;
        }
        let constraint = association.constraint.as_ref()?;
        let principal = association.end(&reference.target_role)?;

        let mut members = Vec::with_capacity(constraint.principal_properties.len());
        for (principal_property, dependent_property) in constraint.property_pairs() {
            let value = entry.original_value(dependent_property);
            if value.is_null() {
                return None;
            }
            members.push((principal_property, value));
        }

        let key = EntityKey::new(principal.entity_set.clone(), members);
        match self.lookup.source().state_entry(&key) {
            Some(source_entry) => Some(source_entry.key),
            None => {
                log::warn!("{} referenced by {} is not tracked by the source", key, entry.key);
                None
            }
        }
    }
}

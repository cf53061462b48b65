//! In-memory object graph
//!
//! A complete [`ObjectGraph`] backed by a simulated store. Entities are
//! [`MemoryEntity`] property bags. Each graph owns its own store, so two
//! graphs behave like two independent connections. Foreign-key references
//! are derived from the association registry's referential constraints.

use super::{
    ChangeEntry, Entity, EntityEntry, EntityHandle, ObjectGraph, ReferenceEnd, RefreshMode, RelationshipEntry,
    StateEntry, same_instance,
};
use crate::metadata::AssociationRegistry;
use crate::model::{EntityKey, EntityState, StateFilter, Value};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Property-bag entity used by [`MemoryGraph`]
#[derive(Debug)]
pub struct MemoryEntity {
    entity_type: String,
    values: RwLock<IndexMap<String, Value>>,
    duplicable: bool,
}

impl MemoryEntity {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            values: RwLock::new(IndexMap::new()),
            duplicable: false,
        }
    }

    pub fn with_value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Allow [`Entity::duplicate`] to copy this entity
    pub fn duplicable(mut self) -> Self {
        self.duplicable = true;
        self
    }

    pub fn get(&self, name: &str) -> Value {
        self.read().get(name).cloned().unwrap_or_default()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.write().insert(name.into(), value.into());
    }

    /// Snapshot of all property values
    pub fn values(&self) -> IndexMap<String, Value> {
        self.read().clone()
    }

    fn replace(&self, values: IndexMap<String, Value>) {
        *self.write() = values;
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Value>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Value>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for MemoryEntity {
    fn clone(&self) -> Self {
        Self {
            entity_type: self.entity_type.clone(),
            values: RwLock::new(self.values()),
            duplicable: self.duplicable,
        }
    }
}

impl Entity for MemoryEntity {
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn duplicate(&self) -> Option<EntityHandle> {
        if self.duplicable {
            Some(Arc::new(self.clone()))
        } else {
            None
        }
    }

    fn instantiate(&self) -> EntityHandle {
        Arc::new(MemoryEntity::new(self.entity_type.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn memory_entity(entity: &EntityHandle) -> Result<&MemoryEntity> {
    entity
        .as_any()
        .downcast_ref::<MemoryEntity>()
        .ok_or_else(|| anyhow!("Entity of type '{}' is not a memory entity", entity.entity_type()))
}

#[derive(Debug, Clone)]
struct StoredRow {
    entity_type: String,
    values: IndexMap<String, Value>,
}

#[derive(Debug)]
struct Tracked {
    entity: EntityHandle,
    state: EntityState,
    original: IndexMap<String, Value>,
}

/// In-memory change-tracked graph over its own simulated store
#[derive(Debug)]
pub struct MemoryGraph {
    name: String,
    registry: Arc<AssociationRegistry>,
    key_properties: HashMap<String, Vec<String>>,
    store: HashMap<EntityKey, StoredRow>,
    tracked: IndexMap<EntityKey, Tracked>,
    relationships: Vec<RelationshipEntry>,
    refreshed: Vec<(RefreshMode, EntityHandle)>,
    detect_changes_calls: usize,
}

impl MemoryGraph {
    pub fn new(name: impl Into<String>, registry: Arc<AssociationRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
            key_properties: HashMap::new(),
            store: HashMap::new(),
            tracked: IndexMap::new(),
            relationships: Vec::new(),
            refreshed: Vec::new(),
            detect_changes_calls: 0,
        }
    }

    /// Declare an entity set and its key properties, in key order
    pub fn entity_set(mut self, name: impl Into<String>, key_properties: &[&str]) -> Self {
        self.key_properties
            .insert(name.into(), key_properties.iter().map(|p| p.to_string()).collect());
        self
    }

    fn key_for(&self, entity_set: &str, values: &IndexMap<String, Value>) -> Result<EntityKey> {
        let properties = self
            .key_properties
            .get(entity_set)
            .ok_or_else(|| anyhow!("Unknown entity set '{}' in graph '{}'", entity_set, self.name))?;

        let mut members = Vec::with_capacity(properties.len());
        for property in properties {
            let value = values.get(property).cloned().unwrap_or_default();
            if value.is_null() {
                bail!("Key property '{}' of entity set '{}' is null", property, entity_set);
            }
            members.push((property.clone(), value));
        }
        Ok(EntityKey::new(entity_set, members))
    }

    /// Put a row into the store without tracking it
    pub fn seed(&mut self, entity_set: &str, entity: MemoryEntity) -> Result<EntityKey> {
        let values = entity.values();
        let key = self.key_for(entity_set, &values)?;
        self.store.insert(
            key.clone(),
            StoredRow {
                entity_type: entity.entity_type,
                values,
            },
        );
        Ok(key)
    }

    /// Put a row into the store and track it as unchanged
    pub fn load(&mut self, entity_set: &str, entity: MemoryEntity) -> Result<EntityKey> {
        let key = self.seed(entity_set, entity)?;
        self.get_or_load(&key)?;
        Ok(key)
    }

    /// Track a new entity as added
    pub fn insert(&mut self, entity_set: &str, entity: MemoryEntity) -> Result<EntityKey> {
        let key = self.key_for(entity_set, &entity.values())?;
        if self.tracked.contains_key(&key) {
            bail!("An entity with key {} is already tracked by '{}'", key, self.name);
        }
        self.tracked.insert(
            key.clone(),
            Tracked {
                entity: Arc::new(entity),
                state: EntityState::Added,
                original: IndexMap::new(),
            },
        );
        Ok(key)
    }

    /// Change a property of a tracked entity
    pub fn set_value(&mut self, key: &EntityKey, name: &str, value: impl Into<Value>) -> Result<()> {
        let tracked = self
            .tracked
            .get_mut(key)
            .ok_or_else(|| anyhow!("Entity {} is not tracked by '{}'", key, self.name))?;
        memory_entity(&tracked.entity)?.set(name, value);
        if tracked.state == EntityState::Unchanged {
            tracked.state = EntityState::Modified;
        }
        Ok(())
    }

    /// Mark a tracked entity deleted (an added entity is simply dropped)
    pub fn remove(&mut self, key: &EntityKey) -> Result<()> {
        let tracked = self
            .tracked
            .get_mut(key)
            .ok_or_else(|| anyhow!("Entity {} is not tracked by '{}'", key, self.name))?;
        if tracked.state == EntityState::Added {
            self.tracked.shift_remove(key);
        } else {
            tracked.state = EntityState::Deleted;
        }
        Ok(())
    }

    /// Record a new association row (ends in the association's end order)
    pub fn associate(&mut self, association: &str, first: EntityKey, second: EntityKey) {
        self.record_relationship(association, [first, second], EntityState::Added);
    }

    /// Record a removed association row
    pub fn disassociate(&mut self, association: &str, first: EntityKey, second: EntityKey) {
        self.record_relationship(association, [first, second], EntityState::Deleted);
    }

    fn record_relationship(&mut self, association: &str, ends: [EntityKey; 2], state: EntityState) {
        let opposite = match state {
            EntityState::Added => EntityState::Deleted,
            _ => EntityState::Added,
        };
        // Adding then removing the same row cancels out
        if let Some(pos) = self
            .relationships
            .iter()
            .position(|r| r.association == association && r.ends == ends && r.state == opposite)
        {
            self.relationships.remove(pos);
            return;
        }
        self.relationships.push(RelationshipEntry {
            association: association.to_string(),
            state,
            ends,
        });
    }

    /// Save pending changes into this graph's store
    pub fn accept_changes(&mut self) {
        let mut deleted = Vec::new();
        for (key, tracked) in self.tracked.iter_mut() {
            match tracked.state {
                EntityState::Deleted => {
                    self.store.remove(key);
                    deleted.push(key.clone());
                }
                _ => {
                    let Ok(data) = memory_entity(&tracked.entity) else {
                        continue;
                    };
                    let values = data.values();
                    self.store.insert(
                        key.clone(),
                        StoredRow {
                            entity_type: data.entity_type.clone(),
                            values: values.clone(),
                        },
                    );
                    tracked.original = values;
                    tracked.state = EntityState::Unchanged;
                }
            }
        }
        for key in &deleted {
            self.tracked.shift_remove(key);
        }
        self.relationships.clear();
        log::debug!(
            "Graph '{}' accepted changes ({} deleted, {} tracked)",
            self.name,
            deleted.len(),
            self.tracked.len()
        );
    }

    pub fn registry(&self) -> &Arc<AssociationRegistry> {
        &self.registry
    }

    /// Tracked instance for a key
    pub fn entity(&self, key: &EntityKey) -> Option<EntityHandle> {
        self.tracked.get(key).map(|t| t.entity.clone())
    }

    /// Stored values for a key
    pub fn stored(&self, key: &EntityKey) -> Option<&IndexMap<String, Value>> {
        self.store.get(key).map(|row| &row.values)
    }

    /// Entities passed to refresh so far, with the mode used
    pub fn refreshed(&self) -> &[(RefreshMode, EntityHandle)] {
        &self.refreshed
    }

    pub fn detect_changes_calls(&self) -> usize {
        self.detect_changes_calls
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    fn references_for(&self, entity_set: &str, values: &IndexMap<String, Value>) -> Vec<ReferenceEnd> {
        let mut references = Vec::new();
        for association in self.registry.iter() {
            let Some(constraint) = &association.constraint else {
                continue;
            };
            let (Some(dependent), Some(principal)) = (
                association.end(&constraint.dependent_role),
                association.end(&constraint.principal_role),
            ) else {
                continue;
            };
            if dependent.entity_set != entity_set {
                continue;
            }

            let members: Option<Vec<(String, Value)>> = constraint
                .property_pairs()
                .map(|(principal_property, dependent_property)| {
                    let value = values.get(dependent_property).cloned().unwrap_or_default();
                    (!value.is_null()).then(|| (principal_property.to_string(), value))
                })
                .collect();

            references.push(ReferenceEnd {
                association: association.name.clone(),
                source_role: dependent.role.clone(),
                target_role: principal.role.clone(),
                current_key: members.map(|m| EntityKey::new(principal.entity_set.clone(), m)),
            });
        }
        references
    }

    fn entity_entry(&self, key: &EntityKey, tracked: &Tracked) -> Result<EntityEntry> {
        let current = memory_entity(&tracked.entity)?.values();
        let modified_properties = match tracked.state {
            EntityState::Modified => current
                .iter()
                .filter(|(name, value)| tracked.original.get(name.as_str()) != Some(value))
                .map(|(name, _)| name.clone())
                .collect(),
            _ => Vec::new(),
        };

        Ok(EntityEntry {
            key: key.clone(),
            state: tracked.state,
            entity: tracked.entity.clone(),
            original_values: tracked.original.clone(),
            references: self.references_for(&key.entity_set, &current),
            current_values: current,
            modified_properties,
        })
    }

    fn find_tracked(&self, entity: &EntityHandle) -> Option<EntityKey> {
        self.tracked
            .iter()
            .find(|(_, t)| same_instance(&t.entity, entity))
            .map(|(key, _)| key.clone())
    }
}

#[async_trait]
impl ObjectGraph for MemoryGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_entry(&self, key: &EntityKey) -> Option<StateEntry> {
        self.tracked.get(key).map(|t| StateEntry {
            key: key.clone(),
            state: t.state,
            entity: t.entity.clone(),
        })
    }

    fn pending_changes(&self, filter: StateFilter) -> Vec<ChangeEntry> {
        let entities = self
            .tracked
            .iter()
            .filter(|(_, t)| filter.contains(t.state))
            .filter_map(|(key, t)| self.entity_entry(key, t).ok())
            .map(ChangeEntry::Entity);

        let relationships = self
            .relationships
            .iter()
            .filter(|r| filter.contains(r.state))
            .cloned()
            .map(ChangeEntry::Relationship);

        entities.chain(relationships).collect()
    }

    fn detect_changes(&mut self) {
        self.detect_changes_calls += 1;
        for tracked in self.tracked.values_mut() {
            if !matches!(tracked.state, EntityState::Unchanged | EntityState::Modified) {
                continue;
            }
            let Ok(data) = memory_entity(&tracked.entity) else {
                continue;
            };
            tracked.state = if data.values() == tracked.original {
                EntityState::Unchanged
            } else {
                EntityState::Modified
            };
        }
    }

    fn get_or_load(&mut self, key: &EntityKey) -> Result<Option<StateEntry>> {
        if let Some(entry) = self.state_entry(key) {
            return Ok(Some(entry));
        }
        let Some(row) = self.store.get(key) else {
            return Ok(None);
        };

        let entity = MemoryEntity::new(row.entity_type.clone());
        entity.replace(row.values.clone());
        let entity: EntityHandle = Arc::new(entity);
        self.tracked.insert(
            key.clone(),
            Tracked {
                entity: entity.clone(),
                state: EntityState::Unchanged,
                original: row.values.clone(),
            },
        );
        log::debug!("Graph '{}' loaded {} from store", self.name, key);

        Ok(Some(StateEntry {
            key: key.clone(),
            state: EntityState::Unchanged,
            entity,
        }))
    }

    fn create_entity_key(&self, entity_set: &str, entity: &EntityHandle) -> Result<EntityKey> {
        self.key_for(entity_set, &memory_entity(entity)?.values())
    }

    fn attach(&mut self, key: &EntityKey, entity: EntityHandle) -> Result<()> {
        let values = memory_entity(&entity)?.values();
        if let Some(existing) = self.tracked.get(key) {
            if same_instance(&existing.entity, &entity) {
                return Ok(());
            }
            bail!("Another entity with key {} is already tracked by '{}'", key, self.name);
        }
        if !self.key_properties.contains_key(&key.entity_set) {
            bail!("Unknown entity set '{}' in graph '{}'", key.entity_set, self.name);
        }

        self.tracked.insert(
            key.clone(),
            Tracked {
                entity,
                state: EntityState::Unchanged,
                original: values,
            },
        );
        Ok(())
    }

    fn refresh(&mut self, mode: RefreshMode, entities: &[EntityHandle]) -> Result<()> {
        for entity in entities {
            self.refreshed.push((mode, entity.clone()));

            let Some(key) = self.find_tracked(entity) else {
                log::debug!("Graph '{}' skipped refresh of an untracked {}", self.name, entity.entity_type());
                continue;
            };
            let Some(row) = self.store.get(&key).cloned() else {
                continue;
            };
            let Some(tracked) = self.tracked.get_mut(&key) else {
                continue;
            };
            let data = memory_entity(&tracked.entity)?;

            match mode {
                RefreshMode::StoreWins => {
                    data.replace(row.values.clone());
                    tracked.original = row.values;
                    tracked.state = EntityState::Unchanged;
                }
                RefreshMode::ClientWins => {
                    let changed = data.values() != row.values;
                    tracked.original = row.values;
                    if matches!(tracked.state, EntityState::Unchanged | EntityState::Modified) {
                        tracked.state = if changed {
                            EntityState::Modified
                        } else {
                            EntityState::Unchanged
                        };
                    }
                }
            }
        }
        Ok(())
    }

    async fn refresh_async(&mut self, mode: RefreshMode, entities: Vec<EntityHandle>) -> Result<()> {
        tokio::task::yield_now().await;
        self.refresh(mode, &entities)
    }
}

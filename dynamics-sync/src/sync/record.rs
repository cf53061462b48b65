//! Normalized change records and their deltas

use crate::graph::{EntityHandle, same_instance};
use crate::metadata::Multiplicity;
use crate::model::{EntityKey, EntityState, Value};
use indexmap::IndexMap;

/// A target-side entity referenced from a delta
#[derive(Debug, Clone)]
pub struct RelatedEntity {
    pub key: EntityKey,
    pub entity: EntityHandle,
}

impl RelatedEntity {
    pub fn is(&self, entity: &EntityHandle) -> bool {
        same_instance(&self.entity, entity)
    }
}

impl PartialEq for RelatedEntity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && same_instance(&self.entity, &other.entity)
    }
}

/// Which side of a delta a value lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSlot {
    /// Before the change (removals)
    Original,
    /// After the change (additions)
    Current,
}

/// Scalar property change
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDelta {
    pub name: String,
    pub original: Value,
    pub current: Value,
}

/// To-one navigation change
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDelta {
    pub name: String,
    pub original: Option<RelatedEntity>,
    pub current: Option<RelatedEntity>,
}

impl ReferenceDelta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            original: None,
            current: None,
        }
    }

    fn set(&mut self, slot: ValueSlot, value: Option<RelatedEntity>) {
        match slot {
            ValueSlot::Original => self.original = value,
            ValueSlot::Current => self.current = value,
        }
    }
}

/// To-many navigation change: members removed (`original`) and added (`current`)
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDelta {
    pub name: String,
    pub original: Vec<RelatedEntity>,
    pub current: Vec<RelatedEntity>,
}

impl CollectionDelta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            original: Vec::new(),
            current: Vec::new(),
        }
    }

    fn push(&mut self, slot: ValueSlot, value: RelatedEntity) {
        match slot {
            ValueSlot::Original => self.original.push(value),
            ValueSlot::Current => self.current.push(value),
        }
    }

    pub fn added_contains(&self, entity: &EntityHandle) -> bool {
        self.current.iter().any(|r| r.is(entity))
    }

    pub fn removed_contains(&self, entity: &EntityHandle) -> bool {
        self.original.iter().any(|r| r.is(entity))
    }
}

/// The normalized change record for one entity
#[derive(Debug, Clone)]
pub struct SyncRecord {
    pub source_state: EntityState,
    /// Refreshed by sync and flush
    pub target_state: EntityState,
    pub target_entity: EntityHandle,
    pub target_key: EntityKey,
    pub properties: IndexMap<String, PropertyDelta>,
    pub references: IndexMap<String, ReferenceDelta>,
    pub collections: IndexMap<String, CollectionDelta>,
}

impl SyncRecord {
    pub fn new(
        target_entity: EntityHandle,
        target_key: EntityKey,
        source_state: EntityState,
        target_state: EntityState,
    ) -> Self {
        Self {
            source_state,
            target_state,
            target_entity,
            target_key,
            properties: IndexMap::new(),
            references: IndexMap::new(),
            collections: IndexMap::new(),
        }
    }

    /// This record's entity, as seen from another record's delta
    pub fn as_related(&self) -> RelatedEntity {
        RelatedEntity {
            key: self.target_key.clone(),
            entity: self.target_entity.clone(),
        }
    }

    pub fn set_property(&mut self, name: impl Into<String>, original: Value, current: Value) {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            PropertyDelta {
                name,
                original,
                current,
            },
        );
    }

    pub fn set_reference(
        &mut self,
        name: impl Into<String>,
        original: Option<RelatedEntity>,
        current: Option<RelatedEntity>,
    ) {
        let name = name.into();
        self.references.insert(
            name.clone(),
            ReferenceDelta {
                name,
                original,
                current,
            },
        );
    }

    /// Record `related` on this record's `navigation`.
    ///
    /// A many-valued navigation appends to the collection delta's `slot`
    /// list; a single-valued one sets the reference delta's `slot` value.
    pub fn apply(&mut self, navigation: &str, multiplicity: Multiplicity, slot: ValueSlot, related: RelatedEntity) {
        if multiplicity.is_many() {
            self.collections
                .entry(navigation.to_string())
                .or_insert_with(|| CollectionDelta::new(navigation))
                .push(slot, related);
        } else {
            self.references
                .entry(navigation.to_string())
                .or_insert_with(|| ReferenceDelta::new(navigation))
                .set(slot, Some(related));
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDelta> {
        self.properties.get(name)
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceDelta> {
        self.references.get(name)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionDelta> {
        self.collections.get(name)
    }

    pub fn has_changes(&self) -> bool {
        !self.properties.is_empty() || !self.references.is_empty() || !self.collections.is_empty()
    }

    /// Whether a refresh may reload this record.
    ///
    /// Records the target does not track can only be refreshed when they
    /// were added in the source.
    pub fn can_refresh(&self) -> bool {
        match self.target_state {
            EntityState::Detached => self.source_state == EntityState::Added,
            _ => true,
        }
    }
}

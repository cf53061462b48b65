//! Change-tracked object graph interface and its tracker entries

use super::EntityHandle;
use crate::model::{EntityKey, EntityState, StateFilter, Value};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How a refresh treats pending values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Stored values overwrite pending ones
    #[default]
    StoreWins,
    /// Pending values are kept; only the originals are reloaded
    ClientWins,
}

/// Tracking state of one entity in one graph
#[derive(Debug, Clone)]
pub struct StateEntry {
    pub key: EntityKey,
    pub state: EntityState,
    pub entity: EntityHandle,
}

/// A to-one navigation as seen from a tracked entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEnd {
    pub association: String,
    /// Role played by the entity owning this entry
    pub source_role: String,
    /// Role of the referenced entity
    pub target_role: String,
    /// Key of the currently referenced entity, if any
    pub current_key: Option<EntityKey>,
}

/// A pending change to one entity
#[derive(Debug, Clone)]
pub struct EntityEntry {
    pub key: EntityKey,
    pub state: EntityState,
    pub entity: EntityHandle,
    pub original_values: IndexMap<String, Value>,
    pub current_values: IndexMap<String, Value>,
    pub modified_properties: Vec<String>,
    pub references: Vec<ReferenceEnd>,
}

impl EntityEntry {
    /// Original value of a property (null when unknown)
    pub fn original_value(&self, name: &str) -> Value {
        self.original_values.get(name).cloned().unwrap_or_default()
    }

    /// Current value of a property (null when unknown)
    pub fn current_value(&self, name: &str) -> Value {
        self.current_values.get(name).cloned().unwrap_or_default()
    }
}

/// A pending association row change between two entities
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipEntry {
    pub association: String,
    pub state: EntityState,
    /// Endpoint keys, in the association's end order
    pub ends: [EntityKey; 2],
}

/// One pending change entry
#[derive(Debug, Clone)]
pub enum ChangeEntry {
    Entity(EntityEntry),
    Relationship(RelationshipEntry),
}

impl ChangeEntry {
    pub fn state(&self) -> EntityState {
        match self {
            ChangeEntry::Entity(e) => e.state,
            ChangeEntry::Relationship(r) => r.state,
        }
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self, ChangeEntry::Relationship(_))
    }
}

impl From<EntityEntry> for ChangeEntry {
    fn from(entry: EntityEntry) -> Self {
        ChangeEntry::Entity(entry)
    }
}

impl From<RelationshipEntry> for ChangeEntry {
    fn from(entry: RelationshipEntry) -> Self {
        ChangeEntry::Relationship(entry)
    }
}

/// A change-tracked object graph (one unit of work over one store connection).
///
/// The source graph only needs the read side (`state_entry`,
/// `pending_changes`, `detect_changes`); the target graph is also loaded
/// from, attached to and refreshed.
#[async_trait]
pub trait ObjectGraph: Send {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Tracking state for a key, if the graph tracks it
    fn state_entry(&self, key: &EntityKey) -> Option<StateEntry>;

    /// Pending entity and relationship entries whose state is in `filter`
    fn pending_changes(&self, filter: StateFilter) -> Vec<ChangeEntry>;

    /// Recompute entity states from current values
    fn detect_changes(&mut self);

    /// Find a tracked entity, loading it from the store if needed
    fn get_or_load(&mut self, key: &EntityKey) -> anyhow::Result<Option<StateEntry>>;

    /// Compute the key an entity would have in `entity_set`
    fn create_entity_key(&self, entity_set: &str, entity: &EntityHandle) -> anyhow::Result<EntityKey>;

    /// Start tracking a detached entity as unchanged under `key`
    /// (whose entity set names where it is attached)
    fn attach(&mut self, key: &EntityKey, entity: EntityHandle) -> anyhow::Result<()>;

    /// Reload entities from the store
    fn refresh(&mut self, mode: RefreshMode, entities: &[EntityHandle]) -> anyhow::Result<()>;

    /// Reload entities from the store asynchronously. Dropping the future
    /// cancels the reload as far as the graph supports it.
    async fn refresh_async(&mut self, mode: RefreshMode, entities: Vec<EntityHandle>) -> anyhow::Result<()>;
}

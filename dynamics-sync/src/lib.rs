//! Graph diff and merge between two change-tracked entity graphs
//!
//! Reads the pending changes of a source graph (added, deleted and modified
//! entities plus association rows) and turns them into a [`ChangeSet`] of
//! per-entity records aligned to a target graph: property deltas, reference
//! deltas and collection deltas, with foreign-key changes propagated onto
//! the inverse navigations of related entities. The change-set can then
//! attach new entities to the target, refresh it from its store and re-read
//! states after a save.

pub mod config;
pub mod error;
pub mod graph;
pub mod guard;
pub mod metadata;
pub mod model;
pub mod sync;

#[cfg(test)]
mod fixtures;

pub use config::{ProcessingOrder, SyncConfig, SyncConfigBuilder};
pub use error::{MissingReason, SyncError};
pub use graph::{ChangeEntry, Entity, EntityHandle, MemoryEntity, MemoryGraph, ObjectGraph, RefreshMode};
pub use guard::SharedGraph;
pub use metadata::{Association, AssociationEnd, AssociationRegistry, Multiplicity, ReferentialConstraint};
pub use model::{EntityKey, EntityState, StateFilter, Value};
pub use sync::{
    ChangeSet, CollectionDelta, IdentityCache, PropertyDelta, ReferenceDelta, Resolution, SyncBuilder, SyncFactory,
    SyncRecord, SyncReport,
};

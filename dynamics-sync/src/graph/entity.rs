//! Entity instances owned by a graph

use std::any::Any;
use std::sync::Arc;

/// Shared handle to an entity instance. Identity is pointer identity.
pub type EntityHandle = Arc<dyn Entity>;

/// An entity instance living in one graph.
///
/// The sync engine never reads entity properties directly; tracker entries
/// carry the values. It only needs to know the concrete type and how to
/// produce a target-side counterpart.
pub trait Entity: Any + Send + Sync + std::fmt::Debug {
    /// Name of the concrete entity type
    fn entity_type(&self) -> &str;

    /// Copy of this instance, if the type supports duplication
    fn duplicate(&self) -> Option<EntityHandle> {
        None
    }

    /// Bare default instance of the same concrete type
    fn instantiate(&self) -> EntityHandle;

    fn as_any(&self) -> &dyn Any;
}

/// Whether two handles point at the same instance
pub fn same_instance(a: &EntityHandle, b: &EntityHandle) -> bool {
    Arc::ptr_eq(a, b)
}

//! Serialized access to a shared target graph
//!
//! A target graph is not safe to mutate from two sync cycles at once.
//! [`SharedGraph`] owns the graph behind an async mutex; every cycle holds
//! the owned guard for its whole duration and releases it on drop.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::graph::ObjectGraph;
use crate::metadata::AssociationRegistry;
use crate::model::StateFilter;
use crate::sync::{ChangeSet, SyncFactory};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Target graph shared between tasks, one sync cycle at a time
#[derive(Debug)]
pub struct SharedGraph<G> {
    inner: Arc<Mutex<G>>,
    config: SyncConfig,
}

impl<G> Clone for SharedGraph<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

impl<G: ObjectGraph + 'static> SharedGraph<G> {
    pub fn new(graph: G) -> Self {
        Self::with_config(graph, SyncConfig::default())
    }

    pub fn with_config(graph: G, config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Wait for exclusive access. The guard releases when dropped.
    pub async fn lock(&self) -> OwnedMutexGuard<G> {
        if self.is_locked() {
            log::debug!("Shared graph busy, waiting for guard");
        }
        self.inner.clone().lock_owned().await
    }

    /// Take exclusive access without waiting
    pub fn try_lock(&self) -> Option<OwnedMutexGuard<G>> {
        self.inner.clone().try_lock_owned().ok()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Build a change-set from `source` and attach its detached records,
    /// all under one guard
    pub async fn synchronize<S>(&self, source: &mut S, registry: &AssociationRegistry) -> Result<ChangeSet, SyncError>
    where
        S: ObjectGraph + ?Sized,
    {
        let mut guard = self.lock().await;
        let target = &mut *guard;

        let mut change_set = SyncFactory::new(self.config.clone()).create(source, target, registry)?;
        let attached = change_set.sync(target).map_err(SyncError::Graph)?;
        log::info!(
            "Synchronized {} records into '{}' ({} attached)",
            change_set.len(),
            target.name(),
            attached
        );
        Ok(change_set)
    }

    /// Reload the filtered records with the configured refresh mode
    pub async fn refresh(&self, change_set: &ChangeSet, filter: StateFilter) -> Result<usize> {
        let mut guard = self.lock().await;
        change_set
            .refresh_async_with(&mut *guard, self.config.refresh_mode, filter)
            .await
    }

    /// Re-read target states after a save
    pub async fn flush(&self, change_set: &mut ChangeSet) {
        let mut guard = self.lock().await;
        change_set.flush(&mut *guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::graph::{RefreshMode, same_instance};
    use crate::model::EntityState;

    #[tokio::test]
    async fn test_synchronize_attaches_added_entities() {
        init_logging();
        let (mut source, target) = make_seeded_pair(vec![("Employees", make_employee(2, "Boss", None))]);
        let hire = source.insert("Employees", make_employee(8, "Hire", Some(2))).unwrap();
        let registry = source.registry().clone();
        let shared = SharedGraph::new(target);

        let change_set = shared.synchronize(&mut source, &registry).await.unwrap();

        let record = change_set.find(&hire).unwrap();
        assert_eq!(record.target_state, EntityState::Unchanged);
        let guard = shared.lock().await;
        assert!(same_instance(&record.target_entity, &guard.entity(&hire).unwrap()));
        assert_eq!(source.detect_changes_calls(), 1);
    }

    #[tokio::test]
    async fn test_synchronize_reports_not_found() {
        let (mut source, target) = make_seeded_pair(vec![]);
        source.load("Employees", make_employee(1, "Ada", None)).unwrap();
        source.set_value(&make_key("Employees", 1), "Name", "Ada L.").unwrap();
        let registry = source.registry().clone();
        let shared = SharedGraph::new(target);

        let err = shared.synchronize(&mut source, &registry).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!shared.is_locked());
    }

    #[tokio::test]
    async fn test_guard_serializes_access() {
        let (_, target) = make_seeded_pair(vec![]);
        let shared = SharedGraph::new(target);
        let other = shared.clone();

        let guard = shared.lock().await;
        assert!(other.is_locked());
        assert!(other.try_lock().is_none());

        drop(guard);
        assert!(!other.is_locked());
        assert!(other.try_lock().is_some());
    }

    #[tokio::test]
    async fn test_waiting_task_resumes_after_release() {
        let (_, target) = make_seeded_pair(vec![]);
        let shared = SharedGraph::new(target);
        let guard = shared.lock().await;

        let waiter = {
            let shared = shared.clone();
            tokio::spawn(async move { shared.lock().await.tracked_len() })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert_eq!(waiter.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_and_flush_use_configured_mode() {
        let (mut source, target) = make_seeded_pair(vec![("Employees", make_employee(1, "Ada", None))]);
        let key = make_key("Employees", 1);
        source.set_value(&key, "Name", "Ada L.").unwrap();
        let registry = source.registry().clone();
        let shared = SharedGraph::with_config(target, SyncConfig::keep_pending());

        let mut change_set = shared.synchronize(&mut source, &registry).await.unwrap();
        let count = shared.refresh(&change_set, StateFilter::ALL).await.unwrap();
        assert_eq!(count, 1);

        shared.lock().await.remove(&key).unwrap();
        shared.flush(&mut change_set).await;

        let guard = shared.lock().await;
        assert_eq!(guard.refreshed()[0].0, RefreshMode::ClientWins);
        assert_eq!(change_set.find(&key).unwrap().target_state, EntityState::Deleted);
    }
}

//! One-call change-set creation from a source graph's pending changes

use super::{ChangeSet, SyncBuilder};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::graph::ObjectGraph;
use crate::metadata::AssociationRegistry;

/// Extracts pending entries from a source graph and builds the change-set
/// against a target graph
#[derive(Debug, Clone, Default)]
pub struct SyncFactory {
    config: SyncConfig,
}

impl SyncFactory {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn create<S, T>(
        &self,
        source: &mut S,
        target: &mut T,
        registry: &AssociationRegistry,
    ) -> Result<ChangeSet, SyncError>
    where
        S: ObjectGraph + ?Sized,
        T: ObjectGraph + ?Sized,
    {
        if self.config.detect_changes {
            source.detect_changes();
        }
        let entries = source.pending_changes(self.config.pending_states);
        log::info!(
            "Syncing {} pending entries from '{}' into '{}'",
            entries.len(),
            source.name(),
            target.name()
        );

        let source: &S = source;
        let mut builder = SyncBuilder::new(source, target, registry).order(self.config.order);
        builder.extend(entries);
        builder.build()
    }
}

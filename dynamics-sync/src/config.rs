//! Sync configuration with builder pattern
//!
//! Controls the walk order, the refresh policy and which pending states
//! are extracted from the source graph. Loadable from TOML.

use crate::graph::RefreshMode;
use crate::model::{EntityState, StateFilter};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Order in which the builder walks entity and relationship entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingOrder {
    /// Entity entries first, so relationships see freshly added entities
    #[default]
    EntitiesFirst,
    RelationshipsFirst,
}

/// Configuration for one sync pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub order: ProcessingOrder,
    /// Policy used by refreshes that do not name one
    pub refresh_mode: RefreshMode,
    /// States extracted from the source tracker
    pub pending_states: StateFilter,
    /// Run source change detection before extracting entries
    pub detect_changes: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            order: ProcessingOrder::EntitiesFirst,
            refresh_mode: RefreshMode::StoreWins,
            pending_states: StateFilter::PENDING,
            detect_changes: true,
        }
    }
}

impl SyncConfig {
    /// Create a new builder for SyncConfig
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }

    /// Walk relationship entries before entity entries
    pub fn relationships_first() -> Self {
        Self {
            order: ProcessingOrder::RelationshipsFirst,
            ..Self::default()
        }
    }

    /// Keep pending values on refresh and trust the caller's change detection
    pub fn keep_pending() -> Self {
        Self {
            refresh_mode: RefreshMode::ClientWins,
            detect_changes: false,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse sync config")
    }

    /// Load config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync config {}", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded sync config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize sync config")
    }
}

/// Builder for SyncConfig
#[derive(Debug)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    /// Set the walk order
    pub fn order(mut self, order: ProcessingOrder) -> Self {
        self.config.order = order;
        self
    }

    /// Set the default refresh policy
    pub fn refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.config.refresh_mode = mode;
        self
    }

    /// Set the states extracted from the source
    pub fn pending_states(mut self, states: StateFilter) -> Self {
        self.config.pending_states = states;
        self
    }

    /// Also extract one more state from the source
    pub fn include_state(mut self, state: EntityState) -> Self {
        self.config.pending_states = self.config.pending_states | state;
        self
    }

    /// Enable/disable source change detection
    pub fn detect_changes(mut self, enabled: bool) -> Self {
        self.config.detect_changes = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SyncConfig {
        self.config
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();

        assert_eq!(config.order, ProcessingOrder::EntitiesFirst);
        assert_eq!(config.refresh_mode, RefreshMode::StoreWins);
        assert_eq!(config.pending_states, StateFilter::PENDING);
        assert!(config.detect_changes);
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            SyncConfig::relationships_first().order,
            ProcessingOrder::RelationshipsFirst
        );

        let config = SyncConfig::keep_pending();
        assert_eq!(config.refresh_mode, RefreshMode::ClientWins);
        assert!(!config.detect_changes);
        assert_eq!(config.order, ProcessingOrder::EntitiesFirst);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SyncConfig::builder()
            .order(ProcessingOrder::RelationshipsFirst)
            .refresh_mode(RefreshMode::ClientWins)
            .pending_states(EntityState::Added.into())
            .include_state(EntityState::Deleted)
            .detect_changes(false)
            .build();

        assert_eq!(config.order, ProcessingOrder::RelationshipsFirst);
        assert_eq!(config.refresh_mode, RefreshMode::ClientWins);
        assert!(config.pending_states.contains(EntityState::Deleted));
        assert!(!config.pending_states.contains(EntityState::Modified));
        assert!(!config.detect_changes);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SyncConfig::from_toml_str(
            r#"
order = "relationships_first"
pending_states = ["added", "modified"]
"#,
        )
        .unwrap();

        assert_eq!(config.order, ProcessingOrder::RelationshipsFirst);
        assert_eq!(config.refresh_mode, RefreshMode::StoreWins);
        assert_eq!(
            config.pending_states,
            EntityState::Added | EntityState::Modified
        );
        assert!(config.detect_changes);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let written = SyncConfig::keep_pending().to_toml_string().unwrap();
        file.write_all(written.as_bytes()).unwrap();

        assert_eq!(SyncConfig::load(file.path()).unwrap(), SyncConfig::keep_pending());
        assert!(SyncConfig::load(file.path().with_extension("missing")).is_err());
    }

    #[test]
    fn test_invalid_toml_reports_context() {
        let err = SyncConfig::from_toml_str("order = 5").unwrap_err();
        assert!(err.to_string().contains("Failed to parse sync config"));
    }
}

//! Association registry, built once and shared read-only by every sync pass

use super::Association;
use crate::error::SyncError;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All associations known to the model, keyed by association name
#[derive(Debug, Clone, Default)]
pub struct AssociationRegistry {
    associations: IndexMap<String, Association>,
}

/// On-disk form of the registry
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    associations: Vec<Association>,
}

impl AssociationRegistry {
    /// Build a registry, validating every descriptor
    pub fn new(associations: impl IntoIterator<Item = Association>) -> Result<Self, SyncError> {
        let mut map = IndexMap::new();
        for association in associations {
            association
                .validate()
                .map_err(|reason| SyncError::InvalidAssociation {
                    name: association.name.clone(),
                    reason,
                })?;
            if map.contains_key(&association.name) {
                return Err(SyncError::InvalidAssociation {
                    name: association.name.clone(),
                    reason: "declared more than once".to_string(),
                });
            }
            map.insert(association.name.clone(), association);
        }
        log::debug!("Association registry built with {} associations", map.len());
        Ok(Self { associations: map })
    }

    /// Parse a registry from TOML (`[[associations]]` tables)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(content).context("Failed to parse association registry")?;
        Ok(Self::new(file.associations)?)
    }

    /// Load a registry from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read association registry {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Serialize the registry back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        let file = RegistryFile {
            associations: self.associations.values().cloned().collect(),
        };
        toml::to_string(&file).context("Failed to serialize association registry")
    }

    pub fn get(&self, name: &str) -> Option<&Association> {
        self.associations.get(name)
    }

    /// Like [`get`](Self::get), but an unknown name is an error
    pub fn require(&self, name: &str) -> Result<&Association, SyncError> {
        self.get(name).ok_or_else(|| SyncError::UnknownAssociation {
            name: name.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Association> {
        self.associations.values()
    }

    pub fn len(&self) -> usize {
        self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }
}

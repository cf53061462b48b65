//! Serializable report of a change-set

use super::{ChangeSet, SyncRecord};
use crate::model::{EntityKey, EntityState, StateFilter, Value};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Report of one change-set, suitable for logging or persisting as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// When the report was generated
    pub generated_at: String,
    pub summary: SyncSummary,
    pub records: Vec<RecordReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
    pub unchanged: usize,
    /// Records the target graph does not track
    pub detached: usize,
    pub property_changes: usize,
    pub reference_changes: usize,
    pub collection_changes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReport {
    pub key: EntityKey,
    pub entity_type: String,
    pub source_state: EntityState,
    pub target_state: EntityState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<CollectionReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyReport {
    pub name: String,
    pub original: Value,
    pub current: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceReport {
    pub name: String,
    pub original: Option<EntityKey>,
    pub current: Option<EntityKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    pub name: String,
    pub removed: Vec<EntityKey>,
    pub added: Vec<EntityKey>,
}

impl RecordReport {
    fn from_record(record: &SyncRecord) -> Self {
        Self {
            key: record.target_key.clone(),
            entity_type: record.target_entity.entity_type().to_string(),
            source_state: record.source_state,
            target_state: record.target_state,
            properties: record
                .properties
                .values()
                .map(|p| PropertyReport {
                    name: p.name.clone(),
                    original: p.original.clone(),
                    current: p.current.clone(),
                })
                .collect(),
            references: record
                .references
                .values()
                .map(|r| ReferenceReport {
                    name: r.name.clone(),
                    original: r.original.as_ref().map(|e| e.key.clone()),
                    current: r.current.as_ref().map(|e| e.key.clone()),
                })
                .collect(),
            collections: record
                .collections
                .values()
                .map(|c| CollectionReport {
                    name: c.name.clone(),
                    removed: c.original.iter().map(|e| e.key.clone()).collect(),
                    added: c.current.iter().map(|e| e.key.clone()).collect(),
                })
                .collect(),
        }
    }
}

impl SyncReport {
    /// Build a report from a change-set
    pub fn from_change_set(change_set: &ChangeSet) -> Self {
        let mut summary = SyncSummary {
            added: change_set.count(EntityState::Added.into()),
            deleted: change_set.count(EntityState::Deleted.into()),
            modified: change_set.count(EntityState::Modified.into()),
            unchanged: change_set.count(EntityState::Unchanged.into()),
            ..SyncSummary::default()
        };

        let mut records = Vec::with_capacity(change_set.len());
        for record in change_set.entries(StateFilter::ALL) {
            if record.target_state == EntityState::Detached {
                summary.detached += 1;
            }
            summary.property_changes += record.properties.len();
            summary.reference_changes += record.references.len();
            summary.collection_changes += record.collections.len();
            records.push(RecordReport::from_record(record));
        }

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary,
            records,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize sync report")
    }
}

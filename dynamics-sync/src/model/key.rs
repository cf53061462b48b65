//! Entity keys identifying one entity across both graphs

use super::Value;
use serde::{Deserialize, Serialize};

/// One named member of an entity key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyMember {
    pub name: String,
    pub value: Value,
}

/// Identifies an entity: entity-set name plus ordered key-property values.
///
/// Two keys are equal iff the entity-set names match and every member
/// matches in order. Graphs must therefore build members in the key-property
/// order declared for the entity set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub entity_set: String,
    pub members: Vec<KeyMember>,
}

impl EntityKey {
    pub fn new<N, V>(entity_set: impl Into<String>, members: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        Self {
            entity_set: entity_set.into(),
            members: members
                .into_iter()
                .map(|(name, value)| KeyMember {
                    name: name.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    /// Key with a single member, the common case
    pub fn single(entity_set: impl Into<String>, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(entity_set, [(name.into(), value.into())])
    }

    /// Look up a key member value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members.iter().find(|m| m.name == name).map(|m| &m.value)
    }

    /// Whether any member is null (such a key never identifies a stored entity)
    pub fn has_null_member(&self) -> bool {
        self.members.iter().any(|m| m.value.is_null())
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.entity_set)?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", member.name, member.value)?;
        }
        write!(f, ")")
    }
}

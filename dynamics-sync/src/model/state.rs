//! Entity tracking states and state filters

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// Tracking state of an entity (or relationship row) inside one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    #[default]
    Detached,
    Unchanged,
    Added,
    Deleted,
    Modified,
}

impl EntityState {
    const fn bit(self) -> u8 {
        match self {
            EntityState::Detached => 1,
            EntityState::Unchanged => 1 << 1,
            EntityState::Added => 1 << 2,
            EntityState::Deleted => 1 << 3,
            EntityState::Modified => 1 << 4,
        }
    }

    /// All states, in bucket order
    pub const ALL: [EntityState; 5] = [
        EntityState::Added,
        EntityState::Deleted,
        EntityState::Modified,
        EntityState::Unchanged,
        EntityState::Detached,
    ];
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityState::Detached => write!(f, "Detached"),
            EntityState::Unchanged => write!(f, "Unchanged"),
            EntityState::Added => write!(f, "Added"),
            EntityState::Deleted => write!(f, "Deleted"),
            EntityState::Modified => write!(f, "Modified"),
        }
    }
}

/// A combinable set of entity states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<EntityState>", into = "Vec<EntityState>")]
pub struct StateFilter(u8);

impl StateFilter {
    /// Matches nothing
    pub const NONE: StateFilter = StateFilter(0);

    /// Added | Deleted | Modified
    pub const PENDING: StateFilter = StateFilter(
        EntityState::Added.bit() | EntityState::Deleted.bit() | EntityState::Modified.bit(),
    );

    /// Added | Deleted | Modified | Unchanged
    pub const ALL: StateFilter = StateFilter(Self::PENDING.0 | EntityState::Unchanged.bit());

    pub fn contains(self, state: EntityState) -> bool {
        self.0 & state.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// States in this filter, in bucket order
    pub fn states(self) -> impl Iterator<Item = EntityState> {
        EntityState::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl Default for StateFilter {
    fn default() -> Self {
        StateFilter::ALL
    }
}

impl From<EntityState> for StateFilter {
    fn from(state: EntityState) -> Self {
        StateFilter(state.bit())
    }
}

impl From<Vec<EntityState>> for StateFilter {
    fn from(states: Vec<EntityState>) -> Self {
        states.into_iter().fold(StateFilter::NONE, |acc, s| acc | s)
    }
}

impl From<StateFilter> for Vec<EntityState> {
    fn from(filter: StateFilter) -> Self {
        filter.states().collect()
    }
}

impl BitOr for StateFilter {
    type Output = StateFilter;

    fn bitor(self, rhs: StateFilter) -> StateFilter {
        StateFilter(self.0 | rhs.0)
    }
}

impl BitOr<EntityState> for StateFilter {
    type Output = StateFilter;

    fn bitor(self, rhs: EntityState) -> StateFilter {
        StateFilter(self.0 | rhs.bit())
    }
}

impl BitOr for EntityState {
    type Output = StateFilter;

    fn bitor(self, rhs: EntityState) -> StateFilter {
        StateFilter(self.bit() | rhs.bit())
    }
}

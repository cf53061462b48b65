//! Change-tracked object graphs consumed by the sync engine

pub mod entity;
pub mod memory;
pub mod tracker;

pub use entity::*;
pub use memory::{MemoryEntity, MemoryGraph};
pub use tracker::*;

//! Change-set construction and application
//!
//! [`SyncBuilder`] walks a source graph's pending entries, resolving each
//! entity against the target graph through the [`IdentityCache`], and
//! produces a [`ChangeSet`] of [`SyncRecord`]s.

pub mod builder;
pub mod cache;
pub mod change_set;
pub mod factory;
pub mod record;
pub mod report;

pub use builder::*;
pub use cache::*;
pub use change_set::*;
pub use factory::*;
pub use record::*;
pub use report::*;

//! Association metadata describing how entity sets relate

pub mod association;
pub mod registry;

pub use association::*;
pub use registry::*;

//! Core data model shared by the graphs and the sync engine

pub mod key;
pub mod state;
pub mod value;

pub use key::*;
pub use state::*;
pub use value::*;

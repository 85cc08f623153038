//! Workspace root crate.
//!
//! This crate re-exports the main building blocks so integration tests can depend on a single crate.

pub use beams::*;
pub use controller::*;
pub use records::*;
pub use sim::*;

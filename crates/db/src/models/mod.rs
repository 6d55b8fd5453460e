//! Row structs for the timeline tables.
//!
//! Each submodule contains a `FromRow` struct matching the database row and
//! its conversion into the core domain type.

pub mod placement;
pub mod scene;

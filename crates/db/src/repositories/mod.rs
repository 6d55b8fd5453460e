//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument and return raw rows.

pub mod placement_repo;
pub mod scene_repo;

pub use placement_repo::PlacementRepo;
pub use scene_repo::SceneRepo;

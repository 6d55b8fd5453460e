pub mod placement;
pub mod scene;
pub mod timeline;

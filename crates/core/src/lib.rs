//! Timeline placement resolution engine.
//!
//! Resolves where in episode time, and on which layer, every overlay
//! placement renders. The resolver, layering and validation modules are pure;
//! [`service::TimelineService`] wires them to the storage traits in
//! [`store`].

pub mod error;
pub mod hashing;
pub mod layering;
pub mod memory;
pub mod orphan;
pub mod placement;
pub mod resolver;
pub mod scene;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;
pub mod wardrobe;

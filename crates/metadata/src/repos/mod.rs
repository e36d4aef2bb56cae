//! Repository traits for entity operations.

pub mod artifacts;
pub mod builds;

pub use artifacts::ArtifactRepo;
pub use builds::BuildRepo;

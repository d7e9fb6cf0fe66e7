//! Shared types for modlayer.
//!
//! These are plain data: the persisted catalog, the mods it tracks and their
//! releases. Filesystem and network behaviour lives in `modlayer-core`.

pub mod repo;
pub mod types;

pub use repo::{RepoKey, RepoKeyError};
pub use types::{Catalog, ModId, ModRecord, Release};

/// File extension of an installable plugin artifact.
pub const ARTIFACT_EXTENSION: &str = "dll";

/// File extension of a compressed container holding one artifact.
pub const CONTAINER_EXTENSION: &str = "zip";

//! Canopy Core - Artifact and dependency model
//!
//! This crate defines the vocabulary the collection engine works in:
//! artifacts, dependencies, versions, repositories, configuration, and the
//! shared error type. Everything here is an immutable value type; the graph
//! machinery lives in `canopy-graph`.

pub mod artifact;
pub mod config;
pub mod dependency;
pub mod error;
pub mod repository;
pub mod version;

pub use artifact::{properties, Artifact};
pub use config::{ConfigMap, ConfigValue};
pub use dependency::{Dependency, Exclusion};
pub use error::RepositoryError;
pub use repository::{ArtifactRepository, LocalRepository, RemoteRepository};
pub use version::{Version, VersionConstraint, VersionRange};

//! Collect requests, results, and the terminal error.

use crate::node::NodeRef;
use canopy_core::{Artifact, Dependency, RemoteRepository, RepositoryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What to collect.
///
/// Either `root` (a dependency whose descriptor seeds the walk) or
/// `root_artifact` plus an explicit `dependencies` list. `managed_dependencies`
/// seed dependency management before any descriptor is read.
#[derive(Debug, Clone, Default)]
pub struct CollectRequest {
    pub root: Option<Dependency>,
    /// Stand-in identity for the root node when `root` is absent.
    pub root_artifact: Option<Artifact>,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
    /// Opaque label carried onto every node and sub-request.
    pub request_context: String,
    /// Opaque correlation token for the external collaborators.
    pub trace: Option<String>,
}

impl CollectRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request rooted at one dependency.
    pub fn for_root(root: Dependency, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            root: Some(root),
            repositories,
            ..Self::default()
        }
    }

    /// A rootless request seeded with direct dependencies.
    pub fn for_dependencies(
        dependencies: Vec<Dependency>,
        repositories: Vec<RemoteRepository>,
    ) -> Self {
        Self {
            dependencies,
            repositories,
            ..Self::default()
        }
    }
}

/// A dependency cycle found during collection.
///
/// `path` runs from the ancestor that opened the cycle down to the node whose
/// dependency closed it; `closing` is that dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyCycle {
    path: Vec<Artifact>,
    closing: Dependency,
}

impl DependencyCycle {
    pub(crate) fn new(path: Vec<Artifact>, closing: Dependency) -> Self {
        Self { path, closing }
    }

    /// The artifacts from the cycle entry down to the current node.
    pub fn path(&self) -> &[Artifact] {
        &self.path
    }

    /// The dependency that closed the cycle.
    pub fn closing_dependency(&self) -> &Dependency {
        &self.closing
    }
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for artifact in &self.path {
            write!(f, "{} -> ", artifact)?;
        }
        write!(f, "{}", self.closing.artifact())
    }
}

/// The outcome of a collection run.
///
/// Present even on failure: the terminal [`CollectionError`] wraps the
/// partial result so callers can inspect what was collected before the
/// failure.
#[derive(Debug, Default)]
pub struct CollectResult {
    root: Option<NodeRef>,
    exceptions: Vec<RepositoryError>,
    cycles: Vec<DependencyCycle>,
}

impl CollectResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&NodeRef> {
        self.root.as_ref()
    }

    pub fn set_root(&mut self, root: NodeRef) {
        self.root = Some(root);
    }

    /// The errors recorded during the walk, bounded by the session's
    /// exception quota.
    pub fn exceptions(&self) -> &[RepositoryError] {
        &self.exceptions
    }

    pub(crate) fn add_exception(&mut self, exception: RepositoryError) {
        self.exceptions.push(exception);
    }

    /// The cycles recorded during the walk, bounded by the session's cycle
    /// quota.
    pub fn cycles(&self) -> &[DependencyCycle] {
        &self.cycles
    }

    pub(crate) fn add_cycle(&mut self, cycle: DependencyCycle) {
        self.cycles.push(cycle);
    }
}

/// Terminal failure of a collect call, carrying the partial result.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CollectionError {
    message: String,
    result: CollectResult,
}

impl CollectionError {
    pub(crate) fn new(message: impl Into<String>, result: CollectResult) -> Self {
        Self {
            message: message.into(),
            result,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// What was collected before the failure.
    pub fn result(&self) -> &CollectResult {
        &self.result
    }

    pub fn into_result(self) -> CollectResult {
        self.result
    }
}

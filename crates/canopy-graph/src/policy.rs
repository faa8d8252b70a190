//! Pluggable collection policies.
//!
//! Four policy families steer the walk: selectors decide whether a dependency
//! enters the graph, managers override dependency fields, traversers decide
//! whether a node's own dependencies are descended into, and version filters
//! prune range-resolved version lists. Each policy derives a child policy for
//! the next tree depth from a [`CollectionContext`]; derivation returns a new
//! handle and never mutates the parent. A policy that does not change with
//! depth should return its own handle unchanged, which also lets the data
//! pool recognize repeated sub-problems.

use crate::resolution::VersionRangeResult;
use canopy_core::{
    Artifact, ArtifactRepository, Dependency, Exclusion, RepositoryError, Version,
    VersionConstraint,
};
use std::collections::BTreeMap;
use std::rc::Rc;

/// A partial override a [`DependencyManager`] produces for one dependency.
///
/// Only the populated fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManagement {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
    pub properties: Option<BTreeMap<String, String>>,
    pub exclusions: Option<Vec<Exclusion>>,
}

impl DependencyManagement {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field is populated.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// The snapshot policy derivations see at one recursion step.
///
/// For the root step it describes the root artifact and dependency; below
/// that, the dependency being descended into and the managed dependencies its
/// descriptor declares.
#[derive(Debug, Clone, Default)]
pub struct CollectionContext {
    artifact: Option<Rc<Artifact>>,
    dependency: Option<Dependency>,
    managed_dependencies: Vec<Dependency>,
}

impl CollectionContext {
    pub fn new(
        artifact: Option<Rc<Artifact>>,
        dependency: Option<Dependency>,
        managed_dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            artifact,
            dependency,
            managed_dependencies,
        }
    }

    /// The context for descending into `dependency`, whose descriptor
    /// declared `managed_dependencies`.
    pub fn for_dependency(dependency: &Dependency, managed_dependencies: &[Dependency]) -> Self {
        Self {
            artifact: Some(dependency.shared_artifact().clone()),
            dependency: Some(dependency.clone()),
            managed_dependencies: managed_dependencies.to_vec(),
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_deref()
    }

    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    pub fn managed_dependencies(&self) -> &[Dependency] {
        &self.managed_dependencies
    }
}

/// Decides whether a dependency becomes a node at all.
pub trait DependencySelector {
    /// True to keep the dependency, false to drop it silently.
    fn select(&self, dependency: &Dependency) -> bool;

    /// The selector for the next depth.
    fn derive_child(&self, context: &CollectionContext) -> Rc<dyn DependencySelector>;
}

/// Applies dependency-management overrides.
pub trait DependencyManager {
    /// The override for this dependency, if any.
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement>;

    /// The manager for the next depth.
    fn derive_child(&self, context: &CollectionContext) -> Rc<dyn DependencyManager>;
}

/// Decides whether a node's own dependencies are descended into.
pub trait DependencyTraverser {
    /// False cuts the walk below this dependency; the node itself is kept.
    fn traverse(&self, dependency: &Dependency) -> bool;

    /// The traverser for the next depth.
    fn derive_child(&self, context: &CollectionContext) -> Rc<dyn DependencyTraverser>;
}

/// Prunes the version list a range resolved to.
pub trait VersionFilter {
    /// Removes unwanted versions from the context. Runs only when the
    /// constraint is an actual range. A filter whose own machinery fails
    /// reports it as [`RepositoryError::Collaborator`]; the engine records
    /// the failure against the dependency being filtered.
    fn filter_versions(&self, context: &mut VersionFilterContext) -> Result<(), RepositoryError>;

    /// The filter for the next depth.
    fn derive_child(&self, context: &CollectionContext) -> Rc<dyn VersionFilter>;
}

/// The four policies in effect at one tree depth.
///
/// Deriving the bundle derives each member from the same context. Absent
/// members stay absent; an absent selector/traverser accepts everything, an
/// absent manager overrides nothing, an absent filter keeps every version.
#[derive(Clone, Default)]
pub struct Policies {
    pub selector: Option<Rc<dyn DependencySelector>>,
    pub manager: Option<Rc<dyn DependencyManager>>,
    pub traverser: Option<Rc<dyn DependencyTraverser>>,
    pub version_filter: Option<Rc<dyn VersionFilter>>,
}

impl Policies {
    /// The policies for the next depth.
    pub fn derive_child(&self, context: &CollectionContext) -> Policies {
        Policies {
            selector: self.selector.as_ref().map(|p| p.derive_child(context)),
            manager: self.manager.as_ref().map(|p| p.derive_child(context)),
            traverser: self.traverser.as_ref().map(|p| p.derive_child(context)),
            version_filter: self.version_filter.as_ref().map(|p| p.derive_child(context)),
        }
    }
}

/// The per-call state a [`VersionFilter`] works on.
///
/// Starts out holding every version of the range result (ascending) and is
/// narrowed in place by the filter.
#[derive(Debug)]
pub struct VersionFilterContext {
    dependency: Dependency,
    range: Rc<VersionRangeResult>,
    versions: Vec<Version>,
}

impl VersionFilterContext {
    pub fn new(dependency: Dependency, range: Rc<VersionRangeResult>) -> Self {
        let versions = range.versions().to_vec();
        Self {
            dependency,
            range,
            versions,
        }
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    pub fn constraint(&self) -> &VersionConstraint {
        self.range.constraint()
    }

    /// The surviving versions, ascending.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Keeps only the versions the predicate accepts.
    pub fn retain(&mut self, f: impl FnMut(&Version) -> bool) {
        self.versions.retain(f);
    }

    /// Removes one version; true when it was present.
    pub fn remove(&mut self, version: &Version) -> bool {
        let before = self.versions.len();
        self.versions.retain(|v| v != version);
        self.versions.len() != before
    }

    /// Where the given version was discovered, if the resolver knows.
    pub fn repository_of(&self, version: &Version) -> Option<&ArtifactRepository> {
        self.range.repository_of(version)
    }

    pub(crate) fn into_versions(self) -> Vec<Version> {
        self.versions
    }
}

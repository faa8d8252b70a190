//! Contracts for the external collaborators.
//!
//! The engine never talks to a repository itself. Descriptor reading, version
//! range expansion, repository aggregation, and post-collection graph
//! transformation are injected behind the traits in this module; anything
//! that blocks on I/O happens on the far side of them.

use crate::node::NodeRef;
use crate::policy::DependencyManager;
use crate::session::CollectSession;
use canopy_core::{
    Artifact, ArtifactRepository, Dependency, RemoteRepository, RepositoryError, Version,
    VersionConstraint,
};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A request to read one artifact's descriptor.
pub struct DescriptorRequest {
    pub artifact: Rc<Artifact>,
    pub repositories: Vec<RemoteRepository>,
    pub request_context: String,
    pub trace: Option<String>,
    /// The manager descriptor dependencies are subject to. Derived one level
    /// down from the requesting dependency's manager, since the descriptor's
    /// dependencies sit one level below it.
    pub manager: Option<Rc<dyn DependencyManager>>,
}

impl fmt::Debug for DescriptorRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorRequest")
            .field("artifact", &self.artifact.to_string())
            .field("repositories", &self.repositories)
            .field("request_context", &self.request_context)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

/// An artifact's descriptor: its own dependencies, overrides, repositories,
/// relocations, and aliases.
#[derive(Debug, Clone)]
pub struct DescriptorResult {
    /// The artifact as the descriptor declares it; may differ from the
    /// requested one by property enrichment.
    pub artifact: Rc<Artifact>,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
    /// Coordinates this artifact was relocated from/to, outermost first. A
    /// non-empty list redirects collection to the last entry.
    pub relocations: Vec<Artifact>,
    pub aliases: Vec<Artifact>,
}

impl DescriptorResult {
    /// An empty descriptor for an artifact that has none, e.g. one pinned to
    /// a local path.
    pub fn empty(artifact: Rc<Artifact>) -> Self {
        Self {
            artifact,
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            repositories: Vec::new(),
            relocations: Vec::new(),
            aliases: Vec::new(),
        }
    }
}

/// Reads artifact descriptors from repositories.
pub trait DescriptorReader {
    fn read_descriptor(
        &self,
        session: &CollectSession,
        request: &DescriptorRequest,
    ) -> Result<DescriptorResult, RepositoryError>;
}

/// A request to expand a version constraint against repositories.
#[derive(Debug, Clone)]
pub struct VersionRangeRequest {
    /// The artifact whose version field holds the constraint text.
    pub artifact: Rc<Artifact>,
    pub repositories: Vec<RemoteRepository>,
    pub request_context: String,
    pub trace: Option<String>,
}

/// The expansion of a version constraint.
#[derive(Debug, Clone)]
pub struct VersionRangeResult {
    constraint: VersionConstraint,
    versions: Vec<Version>,
    repositories: BTreeMap<String, ArtifactRepository>,
}

impl VersionRangeResult {
    pub fn new(constraint: VersionConstraint) -> Self {
        Self {
            constraint,
            versions: Vec::new(),
            repositories: BTreeMap::new(),
        }
    }

    pub fn constraint(&self) -> &VersionConstraint {
        &self.constraint
    }

    /// The matching versions, ascending.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Appends a version; the resolver is responsible for ascending order.
    pub fn add_version(&mut self, version: Version) {
        self.versions.push(version);
    }

    /// Records which repository supplied a version.
    pub fn set_repository(&mut self, version: &Version, repository: ArtifactRepository) {
        self.repositories
            .insert(version.as_str().to_string(), repository);
    }

    /// Where the given version was discovered, if known.
    pub fn repository_of(&self, version: &Version) -> Option<&ArtifactRepository> {
        self.repositories.get(version.as_str())
    }
}

/// Expands version constraints against repositories.
pub trait VersionRangeResolver {
    fn resolve_range(
        &self,
        session: &CollectSession,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, RepositoryError>;
}

/// Merges a parent repository list with newly declared repositories.
pub trait RepositoryAggregator {
    /// Returns the merged list. Parent entries come first; `recessive` marks
    /// the declared entries as lower priority on id collisions.
    fn aggregate(
        &self,
        session: &CollectSession,
        parent: &[RemoteRepository],
        declared: &[RemoteRepository],
        recessive: bool,
    ) -> Vec<RemoteRepository>;
}

/// Post-processes the collected graph (conflict resolution, ordering, ...).
pub trait GraphTransformer {
    /// Returns the root of the transformed graph, which may be the input.
    fn transform(
        &self,
        root: NodeRef,
        context: &mut TransformContext,
    ) -> Result<NodeRef, RepositoryError>;
}

/// Context handed to the graph transformer.
///
/// Carries the collection stats map when debug logging is enabled, so a
/// transformer can contribute its own timings.
#[derive(Debug, Default)]
pub struct TransformContext {
    pub stats: Option<BTreeMap<String, u64>>,
}

impl TransformContext {
    pub fn new(stats: Option<BTreeMap<String, u64>>) -> Self {
        Self { stats }
    }
}

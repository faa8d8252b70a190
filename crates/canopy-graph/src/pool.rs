//! The per-call memoization and interning cache.
//!
//! One `DataPool` lives for exactly one collect call. It caches version-range
//! results, descriptor results (including negative entries for failed reads),
//! canonical artifacts/dependencies, and the resolved children of whole
//! sub-problems. It is not thread-safe and never needs to be.

use crate::node::ChildList;
use crate::policy::Policies;
use crate::resolution::{DescriptorRequest, DescriptorResult, VersionRangeRequest, VersionRangeResult};
use canopy_core::{Artifact, Dependency, RemoteRepository};
use std::collections::HashMap;
use std::rc::Rc;

/// Cache key for a version-range lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeKey {
    artifact: Rc<Artifact>,
    repositories: Vec<RemoteRepository>,
}

/// Cache key for a descriptor lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    artifact: Rc<Artifact>,
    repositories: Vec<RemoteRepository>,
}

/// Cache key for a resolved sub-problem: the artifact being expanded, the
/// repositories in effect, and the four policies in effect.
///
/// Policies are keyed by handle identity. A derivation that hands back the
/// same handle produces the same key; one that allocates produces a fresh
/// key and conservatively misses the cache. Identity can never conflate two
/// distinct policies, so a hit is always sound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildrenKey {
    artifact: Rc<Artifact>,
    repositories: Vec<RemoteRepository>,
    selector: usize,
    manager: usize,
    traverser: usize,
    filter: usize,
}

fn policy_id<T: ?Sized>(policy: Option<&Rc<T>>) -> usize {
    policy.map_or(0, |rc| Rc::as_ptr(rc) as *const () as usize)
}

/// A descriptor cache entry.
///
/// `Missing` is the negative entry: the read failed once this call, and
/// repeating it for the same key would fail the same way.
#[derive(Debug, Clone)]
pub enum DescriptorEntry {
    Present(Rc<DescriptorResult>),
    Missing,
}

/// The call-scoped cache.
#[derive(Debug, Default)]
pub struct DataPool {
    artifacts: HashMap<Artifact, Rc<Artifact>>,
    dependencies: HashMap<Dependency, Dependency>,
    ranges: HashMap<RangeKey, Rc<VersionRangeResult>>,
    descriptors: HashMap<DescriptorKey, DescriptorEntry>,
    children: HashMap<ChildrenKey, ChildList>,
}

impl DataPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical handle for an artifact equal to the given one.
    pub fn intern_artifact(&mut self, artifact: &Rc<Artifact>) -> Rc<Artifact> {
        if let Some(canonical) = self.artifacts.get(artifact.as_ref()) {
            return canonical.clone();
        }
        self.artifacts
            .insert(artifact.as_ref().clone(), artifact.clone());
        artifact.clone()
    }

    /// Returns the canonical value for a dependency equal to the given one.
    pub fn intern_dependency(&mut self, dependency: Dependency) -> Dependency {
        if let Some(canonical) = self.dependencies.get(&dependency) {
            return canonical.clone();
        }
        self.dependencies.insert(dependency.clone(), dependency.clone());
        dependency
    }

    pub fn range_key(&self, request: &VersionRangeRequest) -> RangeKey {
        RangeKey {
            artifact: request.artifact.clone(),
            repositories: request.repositories.clone(),
        }
    }

    pub fn get_range(&self, key: &RangeKey) -> Option<Rc<VersionRangeResult>> {
        self.ranges.get(key).cloned()
    }

    pub fn put_range(&mut self, key: RangeKey, result: Rc<VersionRangeResult>) {
        self.ranges.insert(key, result);
    }

    pub fn descriptor_key(&self, request: &DescriptorRequest) -> DescriptorKey {
        DescriptorKey {
            artifact: request.artifact.clone(),
            repositories: request.repositories.clone(),
        }
    }

    pub fn get_descriptor(&self, key: &DescriptorKey) -> Option<DescriptorEntry> {
        self.descriptors.get(key).cloned()
    }

    pub fn put_descriptor(&mut self, key: DescriptorKey, result: Rc<DescriptorResult>) {
        self.descriptors.insert(key, DescriptorEntry::Present(result));
    }

    /// Records that reading this descriptor failed, so later lookups of the
    /// same key stop retrying.
    pub fn put_missing_descriptor(&mut self, key: DescriptorKey) {
        self.descriptors.insert(key, DescriptorEntry::Missing);
    }

    pub fn children_key(
        &self,
        artifact: Rc<Artifact>,
        repositories: &[RemoteRepository],
        policies: &Policies,
    ) -> ChildrenKey {
        ChildrenKey {
            artifact,
            repositories: repositories.to_vec(),
            selector: policy_id(policies.selector.as_ref()),
            manager: policy_id(policies.manager.as_ref()),
            traverser: policy_id(policies.traverser.as_ref()),
            filter: policy_id(policies.version_filter.as_ref()),
        }
    }

    pub fn get_children(&self, key: &ChildrenKey) -> Option<ChildList> {
        self.children.get(key).cloned()
    }

    /// Registers a children list for a sub-problem key.
    ///
    /// The list handle is stored before the sub-problem is expanded, so a
    /// later hit observes whatever the first expansion filled in.
    pub fn put_children(&mut self, key: ChildrenKey, children: ChildList) {
        self.children.insert(key, children);
    }
}

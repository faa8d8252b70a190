//! Dependency graph nodes.
//!
//! Nodes are shared handles (`Rc<RefCell<_>>`) and children live behind a
//! second shared handle, the `ChildList`. Sharing the child list by handle is
//! load-bearing: a cycle node is linked to its ancestor's children, and
//! memoized subtrees are reused, by cloning the `Rc` rather than copying the
//! list. Mutations through one handle are visible through all of them.

use canopy_core::{Artifact, Dependency, RemoteRepository, Version, VersionConstraint};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A shared handle to a node.
pub type NodeRef = Rc<RefCell<DependencyNode>>;

/// A shared, mutable list of children.
pub type ChildList = Rc<RefCell<Vec<NodeRef>>>;

/// Bitmask constants telling which fields of a node's dependency were
/// overridden by dependency management.
pub mod managed {
    pub const VERSION: u8 = 0x01;
    pub const SCOPE: u8 = 0x02;
    pub const OPTIONAL: u8 = 0x04;
    pub const PROPERTIES: u8 = 0x08;
    pub const EXCLUSIONS: u8 = 0x10;
}

/// The pre-management values of a dependency, for introspection.
///
/// Each field is `Some` only when dependency management actually overrode it.
/// Attached to nodes only when the session's verbose-premanaged flag is on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremanagedInfo {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
}

/// A node in the collected dependency graph.
pub struct DependencyNode {
    dependency: Option<Dependency>,
    artifact: Option<Rc<Artifact>>,
    version: Option<Version>,
    version_constraint: Option<VersionConstraint>,
    managed_bits: u8,
    premanaged: Option<PremanagedInfo>,
    relocations: Vec<Artifact>,
    aliases: Vec<Artifact>,
    repositories: Vec<RemoteRepository>,
    request_context: String,
    children: ChildList,
}

impl DependencyNode {
    /// Creates a node for a resolved dependency.
    pub fn from_dependency(dependency: Dependency) -> Self {
        let artifact = dependency.shared_artifact().clone();
        Self {
            dependency: Some(dependency),
            artifact: Some(artifact),
            ..Self::empty()
        }
    }

    /// Creates the synthetic root node wrapping a bare artifact (or nothing
    /// at all, when the request only carried a seed dependency list).
    pub fn from_root_artifact(artifact: Option<Artifact>) -> Self {
        Self {
            artifact: artifact.map(Rc::new),
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            dependency: None,
            artifact: None,
            version: None,
            version_constraint: None,
            managed_bits: 0,
            premanaged: None,
            relocations: Vec::new(),
            aliases: Vec::new(),
            repositories: Vec::new(),
            request_context: String::new(),
            children: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Wraps a node into a shared handle.
    pub fn into_ref(self) -> NodeRef {
        Rc::new(RefCell::new(self))
    }

    /// The resolved dependency, absent on the synthetic root node.
    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    /// The node's artifact: the dependency's artifact, or the bare root
    /// artifact on a synthetic root node.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_deref()
    }

    pub(crate) fn shared_artifact(&self) -> Option<&Rc<Artifact>> {
        self.artifact.as_ref()
    }

    /// The concrete version chosen for this node.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = Some(version);
    }

    /// The constraint the version was matched against.
    pub fn version_constraint(&self) -> Option<&VersionConstraint> {
        self.version_constraint.as_ref()
    }

    pub fn set_version_constraint(&mut self, constraint: VersionConstraint) {
        self.version_constraint = Some(constraint);
    }

    /// Which dependency fields were overridden by management; see [`managed`].
    pub fn managed_bits(&self) -> u8 {
        self.managed_bits
    }

    pub fn set_managed_bits(&mut self, bits: u8) {
        self.managed_bits = bits;
    }

    /// Pre-management introspection data, present only when the session ran
    /// with verbose premanaged state.
    pub fn premanaged(&self) -> Option<&PremanagedInfo> {
        self.premanaged.as_ref()
    }

    pub fn set_premanaged(&mut self, info: PremanagedInfo) {
        self.premanaged = Some(info);
    }

    /// The relocation chain that led to this node, oldest first.
    pub fn relocations(&self) -> &[Artifact] {
        &self.relocations
    }

    pub fn set_relocations(&mut self, relocations: Vec<Artifact>) {
        self.relocations = relocations;
    }

    pub fn aliases(&self) -> &[Artifact] {
        &self.aliases
    }

    pub fn set_aliases(&mut self, aliases: Vec<Artifact>) {
        self.aliases = aliases;
    }

    /// The repositories this node's artifact is known to come from.
    pub fn repositories(&self) -> &[RemoteRepository] {
        &self.repositories
    }

    pub fn set_repositories(&mut self, repositories: Vec<RemoteRepository>) {
        self.repositories = repositories;
    }

    pub fn request_context(&self) -> &str {
        &self.request_context
    }

    pub fn set_request_context(&mut self, context: impl Into<String>) {
        self.request_context = context.into();
    }

    /// The shared children list handle.
    pub fn children(&self) -> &ChildList {
        &self.children
    }

    /// Appends a child through the shared list.
    pub fn add_child(&self, child: NodeRef) {
        self.children.borrow_mut().push(child);
    }

    /// Replaces this node's child list with an existing shared list.
    ///
    /// After this call the node observes every past and future mutation of
    /// that list; this is how cycle nodes and memoized subtrees are linked.
    pub fn set_children(&mut self, children: ChildList) {
        self.children = children;
    }

    /// True when this node's children list is the same shared list as
    /// `other`'s.
    pub fn shares_children_with(&self, other: &DependencyNode) -> bool {
        Rc::ptr_eq(&self.children, &other.children)
    }
}

// Hand-written: children lists may be shared across nodes of one graph
// (cycles), so a derived recursive Debug would not terminate.
impl fmt::Debug for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let artifact = match &self.artifact {
            Some(artifact) => artifact.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            "DependencyNode {{ artifact: {}, managed_bits: {:#04x}, children: {} }}",
            artifact,
            self.managed_bits,
            self.children.borrow().len()
        )
    }
}

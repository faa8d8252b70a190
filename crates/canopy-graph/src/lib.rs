//! Canopy Graph - Dependency graph collection
//!
//! This crate walks the transitive dependency graph of an artifact. Starting
//! from a root dependency (or a seed list of direct dependencies), it reads
//! each artifact's descriptor, expands version ranges, applies dependency
//! management and the policy chain, and links the results into a graph of
//! [`DependencyNode`]s.
//!
//! # Architecture
//!
//! The engine is a synchronous depth-first walk with:
//! - a node stack for cycle detection by artifact coordinates,
//! - a call-scoped data pool memoizing ranges, descriptors, and whole
//!   subtrees,
//! - bounded, non-aborting accumulation of errors and cycles.
//!
//! Everything repository-facing sits behind the traits in [`resolution`];
//! the policy chain steering the walk lives in [`policy`].
//!
//! # Example
//!
//! ```no_run
//! use canopy_core::{Artifact, Dependency, RemoteRepository};
//! use canopy_graph::{CollectRequest, CollectSession, DependencyCollector};
//! # fn collaborators() -> DependencyCollector { unimplemented!() }
//!
//! let collector = collaborators();
//! let session = CollectSession::new();
//!
//! let root = Dependency::new(Artifact::new("org.example", "app", "1.0"), "compile");
//! let central = RemoteRepository::new("central", "https://repo.example/releases");
//! let request = CollectRequest::for_root(root, vec![central]);
//!
//! let result = collector.collect(&session, &request)?;
//! let root_node = result.root().unwrap();
//! # Ok::<(), canopy_graph::CollectionError>(())
//! ```

mod collector;
mod node;
mod policy;
mod pool;
mod premanaged;
mod request;
mod resolution;
mod results;
mod session;
mod stack;

pub use collector::DependencyCollector;
pub use node::{managed, ChildList, DependencyNode, NodeRef, PremanagedInfo};
pub use policy::{
    CollectionContext, DependencyManagement, DependencyManager, DependencySelector,
    DependencyTraverser, Policies, VersionFilter, VersionFilterContext,
};
pub use pool::{ChildrenKey, DataPool, DescriptorEntry, DescriptorKey, RangeKey};
pub use premanaged::PremanagedDependency;
pub use request::{CollectRequest, CollectResult, CollectionError, DependencyCycle};
pub use resolution::{
    DescriptorReader, DescriptorRequest, DescriptorResult, GraphTransformer, RepositoryAggregator,
    TransformContext, VersionRangeRequest, VersionRangeResolver, VersionRangeResult,
};
pub use session::{
    CollectSession, MAX_CYCLES_KEY, MAX_EXCEPTIONS_KEY, VERBOSE_PREMANAGED_KEY,
};
pub use stack::NodeStack;

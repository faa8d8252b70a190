//! The collection engine.
//!
//! `DependencyCollector` walks the transitive dependency graph: it resolves
//! each dependency's version range, reads the descriptor for every surviving
//! version, applies management and the policy chain, links cycles back to
//! their ancestors, and memoizes repeated sub-problems through the data pool.
//! The walk is synchronous and depth-first; only the injected collaborators
//! touch repositories.

use crate::node::{DependencyNode, NodeRef};
use crate::policy::{CollectionContext, DependencyManager, Policies, VersionFilter, VersionFilterContext};
use crate::pool::{DataPool, DescriptorEntry};
use crate::premanaged::PremanagedDependency;
use crate::request::{CollectRequest, CollectResult, CollectionError};
use crate::resolution::{
    DescriptorReader, DescriptorRequest, DescriptorResult, GraphTransformer, RepositoryAggregator,
    TransformContext, VersionRangeRequest, VersionRangeResolver, VersionRangeResult,
};
use crate::results::Results;
use crate::session::CollectSession;
use crate::stack::NodeStack;
use canopy_core::{
    properties, Artifact, ArtifactRepository, Dependency, RemoteRepository, RepositoryError,
    Version,
};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, trace};

/// Collects the transitive dependency graph for a request.
///
/// The collector itself is stateless between calls; everything a walk needs
/// (pool, node stack, accumulated results) is created inside [`collect`] and
/// dropped at its return, so one collector can serve any number of calls.
///
/// [`collect`]: DependencyCollector::collect
pub struct DependencyCollector {
    descriptor_reader: Rc<dyn DescriptorReader>,
    range_resolver: Rc<dyn VersionRangeResolver>,
    repository_aggregator: Rc<dyn RepositoryAggregator>,
}

/// Per-call mutable state threaded through the recursion.
struct WalkState<'a> {
    session: &'a CollectSession,
    request: &'a CollectRequest,
    ignore_repos: bool,
    verbose: bool,
    pool: DataPool,
    nodes: NodeStack,
    results: Results,
}

/// Outcome of a descriptor lookup for one concrete version.
enum Fetched {
    Present(Rc<DescriptorResult>),
    /// No descriptor: the read failed, just now or earlier this call. The
    /// version still becomes a leaf node with no descriptor; only the error
    /// recording is once per key.
    Absent,
}

impl DependencyCollector {
    pub fn new(
        descriptor_reader: Rc<dyn DescriptorReader>,
        range_resolver: Rc<dyn VersionRangeResolver>,
        repository_aggregator: Rc<dyn RepositoryAggregator>,
    ) -> Self {
        Self {
            descriptor_reader,
            range_resolver,
            repository_aggregator,
        }
    }

    /// Collects the dependency graph for `request`.
    ///
    /// On failure the returned [`CollectionError`] carries the partial
    /// result, including every error recorded up to the session quota.
    pub fn collect(
        &self,
        session: &CollectSession,
        request: &CollectRequest,
    ) -> Result<CollectResult, CollectionError> {
        let started = Instant::now();
        let mut result = CollectResult::new();

        let mut repositories = request.repositories.clone();
        let mut dependencies = request.dependencies.clone();
        let mut managed_dependencies = request.managed_dependencies.clone();

        let mut root = None;
        let root_node: NodeRef = if let Some(root_dep) = &request.root {
            let mut root_dep = root_dep.clone();

            let range_request = VersionRangeRequest {
                artifact: root_dep.shared_artifact().clone(),
                repositories: request.repositories.clone(),
                request_context: request.request_context.clone(),
                trace: request.trace.clone(),
            };
            let range_result = match self.range_resolver.resolve_range(session, &range_request) {
                Ok(range_result) => Rc::new(range_result),
                Err(e) => return Err(Self::fail_root(result, e)),
            };
            let versions =
                match filter_versions(&root_dep, &range_result, session.version_filter.as_ref()) {
                    Ok(versions) => versions,
                    Err(e) => return Err(Self::fail_root(result, e)),
                };
            // The highest surviving version wins the root.
            let version = match versions.last() {
                Some(version) => version.clone(),
                None => {
                    let e = RepositoryError::version_range(
                        root_dep.artifact(),
                        "no versions available within specified range",
                    );
                    return Err(Self::fail_root(result, e));
                }
            };
            root_dep = root_dep.set_artifact(root_dep.artifact().set_version(version.as_str()));

            let root_context = CollectionContext::new(
                Some(root_dep.shared_artifact().clone()),
                Some(root_dep.clone()),
                managed_dependencies.clone(),
            );
            let manager = session
                .manager
                .as_ref()
                .map(|m| m.derive_child(&root_context));

            let descriptor_request =
                build_descriptor_request(request, &repositories, &root_dep, manager.as_ref());
            let descriptor_result = if lacks_descriptor(root_dep.artifact()) {
                DescriptorResult::empty(root_dep.shared_artifact().clone())
            } else {
                match self
                    .descriptor_reader
                    .read_descriptor(session, &descriptor_request)
                {
                    Ok(descriptor_result) => descriptor_result,
                    Err(e) => return Err(Self::fail_root(result, e)),
                }
            };

            root_dep = root_dep.set_shared_artifact(descriptor_result.artifact.clone());

            if !session.ignore_artifact_descriptor_repositories {
                repositories = self.repository_aggregator.aggregate(
                    session,
                    &repositories,
                    &descriptor_result.repositories,
                    true,
                );
            }
            dependencies = merge_dependencies(dependencies, descriptor_result.dependencies);
            managed_dependencies =
                merge_dependencies(managed_dependencies, descriptor_result.managed_dependencies);

            let mut node = DependencyNode::from_dependency(root_dep.clone());
            node.set_request_context(request.request_context.clone());
            node.set_relocations(descriptor_result.relocations);
            node.set_version_constraint(range_result.constraint().clone());
            node.set_version(version);
            node.set_aliases(descriptor_result.aliases);
            // The root records the caller's asking list, not the aggregate
            // the recursion runs against.
            node.set_repositories(request.repositories.clone());

            root = Some(root_dep);
            node.into_ref()
        } else {
            DependencyNode::from_root_artifact(request.root_artifact.clone()).into_ref()
        };

        result.set_root(root_node.clone());

        let traverse = match (&root, &session.traverser) {
            (Some(root_dep), Some(traverser)) => traverser.traverse(root_dep),
            _ => true,
        };

        let mut stats = if tracing::enabled!(tracing::Level::DEBUG) {
            Some(BTreeMap::new())
        } else {
            None
        };

        let mut error_path = None;
        if traverse && !dependencies.is_empty() {
            let context = CollectionContext::new(
                request.root_artifact.clone().map(Rc::new),
                root,
                managed_dependencies,
            );
            let policies = session.policies().derive_child(&context);

            let mut state = WalkState {
                session,
                request,
                ignore_repos: session.ignore_artifact_descriptor_repositories,
                verbose: session.verbose_premanaged(),
                pool: DataPool::new(),
                nodes: NodeStack::new(),
                results: Results::new(result, session),
            };
            state.nodes.push(root_node);

            self.process(&mut state, &dependencies, &repositories, &policies);

            error_path = state.results.error_path.take();
            result = state.results.into_result();
        }

        if let Some(stats) = &mut stats {
            stats.insert(
                "collect_time_ms".to_string(),
                started.elapsed().as_millis() as u64,
            );
        }

        if let Some(transformer) = &session.transformer {
            let transform_started = Instant::now();
            result = Self::transform(result, transformer.as_ref(), &mut stats);
            if let Some(stats) = &mut stats {
                stats.insert(
                    "transform_time_ms".to_string(),
                    transform_started.elapsed().as_millis() as u64,
                );
            }
        }

        if let Some(stats) = &stats {
            debug!(?stats, "dependency collection stats");
        }

        if let Some(path) = error_path {
            return Err(CollectionError::new(
                format!("Failed to collect dependencies at {path}"),
                result,
            ));
        }
        if !result.exceptions().is_empty() {
            return Err(CollectionError::new(
                "Failed to collect dependencies",
                result,
            ));
        }
        Ok(result)
    }

    /// Root resolution failures attach to the result and end the call.
    fn fail_root(mut result: CollectResult, e: RepositoryError) -> CollectionError {
        let message = e.to_string();
        result.add_exception(e);
        CollectionError::new(message, result)
    }

    /// Runs the transformer once; its failure is recorded, never raised.
    fn transform(
        mut result: CollectResult,
        transformer: &dyn GraphTransformer,
        stats: &mut Option<BTreeMap<String, u64>>,
    ) -> CollectResult {
        let Some(root) = result.root().cloned() else {
            return result;
        };
        let mut context = TransformContext::new(stats.take());
        match transformer.transform(root, &mut context) {
            Ok(new_root) => result.set_root(new_root),
            Err(e) => result.add_exception(e),
        }
        *stats = context.stats.take();
        result
    }

    /// Expands one dependency list in insertion order.
    fn process(
        &self,
        state: &mut WalkState<'_>,
        dependencies: &[Dependency],
        repositories: &[RemoteRepository],
        policies: &Policies,
    ) {
        for dependency in dependencies {
            self.process_dependency(state, repositories, policies, dependency.clone(), &[], false);
        }
    }

    fn process_dependency(
        &self,
        state: &mut WalkState<'_>,
        repositories: &[RemoteRepository],
        policies: &Policies,
        dependency: Dependency,
        relocations: &[Artifact],
        disable_version_management: bool,
    ) {
        if let Some(selector) = &policies.selector {
            if !selector.select(&dependency) {
                return;
            }
        }

        let premanaged = PremanagedDependency::create(
            policies.manager.as_ref(),
            dependency,
            disable_version_management,
            state.verbose,
        );
        let dependency = premanaged.managed_dependency().clone();

        trace!(dependency = %dependency, "processing dependency");

        let no_descriptor = lacks_descriptor(dependency.artifact());
        let traverse = !no_descriptor
            && policies
                .traverser
                .as_ref()
                .map_or(true, |t| t.traverse(&dependency));

        let range_request = VersionRangeRequest {
            artifact: dependency.shared_artifact().clone(),
            repositories: repositories.to_vec(),
            request_context: state.request.request_context.clone(),
            trace: state.request.trace.clone(),
        };
        let range_result = match self.cached_range(state, &range_request) {
            Ok(range_result) => range_result,
            Err(e) => {
                state.results.add_exception(&dependency, e, &state.nodes);
                return;
            }
        };
        let versions =
            match filter_versions(&dependency, &range_result, policies.version_filter.as_ref()) {
                Ok(versions) => versions,
                Err(e) => {
                    state.results.add_exception(&dependency, e, &state.nodes);
                    return;
                }
            };

        for version in &versions {
            let original_artifact = dependency.artifact().set_version(version.as_str());
            let mut managed = dependency.set_artifact(original_artifact.clone());

            let descriptor_request = build_descriptor_request(
                state.request,
                repositories,
                &managed,
                policies.manager.as_ref(),
            );

            match self.fetch_descriptor(state, no_descriptor, &managed, descriptor_request) {
                Fetched::Present(descriptor) => {
                    managed = managed.set_shared_artifact(descriptor.artifact.clone());

                    if let Some(cycle_entry) = state.nodes.find(managed.artifact()) {
                        state.results.add_cycle(&state.nodes, cycle_entry, &managed);
                        let cycle_node = state.nodes.get(cycle_entry);
                        let linked = {
                            let entry = cycle_node.borrow();
                            entry.dependency().is_some().then(|| {
                                (
                                    entry.repositories().to_vec(),
                                    entry.request_context().to_string(),
                                    entry.children().clone(),
                                )
                            })
                        };
                        // A match on the synthetic root records the cycle but
                        // still expands; the next level down links for real.
                        if let Some((repos, context, children)) = linked {
                            let mut child = build_node(
                                relocations,
                                &premanaged,
                                &range_result,
                                version,
                                &managed,
                                descriptor.aliases.clone(),
                                repos,
                                context,
                            );
                            child.set_children(children);
                            state.nodes.top().borrow().add_child(child.into_ref());
                            continue;
                        }
                    }

                    if !descriptor.relocations.is_empty() {
                        let relocated = managed.artifact();
                        let disable = original_artifact.group() == relocated.group()
                            && original_artifact.id() == relocated.id();
                        self.process_dependency(
                            state,
                            repositories,
                            policies,
                            managed,
                            &descriptor.relocations,
                            disable,
                        );
                        return;
                    }

                    let interned = state.pool.intern_artifact(managed.shared_artifact());
                    let managed = state
                        .pool
                        .intern_dependency(managed.set_shared_artifact(interned));

                    let node_repositories =
                        effective_repositories(range_result.repository_of(version), repositories);
                    let child = build_node(
                        relocations,
                        &premanaged,
                        &range_result,
                        version,
                        &managed,
                        descriptor.aliases.clone(),
                        node_repositories,
                        state.request.request_context.clone(),
                    )
                    .into_ref();

                    state.nodes.top().borrow().add_child(child.clone());

                    if traverse && !descriptor.dependencies.is_empty() {
                        self.recurse(state, repositories, policies, &managed, &descriptor, child);
                    }
                }
                Fetched::Absent => {
                    let node_repositories =
                        effective_repositories(range_result.repository_of(version), repositories);
                    let child = build_node(
                        relocations,
                        &premanaged,
                        &range_result,
                        version,
                        &managed,
                        Vec::new(),
                        node_repositories,
                        state.request.request_context.clone(),
                    );
                    state.nodes.top().borrow().add_child(child.into_ref());
                }
            }
        }
    }

    /// Descends into a child node's own dependencies, unless the sub-problem
    /// was already solved.
    fn recurse(
        &self,
        state: &mut WalkState<'_>,
        repositories: &[RemoteRepository],
        policies: &Policies,
        dependency: &Dependency,
        descriptor: &DescriptorResult,
        child: NodeRef,
    ) {
        let context = CollectionContext::for_dependency(dependency, &descriptor.managed_dependencies);
        let child_policies = policies.derive_child(&context);

        let child_repositories = if state.ignore_repos {
            repositories.to_vec()
        } else {
            self.repository_aggregator.aggregate(
                state.session,
                repositories,
                &descriptor.repositories,
                true,
            )
        };

        let key = state.pool.children_key(
            dependency.shared_artifact().clone(),
            &child_repositories,
            &child_policies,
        );
        if let Some(children) = state.pool.get_children(&key) {
            child.borrow_mut().set_children(children);
        } else {
            // Register the (still empty) list before descending; an equal
            // sub-problem hit later observes it once populated.
            let list = child.borrow().children().clone();
            state.pool.put_children(key, list);

            state.nodes.push(child);
            self.process(
                state,
                &descriptor.dependencies,
                &child_repositories,
                &child_policies,
            );
            state.nodes.pop();
        }
    }

    fn cached_range(
        &self,
        state: &mut WalkState<'_>,
        request: &VersionRangeRequest,
    ) -> Result<Rc<VersionRangeResult>, RepositoryError> {
        let key = state.pool.range_key(request);
        if let Some(cached) = state.pool.get_range(&key) {
            return Ok(cached);
        }
        let result = Rc::new(self.range_resolver.resolve_range(state.session, request)?);
        state.pool.put_range(key, result.clone());
        Ok(result)
    }

    /// Resolves a descriptor through the pool.
    ///
    /// A fresh read failure is recorded against the current path and cached
    /// negatively, so repeats of the same key neither re-read nor re-record.
    fn fetch_descriptor(
        &self,
        state: &mut WalkState<'_>,
        no_descriptor: bool,
        dependency: &Dependency,
        request: DescriptorRequest,
    ) -> Fetched {
        if no_descriptor {
            return Fetched::Present(Rc::new(DescriptorResult::empty(request.artifact.clone())));
        }
        let key = state.pool.descriptor_key(&request);
        match state.pool.get_descriptor(&key) {
            Some(DescriptorEntry::Present(descriptor)) => Fetched::Present(descriptor),
            Some(DescriptorEntry::Missing) => Fetched::Absent,
            None => match self.descriptor_reader.read_descriptor(state.session, &request) {
                Ok(descriptor) => {
                    let descriptor = Rc::new(descriptor);
                    state.pool.put_descriptor(key, descriptor.clone());
                    Fetched::Present(descriptor)
                }
                Err(e) => {
                    state.results.add_exception(dependency, e, &state.nodes);
                    state.pool.put_missing_descriptor(key);
                    Fetched::Absent
                }
            },
        }
    }
}

fn lacks_descriptor(artifact: &Artifact) -> bool {
    artifact.property(properties::LOCAL_PATH).is_some()
}

fn build_descriptor_request(
    request: &CollectRequest,
    repositories: &[RemoteRepository],
    dependency: &Dependency,
    manager: Option<&Rc<dyn DependencyManager>>,
) -> DescriptorRequest {
    DescriptorRequest {
        artifact: dependency.shared_artifact().clone(),
        repositories: repositories.to_vec(),
        request_context: request.request_context.clone(),
        trace: request.trace.clone(),
        // Descriptor dependencies sit one level below the declaring
        // dependency, so their manager is derived one extra level down.
        manager: manager.map(|m| m.derive_child(&CollectionContext::default())),
    }
}

fn build_node(
    relocations: &[Artifact],
    premanaged: &PremanagedDependency,
    range_result: &VersionRangeResult,
    version: &Version,
    dependency: &Dependency,
    aliases: Vec<Artifact>,
    repositories: Vec<RemoteRepository>,
    request_context: String,
) -> DependencyNode {
    let mut node = DependencyNode::from_dependency(dependency.clone());
    premanaged.apply_to(&mut node);
    node.set_relocations(relocations.to_vec());
    node.set_version_constraint(range_result.constraint().clone());
    node.set_version(version.clone());
    node.set_aliases(aliases);
    node.set_repositories(repositories);
    node.set_request_context(request_context);
    node
}

/// The effective repositories for one chosen version: the remote repository
/// that supplied it when known, nothing for a non-remote origin, the ambient
/// list when the origin is unknown.
fn effective_repositories(
    origin: Option<&ArtifactRepository>,
    ambient: &[RemoteRepository],
) -> Vec<RemoteRepository> {
    match origin {
        Some(ArtifactRepository::Remote(repository)) => vec![repository.clone()],
        Some(_) => Vec::new(),
        None => ambient.to_vec(),
    }
}

/// Runs the version filter over a range result.
///
/// An empty range fails outright. The filter runs only against an actual
/// range expression; a pinned constraint keeps its full version list. An
/// empty survivor set is a failure as well.
fn filter_versions(
    dependency: &Dependency,
    range_result: &Rc<VersionRangeResult>,
    filter: Option<&Rc<dyn VersionFilter>>,
) -> Result<Vec<Version>, RepositoryError> {
    if range_result.versions().is_empty() {
        return Err(RepositoryError::version_range(
            dependency.artifact(),
            "no versions available within specified range",
        ));
    }

    let filter = match (filter, range_result.constraint().range()) {
        (Some(filter), Some(_)) => filter,
        _ => return Ok(range_result.versions().to_vec()),
    };

    let mut context = VersionFilterContext::new(dependency.clone(), range_result.clone());
    filter.filter_versions(&mut context).map_err(|e| {
        RepositoryError::version_range(
            dependency.artifact(),
            format!("failed to filter versions: {e}"),
        )
    })?;
    let versions = context.into_versions();
    if versions.is_empty() {
        let available: Vec<&str> = range_result.versions().iter().map(Version::as_str).collect();
        return Err(RepositoryError::version_range(
            dependency.artifact(),
            format!("no acceptable versions: {}", available.join(", ")),
        ));
    }
    Ok(versions)
}

/// Merges two dependency lists, dominant first, keyed on version-less
/// coordinates: a dominant entry suppresses any recessive entry for the same
/// coordinates.
fn merge_dependencies(dominant: Vec<Dependency>, recessive: Vec<Dependency>) -> Vec<Dependency> {
    if dominant.is_empty() {
        return recessive;
    }
    if recessive.is_empty() {
        return dominant;
    }

    let mut ids = HashSet::with_capacity(dominant.len() + recessive.len());
    let mut merged = Vec::with_capacity(dominant.len() + recessive.len());
    for dependency in dominant {
        ids.insert(dependency.artifact().coordinate_id());
        merged.push(dependency);
    }
    for dependency in recessive {
        if !ids.contains(&dependency.artifact().coordinate_id()) {
            merged.push(dependency);
        }
    }
    merged
}

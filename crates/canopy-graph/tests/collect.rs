//! End-to-end collection scenarios over an in-memory artifact universe.

use canopy_core::{
    properties, Artifact, ArtifactRepository, Dependency, RemoteRepository, RepositoryError,
    Version, VersionConstraint, VersionRange,
};
use canopy_graph::{
    managed, CollectRequest, CollectSession, CollectionContext, DependencyCollector,
    DependencyManagement, DependencyManager, DependencySelector, DependencyTraverser,
    DescriptorReader, DescriptorRequest, DescriptorResult, NodeRef, RepositoryAggregator,
    VersionFilter, VersionFilterContext, VersionRangeRequest, VersionRangeResolver,
    VersionRangeResult, MAX_EXCEPTIONS_KEY, VERBOSE_PREMANAGED_KEY,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

// ─────────────────────────────────────────────────────────────────────────────
// Stub collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// An in-memory universe of artifacts, backing all three collaborator traits.
#[derive(Default)]
struct Registry {
    /// "group:id:version" -> declared dependencies.
    dependencies: HashMap<String, Vec<Dependency>>,
    /// "group:id:version" -> declared managed dependencies.
    managed: HashMap<String, Vec<Dependency>>,
    /// "group:id:version" -> (relocation target, relocation chain).
    relocated: HashMap<String, (Artifact, Vec<Artifact>)>,
    /// "group:id:version" -> repositories the descriptor declares.
    declared_repositories: HashMap<String, Vec<RemoteRepository>>,
    /// "group:id:<range>" -> matching versions, ascending.
    ranges: HashMap<String, Vec<String>>,
    /// "group:id:version" -> where that version was discovered.
    origins: HashMap<String, ArtifactRepository>,
    failing_ranges: HashSet<String>,
    failing_descriptors: HashSet<String>,
    descriptor_reads: RefCell<HashMap<String, usize>>,
}

fn key(artifact: &Artifact) -> String {
    format!(
        "{}:{}:{}",
        artifact.group(),
        artifact.id(),
        artifact.version()
    )
}

impl Registry {
    fn declare(&mut self, group: &str, id: &str, version: &str, dependencies: Vec<Dependency>) {
        self.dependencies
            .insert(format!("{group}:{id}:{version}"), dependencies);
    }

    fn relocate(&mut self, group: &str, id: &str, version: &str, target: Artifact) {
        let source = artifact(group, id, version);
        self.relocated.insert(
            format!("{group}:{id}:{version}"),
            (target, vec![source]),
        );
    }

    fn reads(&self, group: &str, id: &str, version: &str) -> usize {
        self.descriptor_reads
            .borrow()
            .get(&format!("{group}:{id}:{version}"))
            .copied()
            .unwrap_or(0)
    }
}

impl DescriptorReader for Registry {
    fn read_descriptor(
        &self,
        _session: &CollectSession,
        request: &DescriptorRequest,
    ) -> Result<DescriptorResult, RepositoryError> {
        let k = key(&request.artifact);
        *self.descriptor_reads.borrow_mut().entry(k.clone()).or_insert(0) += 1;

        if self.failing_descriptors.contains(&k) {
            return Err(RepositoryError::descriptor(&*request.artifact, "simulated outage"));
        }
        if let Some((target, chain)) = self.relocated.get(&k) {
            let mut result = DescriptorResult::empty(Rc::new(target.clone()));
            result.relocations = chain.clone();
            return Ok(result);
        }
        Ok(DescriptorResult {
            artifact: request.artifact.clone(),
            dependencies: self.dependencies.get(&k).cloned().unwrap_or_default(),
            managed_dependencies: self.managed.get(&k).cloned().unwrap_or_default(),
            repositories: self.declared_repositories.get(&k).cloned().unwrap_or_default(),
            relocations: Vec::new(),
            aliases: Vec::new(),
        })
    }
}

impl VersionRangeResolver for Registry {
    fn resolve_range(
        &self,
        _session: &CollectSession,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, RepositoryError> {
        let artifact = &request.artifact;
        let constraint = artifact.version();
        let k = format!("{}:{}:{}", artifact.group(), artifact.id(), constraint);

        if self.failing_ranges.contains(&k) {
            return Err(RepositoryError::version_range(&**artifact, "no matching versions"));
        }

        let mut result;
        if constraint.starts_with('[') || constraint.starts_with('(') {
            result = VersionRangeResult::new(VersionConstraint::Range(VersionRange::new(constraint)));
            for v in self.ranges.get(&k).cloned().unwrap_or_default() {
                result.add_version(Version::new(&v));
                let vk = format!("{}:{}:{}", artifact.group(), artifact.id(), v);
                if let Some(origin) = self.origins.get(&vk) {
                    result.set_repository(&Version::new(&v), origin.clone());
                }
            }
        } else {
            result = VersionRangeResult::new(VersionConstraint::Pinned(Version::new(constraint)));
            result.add_version(Version::new(constraint));
            if let Some(origin) = self.origins.get(&k) {
                result.set_repository(&Version::new(constraint), origin.clone());
            }
        }
        Ok(result)
    }
}

impl RepositoryAggregator for Registry {
    fn aggregate(
        &self,
        _session: &CollectSession,
        parent: &[RemoteRepository],
        declared: &[RemoteRepository],
        _recessive: bool,
    ) -> Vec<RemoteRepository> {
        let mut merged = parent.to_vec();
        for repository in declared {
            if !merged.iter().any(|r| r.id() == repository.id()) {
                merged.push(repository.clone());
            }
        }
        merged
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stub policies
// ─────────────────────────────────────────────────────────────────────────────

/// Overrides dependencies by version-less coordinates.
#[derive(Clone, Default)]
struct MapManager {
    overrides: HashMap<String, DependencyManagement>,
}

impl DependencyManager for MapManager {
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement> {
        self.overrides
            .get(&dependency.artifact().coordinate_id())
            .cloned()
    }

    fn derive_child(&self, _context: &CollectionContext) -> Rc<dyn DependencyManager> {
        Rc::new(self.clone())
    }
}

/// Drops dependencies with the given scope.
#[derive(Clone)]
struct ScopeSelector {
    excluded: String,
}

impl DependencySelector for ScopeSelector {
    fn select(&self, dependency: &Dependency) -> bool {
        dependency.scope() != self.excluded
    }

    fn derive_child(&self, _context: &CollectionContext) -> Rc<dyn DependencySelector> {
        Rc::new(self.clone())
    }
}

/// Keeps the given artifact id's node but refuses to walk below it.
#[derive(Clone)]
struct StopBelow {
    id: String,
}

impl DependencyTraverser for StopBelow {
    fn traverse(&self, dependency: &Dependency) -> bool {
        dependency.artifact().id() != self.id
    }

    fn derive_child(&self, _context: &CollectionContext) -> Rc<dyn DependencyTraverser> {
        Rc::new(self.clone())
    }
}

/// Removes one exact version from every range.
#[derive(Clone)]
struct DropVersion {
    version: String,
}

impl VersionFilter for DropVersion {
    fn filter_versions(&self, context: &mut VersionFilterContext) -> Result<(), RepositoryError> {
        context.retain(|v| v.as_str() != self.version);
        Ok(())
    }

    fn derive_child(&self, _context: &CollectionContext) -> Rc<dyn VersionFilter> {
        Rc::new(self.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn artifact(group: &str, id: &str, version: &str) -> Artifact {
    Artifact::new(group, id, version)
}

fn dep(group: &str, id: &str, version: &str) -> Dependency {
    Dependency::new(artifact(group, id, version), "compile")
}

fn repo(id: &str) -> RemoteRepository {
    RemoteRepository::new(id, format!("https://{id}.example"))
}

fn collector(registry: Rc<Registry>) -> DependencyCollector {
    DependencyCollector::new(registry.clone(), registry.clone(), registry)
}

fn repo_ids(node: &NodeRef) -> Vec<String> {
    node.borrow()
        .repositories()
        .iter()
        .map(|r| r.id().to_string())
        .collect()
}

fn children(node: &NodeRef) -> Vec<NodeRef> {
    node.borrow().children().borrow().iter().cloned().collect()
}

fn child_named(node: &NodeRef, id: &str) -> NodeRef {
    children(node)
        .into_iter()
        .find(|c| c.borrow().artifact().map(|a| a.id() == id).unwrap_or(false))
        .unwrap_or_else(|| panic!("no child named {id}"))
}

/// Renders the tree shape for structural comparison. Shared child lists are
/// re-entered only while not already on the rendering path, so cycles
/// terminate.
fn render(node: &NodeRef, depth: usize, out: &mut String, on_path: &mut HashSet<*const ()>) {
    out.push_str(&"  ".repeat(depth));
    match node.borrow().artifact() {
        Some(a) => out.push_str(&a.to_string()),
        None => out.push('-'),
    }
    out.push('\n');

    let list = node.borrow().children().clone();
    let ptr = Rc::as_ptr(&list) as *const ();
    if !on_path.insert(ptr) {
        return;
    }
    for child in list.borrow().iter() {
        render(child, depth + 1, out, on_path);
    }
    on_path.remove(&ptr);
}

fn shape(node: &NodeRef) -> String {
    let mut out = String::new();
    render(node, 0, &mut out, &mut HashSet::new());
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_diamond_shares_subtree_by_reference() {
    // root -> a, b; a -> c; b -> c; c -> d
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "c", "1")]);
    registry.declare("g", "b", "1", vec![dep("g", "c", "1")]);
    registry.declare("g", "c", "1", vec![dep("g", "d", "1")]);
    registry.declare("g", "d", "1", vec![]);
    let registry = Rc::new(registry);

    let request =
        CollectRequest::for_dependencies(vec![dep("g", "a", "1"), dep("g", "b", "1")], vec![]);
    let result = collector(registry.clone())
        .collect(&CollectSession::new(), &request)
        .unwrap();

    let root = result.root().unwrap();
    let c_under_a = child_named(&child_named(root, "a"), "c");
    let c_under_b = child_named(&child_named(root, "b"), "c");

    // Two distinct nodes, one shared children list.
    assert!(!Rc::ptr_eq(&c_under_a, &c_under_b));
    assert!(c_under_a.borrow().shares_children_with(&c_under_b.borrow()));
    assert_eq!(children(&c_under_a).len(), 1);
    assert_eq!(
        child_named(&c_under_b, "d").borrow().artifact().unwrap().id(),
        "d"
    );

    // The shared sub-problem was solved once.
    assert_eq!(registry.reads("g", "c", "1"), 1);
    assert_eq!(registry.reads("g", "d", "1"), 1);
}

#[test]
fn test_cycle_is_recorded_and_relinked() {
    // a -> b -> a
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "b", "1")]);
    registry.declare("g", "b", "1", vec![dep("g", "a", "1")]);
    let registry = Rc::new(registry);

    let request = CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![]);
    let result = collector(registry)
        .collect(&CollectSession::new(), &request)
        .unwrap();

    assert_eq!(result.cycles().len(), 1);
    let cycle = &result.cycles()[0];
    let path: Vec<&str> = cycle.path().iter().map(|a| a.id()).collect();
    assert_eq!(path, vec!["a", "b"]);
    assert_eq!(cycle.closing_dependency().artifact().id(), "a");

    let root = result.root().unwrap();
    let a = child_named(root, "a");
    let b = child_named(&a, "b");
    let a_again = child_named(&b, "a");

    // The cycle node shares the first occurrence's children.
    assert!(a.borrow().shares_children_with(&a_again.borrow()));
    assert_eq!(children(&a_again).len(), 1);
}

#[test]
fn test_relocation_redirects_collection() {
    // x:1 relocates to y:1 in another group.
    let mut registry = Registry::default();
    registry.relocate("gx", "x", "1", artifact("gy", "y", "1"));
    registry.declare("gy", "y", "1", vec![]);
    let registry = Rc::new(registry);

    let request = CollectRequest::for_dependencies(vec![dep("gx", "x", "1")], vec![]);
    let result = collector(registry)
        .collect(&CollectSession::new(), &request)
        .unwrap();

    let root = result.root().unwrap();
    let nodes = children(root);
    assert_eq!(nodes.len(), 1);

    let node = nodes[0].borrow();
    let a = node.artifact().unwrap();
    assert_eq!((a.group(), a.id(), a.version()), ("gy", "y", "1"));
    let relocations: Vec<&str> = node.relocations().iter().map(|r| r.id()).collect();
    assert_eq!(relocations, vec!["x"]);
}

#[test]
fn test_relocation_to_new_coordinates_reenables_version_management() {
    let mut registry = Registry::default();
    registry.relocate("gx", "x", "1", artifact("gy", "y", "1"));
    registry.declare("gy", "y", "2.0", vec![]);
    let registry = Rc::new(registry);

    let mut session = CollectSession::new();
    let mut manager = MapManager::default();
    manager.overrides.insert(
        artifact("gy", "y", "1").coordinate_id(),
        DependencyManagement {
            version: Some("2.0".into()),
            ..Default::default()
        },
    );
    session.manager = Some(Rc::new(manager));

    let request = CollectRequest::for_dependencies(vec![dep("gx", "x", "1")], vec![]);
    let result = collector(registry)
        .collect(&session, &request)
        .unwrap();

    // Group changed, so management applies to the relocated form.
    let root = result.root().unwrap();
    let node = children(root)[0].clone();
    assert_eq!(node.borrow().artifact().unwrap().version(), "2.0");
    assert_ne!(node.borrow().managed_bits() & managed::VERSION, 0);
}

#[test]
fn test_relocation_within_coordinates_disables_version_management() {
    // Management pins x to 1, whose descriptor relocates in place to x:2.
    // On the re-entry the pin must stay off, or the two would chase each
    // other forever.
    let mut registry = Registry::default();
    registry.relocate("g", "x", "1", artifact("g", "x", "2"));
    registry.declare("g", "x", "2", vec![]);
    let registry = Rc::new(registry);

    let mut session = CollectSession::new();
    let mut manager = MapManager::default();
    manager.overrides.insert(
        artifact("g", "x", "1").coordinate_id(),
        DependencyManagement {
            version: Some("1".into()),
            ..Default::default()
        },
    );
    session.manager = Some(Rc::new(manager));

    let request = CollectRequest::for_dependencies(vec![dep("g", "x", "0")], vec![]);
    let result = collector(registry)
        .collect(&session, &request)
        .unwrap();

    let root = result.root().unwrap();
    let node = children(root)[0].clone();
    assert_eq!(node.borrow().artifact().unwrap().version(), "2");
    assert_eq!(node.borrow().managed_bits() & managed::VERSION, 0);
    let node = node.borrow();
    let relocations: Vec<&str> = node.relocations().iter().map(|r| r.version()).collect();
    assert_eq!(relocations, vec!["1"]);
}

#[test]
fn test_root_range_picks_highest_surviving_version() {
    let mut registry = Registry::default();
    registry.ranges.insert(
        "g:r:[1,2)".into(),
        vec!["1.0".into(), "1.5".into(), "1.7".into()],
    );
    registry.declare("g", "r", "1.5", vec![]);
    let registry = Rc::new(registry);

    let mut session = CollectSession::new();
    session.version_filter = Some(Rc::new(DropVersion {
        version: "1.7".into(),
    }));

    let request = CollectRequest::for_root(dep("g", "r", "[1,2)"), vec![]);
    let result = collector(registry)
        .collect(&session, &request)
        .unwrap();

    let root = result.root().unwrap().borrow();
    assert_eq!(root.artifact().unwrap().version(), "1.5");
    assert_eq!(root.version(), Some(&Version::new("1.5")));
    assert!(root.version_constraint().unwrap().range().is_some());
}

#[test]
fn test_range_expands_every_surviving_version() {
    // Below the root, a range produces one node per surviving version.
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "c", "[1,2)")]);
    registry
        .ranges
        .insert("g:c:[1,2)".into(), vec!["1.0".into(), "1.5".into()]);
    registry.declare("g", "c", "1.0", vec![]);
    registry.declare("g", "c", "1.5", vec![]);
    let registry = Rc::new(registry);

    let request = CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![]);
    let result = collector(registry)
        .collect(&CollectSession::new(), &request)
        .unwrap();

    let a = child_named(result.root().unwrap(), "a");
    let versions: Vec<String> = children(&a)
        .iter()
        .map(|c| c.borrow().artifact().unwrap().version().to_string())
        .collect();
    assert_eq!(versions, vec!["1.0", "1.5"]);
}

#[test]
fn test_bounded_errors_keep_the_walk_alive() {
    let mut registry = Registry::default();
    let mut failing = Vec::new();
    for i in 0..5 {
        let id = format!("f{i}");
        registry.failing_ranges.insert(format!("g:{id}:1"));
        failing.push(dep("g", &id, "1"));
    }
    registry.declare("g", "ok", "1", vec![]);
    failing.push(dep("g", "ok", "1"));
    let registry = Rc::new(registry);

    let mut session = CollectSession::new();
    session.config.set(MAX_EXCEPTIONS_KEY, 3i64);

    let request = CollectRequest::for_dependencies(failing, vec![]);
    let err = collector(registry)
        .collect(&session, &request)
        .unwrap_err();

    assert!(err
        .message()
        .starts_with("Failed to collect dependencies at g:f0::1"));

    let result = err.result();
    assert_eq!(result.exceptions().len(), 3);
    // The healthy dependency still made it into the graph.
    assert_eq!(children(result.root().unwrap()).len(), 1);
}

#[test]
fn test_management_overrides_version_and_records_bits() {
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "c", "1.0")]);
    registry.declare("g", "c", "2.0", vec![]);
    let registry = Rc::new(registry);

    let mut manager = MapManager::default();
    manager.overrides.insert(
        artifact("g", "c", "1.0").coordinate_id(),
        DependencyManagement {
            version: Some("2.0".into()),
            ..Default::default()
        },
    );

    for verbose in [false, true] {
        let mut session = CollectSession::new();
        session.manager = Some(Rc::new(manager.clone()));
        session.config.set(VERBOSE_PREMANAGED_KEY, verbose);

        let request = CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![]);
        let result = collector(registry.clone())
            .collect(&session, &request)
            .unwrap();

        let c = child_named(&child_named(result.root().unwrap(), "a"), "c");
        let c = c.borrow();
        assert_eq!(c.artifact().unwrap().version(), "2.0");
        assert_ne!(c.managed_bits() & managed::VERSION, 0);

        if verbose {
            assert_eq!(c.premanaged().unwrap().version.as_deref(), Some("1.0"));
        } else {
            assert!(c.premanaged().is_none());
        }
    }
}

#[test]
fn test_descriptor_failure_leaves_a_leaf_and_records_once() {
    // Both parents depend on the same broken artifact. Each occurrence
    // yields a descriptorless leaf; the error is recorded only on the first,
    // and the negative cache stops any re-read.
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "broken", "1")]);
    registry.declare("g", "b", "1", vec![dep("g", "broken", "1")]);
    registry.failing_descriptors.insert("g:broken:1".into());
    let registry = Rc::new(registry);

    let request =
        CollectRequest::for_dependencies(vec![dep("g", "a", "1"), dep("g", "b", "1")], vec![]);
    let err = collector(registry.clone())
        .collect(&CollectSession::new(), &request)
        .unwrap_err();

    let result = err.result();
    assert_eq!(result.exceptions().len(), 1);

    let root = result.root().unwrap();
    for parent in ["a", "b"] {
        let leaf = child_named(&child_named(root, parent), "broken");
        assert!(children(&leaf).is_empty());
    }

    // The read was attempted exactly once.
    assert_eq!(registry.reads("g", "broken", "1"), 1);
}

#[test]
fn test_local_path_artifact_is_a_leaf_without_descriptor_read() {
    let mut registry = Registry::default();
    // Even though the registry knows dependencies for it, the local-path
    // property must keep the reader away.
    registry.declare("g", "pinned", "1", vec![dep("g", "never", "1")]);
    let registry = Rc::new(registry);

    let pinned = Dependency::new(
        artifact("g", "pinned", "1").with_property(properties::LOCAL_PATH, "/tmp/pinned.bin"),
        "compile",
    );
    let request = CollectRequest::for_dependencies(vec![pinned], vec![]);
    let result = collector(registry.clone())
        .collect(&CollectSession::new(), &request)
        .unwrap();

    let node = child_named(result.root().unwrap(), "pinned");
    assert!(children(&node).is_empty());
    assert_eq!(registry.reads("g", "pinned", "1"), 0);
}

#[test]
fn test_descriptor_repositories_aggregate_downward() {
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "c", "1")]);
    registry.declare("g", "c", "1", vec![]);
    registry
        .declared_repositories
        .insert("g:a:1".into(), vec![repo("extra")]);
    let registry = Rc::new(registry);

    let request =
        CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![repo("central")]);

    let result = collector(registry.clone())
        .collect(&CollectSession::new(), &request)
        .unwrap();
    let c = child_named(&child_named(result.root().unwrap(), "a"), "c");
    assert_eq!(repo_ids(&c), vec!["central", "extra"]);

    // With the ignore flag the caller's list is kept all the way down.
    let mut session = CollectSession::new();
    session.ignore_artifact_descriptor_repositories = true;
    let result = collector(registry).collect(&session, &request).unwrap();
    let c = child_named(&child_named(result.root().unwrap(), "a"), "c");
    assert_eq!(repo_ids(&c), vec!["central"]);
}

#[test]
fn test_root_node_keeps_the_callers_repositories() {
    let mut registry = Registry::default();
    registry.declare("g", "r", "1", vec![dep("g", "a", "1")]);
    registry.declare("g", "a", "1", vec![]);
    registry
        .declared_repositories
        .insert("g:r:1".into(), vec![repo("extra")]);
    let registry = Rc::new(registry);

    let request = CollectRequest::for_root(dep("g", "r", "1"), vec![repo("central")]);
    let result = collector(registry)
        .collect(&CollectSession::new(), &request)
        .unwrap();

    let root = result.root().unwrap();
    // The root records what the caller asked for...
    assert_eq!(repo_ids(root), vec!["central"]);

    // ...while the recursion below ran against the aggregated list.
    let a = child_named(root, "a");
    assert_eq!(repo_ids(&a), vec!["central", "extra"]);
}

#[test]
fn test_version_origin_narrows_node_repositories() {
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![]);
    registry.origins.insert(
        "g:a:1".into(),
        ArtifactRepository::Remote(repo("supplier")),
    );
    let registry = Rc::new(registry);

    let request =
        CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![repo("central")]);
    let result = collector(registry)
        .collect(&CollectSession::new(), &request)
        .unwrap();

    let a = child_named(result.root().unwrap(), "a");
    assert_eq!(repo_ids(&a), vec!["supplier"]);
}

#[test]
fn test_selector_drops_dependencies() {
    let mut registry = Registry::default();
    registry.declare(
        "g",
        "a",
        "1",
        vec![
            Dependency::new(artifact("g", "t", "1"), "test"),
            dep("g", "c", "1"),
        ],
    );
    registry.declare("g", "c", "1", vec![]);
    let registry = Rc::new(registry);

    let mut session = CollectSession::new();
    session.selector = Some(Rc::new(ScopeSelector {
        excluded: "test".into(),
    }));

    let request = CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![]);
    let result = collector(registry).collect(&session, &request).unwrap();

    let a = child_named(result.root().unwrap(), "a");
    let ids: Vec<String> = children(&a)
        .iter()
        .map(|c| c.borrow().artifact().unwrap().id().to_string())
        .collect();
    assert_eq!(ids, vec!["c"]);
}

#[test]
fn test_traverser_keeps_node_but_cuts_subtree() {
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "b", "1")]);
    registry.declare("g", "b", "1", vec![dep("g", "c", "1")]);
    registry.declare("g", "c", "1", vec![]);
    let registry = Rc::new(registry);

    let mut session = CollectSession::new();
    session.traverser = Some(Rc::new(StopBelow { id: "b".into() }));

    let request = CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![]);
    let result = collector(registry).collect(&session, &request).unwrap();

    let b = child_named(&child_named(result.root().unwrap(), "a"), "b");
    assert!(children(&b).is_empty());
}

#[test]
fn test_collecting_twice_is_structurally_equal() {
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "c", "1"), dep("g", "b", "1")]);
    registry.declare("g", "b", "1", vec![dep("g", "c", "1")]);
    registry.declare("g", "c", "1", vec![dep("g", "d", "1")]);
    registry.declare("g", "d", "1", vec![]);
    let registry = Rc::new(registry);

    let request = CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![]);

    let first = collector(registry.clone())
        .collect(&CollectSession::new(), &request)
        .unwrap();
    let second = collector(registry)
        .collect(&CollectSession::new(), &request)
        .unwrap();

    assert_eq!(
        shape(first.root().unwrap()),
        shape(second.root().unwrap())
    );
}

#[test]
fn test_rootless_artifact_only_request_yields_single_node() {
    let registry = Rc::new(Registry::default());

    let mut request = CollectRequest::new();
    request.root_artifact = Some(artifact("g", "r", "1"));

    let result = collector(registry)
        .collect(&CollectSession::new(), &request)
        .unwrap();

    let root = result.root().unwrap();
    assert!(root.borrow().dependency().is_none());
    assert!(children(root).is_empty());
}

#[test]
fn test_no_coordinate_repeats_on_any_path() {
    // a tangle with shared nodes and a cycle; no root-to-leaf path may visit
    // the same coordinates twice.
    let mut registry = Registry::default();
    registry.declare("g", "a", "1", vec![dep("g", "b", "1"), dep("g", "c", "1")]);
    registry.declare("g", "b", "1", vec![dep("g", "c", "1")]);
    registry.declare("g", "c", "1", vec![dep("g", "a", "1")]);
    let registry = Rc::new(registry);

    let request = CollectRequest::for_dependencies(vec![dep("g", "a", "1")], vec![]);
    let result = collector(registry)
        .collect(&CollectSession::new(), &request)
        .unwrap();

    // A cycle node carries its ancestor's coordinates by construction; what
    // must never happen is re-descending them. Expansion is detected by the
    // child list not already sitting on the walk path.
    fn walk(node: &NodeRef, path: &mut Vec<String>, lists: &mut Vec<*const ()>) {
        let list = node.borrow().children().clone();
        let ptr = Rc::as_ptr(&list) as *const ();
        if lists.contains(&ptr) {
            return;
        }

        let coords = node.borrow().artifact().map(|a| a.coordinate_id());
        if let Some(coords) = &coords {
            assert!(
                !path.contains(coords),
                "coordinates {coords} re-expanded on path {path:?}"
            );
            path.push(coords.clone());
        }

        lists.push(ptr);
        for child in list.borrow().iter() {
            walk(child, path, lists);
        }
        lists.pop();

        if coords.is_some() {
            path.pop();
        }
    }

    walk(result.root().unwrap(), &mut Vec::new(), &mut Vec::new());
    assert!(!result.cycles().is_empty());
}

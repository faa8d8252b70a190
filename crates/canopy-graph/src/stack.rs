//! The DFS ancestor path.

use crate::node::NodeRef;
use canopy_core::Artifact;

/// The chain of nodes from the root down to the node currently being
/// expanded. Pushed on descent, popped on return; cycle detection walks it
/// by artifact coordinates.
#[derive(Debug, Default)]
pub struct NodeStack {
    nodes: Vec<NodeRef>,
}

impl NodeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeRef) {
        self.nodes.push(node);
    }

    pub fn pop(&mut self) -> Option<NodeRef> {
        self.nodes.pop()
    }

    /// The node currently being expanded.
    ///
    /// # Panics
    /// Panics when the stack is empty; the engine always seeds it with the
    /// root before descending.
    pub fn top(&self) -> NodeRef {
        self.nodes.last().expect("node stack is empty").clone()
    }

    pub fn get(&self, index: usize) -> NodeRef {
        self.nodes[index].clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finds the deepest ancestor whose artifact has the same coordinates
    /// (group, id, classifier, extension; version ignored) as `artifact`.
    pub fn find(&self, artifact: &Artifact) -> Option<usize> {
        self.nodes.iter().enumerate().rev().find_map(|(i, node)| {
            match node.borrow().artifact() {
                Some(a) if a.same_coordinates(artifact) => Some(i),
                _ => None,
            }
        })
    }
}
